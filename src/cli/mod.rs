//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `compute`: 运行单个计算请求
//! - `input`: 只生成 NWChem 输入文件
//! - `version`: 检测 NWChem 版本
//! - `batch`: 并行批量计算
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: batch, compute, input, version

pub mod batch;
pub mod compute;
pub mod input;
pub mod version;

use clap::{Parser, Subcommand};

/// nwharness - NWChem 计算适配器
#[derive(Parser)]
#[command(name = "nwharness")]
#[command(version)]
#[command(about = "Run NWChem calculations from structured JSON requests", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log filter for diagnostics on stderr (e.g. 'info', 'nwharness=debug')
    #[arg(long, global = true, env = "NWHARNESS_LOG")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Run one calculation request and write the result as JSON
    Compute(compute::ComputeArgs),

    /// Print the NWChem input deck generated for a request (dry run)
    Input(input::InputArgs),

    /// Detect the installed NWChem version
    Version(version::VersionArgs),

    /// Run every request file in a directory in parallel
    Batch(batch::BatchArgs),
}
