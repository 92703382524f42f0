//! # batch 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/batch.rs`

use super::compute::RuntimeArgs;
use clap::Args;
use std::path::PathBuf;

/// batch 子命令参数
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Request file or directory of request files
    pub input: PathBuf,

    /// File name patterns, comma-separated
    #[arg(long, default_value = "*.json")]
    pub pattern: String,

    /// Search subdirectories
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// Parallel jobs (0 = all CPUs)
    #[arg(short, long, default_value_t = 1)]
    pub jobs: usize,

    /// Recompute requests that already have a result file
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,

    /// Write a CSV summary of the batch
    #[arg(long)]
    pub summary: Option<PathBuf>,

    #[command(flatten)]
    pub runtime: RuntimeArgs,
}
