//! # input 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/input.rs`

use clap::Args;
use std::path::PathBuf;

/// input 子命令参数
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Calculation request (JSON)
    pub request: PathBuf,

    /// Write the deck to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Memory written into the deck, in GiB
    #[arg(long, default_value_t = 2.0)]
    pub memory: f64,
}
