//! # version 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/version.rs`

use clap::Args;
use std::path::PathBuf;

/// version 子命令参数
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Path to the NWChem executable (defaults to 'nwchem' on PATH)
    #[arg(long, env = "NWCHEM_EXECUTABLE")]
    pub nwchem: Option<PathBuf>,
}
