//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/` 与 `nwharness` 库
//! - 子模块: batch, compute, input, version

pub mod batch;
pub mod compute;
pub mod input;
pub mod version;

use crate::cli::Commands;
use nwharness::harness::NwchemHarness;
use nwharness::Result;
use std::path::Path;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Compute(args) => compute::execute(args),
        Commands::Input(args) => input::execute(args),
        Commands::Version(args) => version::execute(args),
        Commands::Batch(args) => batch::execute(args),
    }
}

/// 按命令行参数构造适配器
fn harness_for(nwchem: Option<&Path>) -> NwchemHarness {
    match nwchem {
        Some(path) => NwchemHarness::with_executable(path),
        None => NwchemHarness::new(),
    }
}
