//! # version 命令实现
//!
//! ## 依赖关系
//! - 使用 `cli/version.rs` 定义的参数
//! - 使用 `nwharness::harness`

use super::harness_for;
use crate::cli::version::VersionArgs;
use nwharness::Result;
use nwharness::utils::output;

/// 执行 version 命令
pub fn execute(args: VersionArgs) -> Result<()> {
    let harness = harness_for(args.nwchem.as_deref());
    let exe = harness.locate()?;
    let version = harness.get_version()?;

    output::print_field("Executable", &exe.display().to_string());
    output::print_field("Version", &version);
    Ok(())
}
