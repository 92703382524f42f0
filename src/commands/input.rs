//! # input 命令实现
//!
//! 只生成输入文件，不运行 NWChem。
//!
//! ## 依赖关系
//! - 使用 `cli/input.rs` 定义的参数
//! - 使用 `nwharness::harness`

use super::harness_for;
use crate::cli::input::InputArgs;
use nwharness::error::{HarnessError, Result};
use nwharness::models::{CalcRequest, JobConfig};
use nwharness::utils::output;

use std::fs;

/// 执行 input 命令
pub fn execute(args: InputArgs) -> Result<()> {
    let request = CalcRequest::from_json_file(&args.request)?;
    let config = JobConfig {
        memory: args.memory,
        ..Default::default()
    };

    let job = harness_for(None).build_input(&request, &config)?;

    match args.output {
        Some(path) => {
            fs::write(&path, job.input_text()).map_err(|e| HarnessError::FileWriteError {
                path: path.display().to_string(),
                source: e,
            })?;
            output::print_success(&format!("Input deck written to '{}'", path.display()));
        }
        None => print!("{}", job.input_text()),
    }

    Ok(())
}
