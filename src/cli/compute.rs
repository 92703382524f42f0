//! # compute 子命令 CLI 定义
//!
//! 运行单个计算请求；资源参数与 `batch` 共用。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs`, `cli/batch.rs` 使用
//! - 参数传递给 `commands/compute.rs`

use clap::Args;
use nwharness::JobConfig;
use std::path::PathBuf;

/// 资源与执行参数
#[derive(Args, Debug, Clone)]
pub struct RuntimeArgs {
    /// Path to the NWChem executable (defaults to 'nwchem' on PATH)
    #[arg(long, env = "NWCHEM_EXECUTABLE")]
    pub nwchem: Option<PathBuf>,

    /// Memory available to NWChem, in GiB
    #[arg(long, default_value_t = 2.0)]
    pub memory: f64,

    /// Number of MPI processes (launched through mpirun when > 1)
    #[arg(long, default_value_t = 1)]
    pub nprocs: u32,

    /// Parent directory for scratch directories
    #[arg(long, env = "NWHARNESS_SCRATCH")]
    pub scratch: Option<PathBuf>,

    /// Kill NWChem after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Keep the scratch directory after the run
    #[arg(long, default_value_t = false)]
    pub keep_scratch: bool,
}

impl RuntimeArgs {
    pub fn job_config(&self) -> JobConfig {
        JobConfig {
            memory: self.memory,
            nprocs: self.nprocs,
            scratch_directory: self.scratch.clone(),
            timeout: self.timeout,
            keep_scratch: self.keep_scratch,
        }
    }
}

/// compute 子命令参数
#[derive(Args, Debug)]
pub struct ComputeArgs {
    /// Calculation request (JSON)
    pub request: PathBuf,

    /// Output file for the result JSON (default: <stem>.result.json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub runtime: RuntimeArgs,
}
