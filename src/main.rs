//! # nwharness - NWChem 计算适配器命令行
//!
//! ## 子命令
//! - `compute` - 运行单个计算请求
//! - `input`   - 生成 NWChem 输入文件（不运行）
//! - `version` - 检测 NWChem 版本
//! - `batch`   - 并行批量计算
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   └── commands/   (命令执行逻辑)
//!         └── nwharness (库：harness/, batch/, models/, utils/)
//! ```

mod cli;
mod commands;

use clap::Parser;
use cli::Cli;
use nwharness::utils::{logging, output};

fn main() {
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref());

    if let Err(e) = commands::run(cli.command) {
        output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
