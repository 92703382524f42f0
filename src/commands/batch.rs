//! # batch 命令实现
//!
//! 并行计算一批请求文件。所有任务共享同一个适配器实例，
//! 版本探测只发生一次。
//!
//! ## 依赖关系
//! - 使用 `cli/batch.rs` 定义的参数
//! - 使用 `nwharness::batch` 进行收集与并行处理

use super::harness_for;
use crate::cli::batch::BatchArgs;
use nwharness::batch::{self, BatchRunner, FileCollector, JobRecord};
use nwharness::error::{HarnessError, Result};
use nwharness::utils::output;

use tabled::{Table, Tabled};

/// 汇总表格行
#[derive(Debug, Clone, Tabled)]
struct SummaryRow {
    #[tabled(rename = "Request")]
    request: String,
    #[tabled(rename = "Formula")]
    formula: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Driver")]
    driver: String,
    #[tabled(rename = "Energy (Eh)")]
    energy: String,
}

impl From<&JobRecord> for SummaryRow {
    fn from(r: &JobRecord) -> Self {
        SummaryRow {
            request: r
                .request
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            formula: r.formula.clone(),
            model: format!("{}/{}", r.method, r.basis),
            driver: r.driver.clone(),
            energy: r.energy.map(|e| format!("{:.10}", e)).unwrap_or_default(),
        }
    }
}

/// 执行 batch 命令
pub fn execute(args: BatchArgs) -> Result<()> {
    output::print_header("NWChem Batch Calculation");

    if !args.input.exists() {
        return Err(HarnessError::FileNotFound {
            path: args.input.display().to_string(),
        });
    }

    let files = FileCollector::new(args.input.clone())
        .with_pattern(&args.pattern)?
        .recursive(args.recursive)
        .collect();

    if files.is_empty() {
        output::print_warning(&format!(
            "No matching request files found with pattern '{}'",
            args.pattern
        ));
        return Ok(());
    }

    let harness = harness_for(args.runtime.nwchem.as_deref());
    let version = harness.get_version()?;
    let config = args.runtime.job_config();

    let runner = BatchRunner::new(args.jobs);
    output::print_info(&format!(
        "Found {} request files, NWChem {}, {} parallel jobs",
        files.len(),
        version,
        runner.jobs()
    ));

    let result = runner.run(files, |file| {
        batch::process_request_file(&harness, &config, file, args.overwrite)
    })?;

    if !result.successes.is_empty() {
        let rows: Vec<SummaryRow> = result.successes.iter().map(SummaryRow::from).collect();
        println!("{}", Table::new(&rows));
    }

    output::print_separator();
    output::print_done(&format!(
        "Batch complete: {} success, {} skipped, {} failed",
        result.success(),
        result.skipped,
        result.failed()
    ));

    if !result.failures.is_empty() {
        output::print_warning("Failed requests:");
        for (path, err) in result.failures.iter().take(10) {
            output::print_error(&format!("  {}: {}", path, err));
        }
        if result.failures.len() > 10 {
            output::print_warning(&format!("  ... and {} more", result.failures.len() - 10));
        }
    }

    if let Some(summary) = &args.summary {
        batch::write_summary_csv(&result.successes, summary)?;
        output::print_success(&format!("Summary saved to '{}'", summary.display()));
    }

    Ok(())
}
