//! # compute 命令实现
//!
//! 运行单个计算请求，打印主要物理量并写出结果 JSON。
//!
//! ## 依赖关系
//! - 使用 `cli/compute.rs` 定义的参数
//! - 使用 `nwharness::harness`, `nwharness::utils`

use super::harness_for;
use crate::cli::compute::ComputeArgs;
use nwharness::batch::result_path;
use nwharness::error::{HarnessError, Result};
use nwharness::models::{CalcRequest, CalcResult, ReturnResult};
use nwharness::utils::{output, progress};

use std::fs;
use tabled::{Table, Tabled};

/// 物理量表格行
#[derive(Debug, Clone, Tabled)]
struct QuantityRow {
    #[tabled(rename = "Quantity")]
    name: String,
    #[tabled(rename = "Value (Eh)")]
    value: String,
}

/// 执行 compute 命令
pub fn execute(args: ComputeArgs) -> Result<()> {
    output::print_header("NWChem Calculation");

    if !args.request.exists() {
        return Err(HarnessError::FileNotFound {
            path: args.request.display().to_string(),
        });
    }

    let request = CalcRequest::from_json_file(&args.request)?;
    let config = args.runtime.job_config();
    let harness = harness_for(args.runtime.nwchem.as_deref());

    output::print_field("Request", &args.request.display().to_string());
    output::print_field("Molecule", &request.molecule.formula());
    output::print_field(
        "Model",
        &format!("{}/{}", request.model.method, request.model.basis),
    );
    output::print_field("Driver", &request.driver.to_string());
    println!();

    let spinner = progress::create_spinner("Running NWChem...");
    let result = harness.compute(&request, &config);
    spinner.finish_and_clear();
    let result = result?;

    print_summary(&result);

    let out_path = args.output.unwrap_or_else(|| result_path(&args.request));
    fs::write(&out_path, result.to_json_pretty()?).map_err(|e| HarnessError::FileWriteError {
        path: out_path.display().to_string(),
        source: e,
    })?;

    output::print_success(&format!("Result written to '{}'", out_path.display()));
    Ok(())
}

fn print_summary(result: &CalcResult) {
    let rows: Vec<QuantityRow> = result
        .qcvars
        .iter()
        .filter_map(|(name, value)| {
            value.as_decimal().map(|d| QuantityRow {
                name: name.clone(),
                value: d.to_string(),
            })
        })
        .collect();

    if !rows.is_empty() {
        println!("{}", Table::new(&rows));
    }

    output::print_separator();
    output::print_field("NWChem", &result.provenance.version);
    match &result.return_result {
        ReturnResult::Scalar(e) => output::print_field("Energy", &format!("{:.10} Eh", e)),
        ReturnResult::Vector(g) => {
            let norm = g.iter().map(|x| x * x).sum::<f64>().sqrt();
            output::print_field("Gradient", &format!("{} components, |g| = {:.6e}", g.len(), norm))
        }
        ReturnResult::Matrix { rows, cols, .. } => {
            output::print_field("Hessian", &format!("{} x {}", rows, cols))
        }
    }
}
