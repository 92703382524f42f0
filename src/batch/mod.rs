//! # 批量计算模块
//!
//! 对一批请求文件共享同一个 `NwchemHarness` 并行计算，
//! 每个请求的结果写到同目录的 `<stem>.result.json`。
//!
//! ## 依赖关系
//! - 被 `commands/batch.rs` 使用
//! - 使用 `harness/`, `models/`
//! - 使用 `rayon` 进行并行处理, `indicatif` 显示进度

pub mod collector;
pub mod runner;

pub use collector::{result_path, FileCollector};
pub use runner::{BatchResult, BatchRunner, ProcessResult};

use crate::error::{HarnessError, Result};
use crate::harness::NwchemHarness;
use crate::models::{CalcRequest, CalcResult, JobConfig};

use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// 单个请求的汇总记录
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub request: PathBuf,
    pub result: PathBuf,
    pub formula: String,
    pub method: String,
    pub basis: String,
    pub driver: String,
    /// `CURRENT ENERGY`（若有）
    pub energy: Option<f64>,
}

impl JobRecord {
    fn from_result(request: &Path, output: PathBuf, result: &CalcResult) -> Self {
        JobRecord {
            request: request.to_path_buf(),
            result: output,
            formula: result.molecule.formula(),
            method: result.model.method.clone(),
            basis: result.model.basis.clone(),
            driver: result.driver.to_string(),
            energy: result.qcvar_f64("CURRENT ENERGY"),
        }
    }
}

/// 计算一个请求文件；已有结果时跳过（除非 `overwrite`）
pub fn process_request_file(
    harness: &NwchemHarness,
    config: &JobConfig,
    path: &Path,
    overwrite: bool,
) -> ProcessResult<JobRecord> {
    let output = result_path(path);
    if output.exists() && !overwrite {
        return ProcessResult::Skipped(format!(
            "Result exists, skipping: {}",
            output.display()
        ));
    }

    match compute_and_write(harness, config, path, &output) {
        Ok(record) => ProcessResult::Success(record),
        Err(e) => {
            warn!(request = %path.display(), error = %e, "request failed");
            ProcessResult::Failed(path.display().to_string(), e.to_string())
        }
    }
}

fn compute_and_write(
    harness: &NwchemHarness,
    config: &JobConfig,
    path: &Path,
    output: &Path,
) -> Result<JobRecord> {
    let request = CalcRequest::from_json_file(path)?;
    let result = harness.compute(&request, config)?;

    fs::write(output, result.to_json_pretty()?).map_err(|e| HarnessError::FileWriteError {
        path: output.display().to_string(),
        source: e,
    })?;

    Ok(JobRecord::from_result(path, output.to_path_buf(), &result))
}

/// 汇总表写为 CSV
pub fn write_summary_csv(records: &[JobRecord], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    wtr.write_record(["request", "formula", "method", "basis", "driver", "energy_hartree"])?;

    for r in records {
        wtr.write_record([
            r.request.display().to_string(),
            r.formula.clone(),
            r.method.clone(),
            r.basis.clone(),
            r.driver.clone(),
            r.energy.map(|e| format!("{:.10}", e)).unwrap_or_default(),
        ])?;
    }

    wtr.flush().map_err(|e| HarnessError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_result_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let req = dir.path().join("water.json");
        fs::write(&req, "{}").unwrap();
        fs::write(dir.path().join("water.result.json"), "{}").unwrap();

        let harness = NwchemHarness::with_executable("/nonexistent/nwchem");
        let result = process_request_file(&harness, &JobConfig::default(), &req, false);
        assert!(matches!(result, ProcessResult::Skipped(_)));
    }

    #[test]
    fn test_bad_request_fails() {
        let dir = tempfile::tempdir().unwrap();
        let req = dir.path().join("broken.json");
        fs::write(&req, "{ not json").unwrap();

        let harness = NwchemHarness::with_executable("/nonexistent/nwchem");
        match process_request_file(&harness, &JobConfig::default(), &req, true) {
            ProcessResult::Failed(path, err) => {
                assert!(path.ends_with("broken.json"));
                assert!(err.contains("JSON"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!dir.path().join("broken.result.json").exists());
    }

    #[test]
    fn test_summary_csv() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("summary.csv");
        let records = vec![JobRecord {
            request: PathBuf::from("water.json"),
            result: PathBuf::from("water.result.json"),
            formula: "H2O".to_string(),
            method: "hf".to_string(),
            basis: "aug-cc-pvdz".to_string(),
            driver: "energy".to_string(),
            energy: Some(-76.0413815332),
        }];
        write_summary_csv(&records, &out).unwrap();

        let text = fs::read_to_string(&out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("request,formula,method,basis,driver,energy_hartree")
        );
        assert_eq!(
            lines.next(),
            Some("water.json,H2O,hf,aug-cc-pvdz,energy,-76.0413815332")
        );
    }
}
