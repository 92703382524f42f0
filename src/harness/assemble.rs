//! # 结果组装
//!
//! 将收集到的物理量整理为 `CalcResult`：按驱动挑选 `CURRENT <DRIVER>`
//! 作为主返回值，并检查其形状。
//!
//! ## 依赖关系
//! - 被 `harness/mod.rs` 使用
//! - 使用 `harness/harvester.rs`, `models/`

use super::harvester::Harvest;
use crate::error::{HarnessError, Result};
use crate::models::{CalcRequest, CalcResult, Driver, Provenance, QcValue, ReturnResult};

use std::collections::BTreeMap;

pub const CREATOR: &str = "NWChem";
pub const ROUTINE: &str = "nwchem";

/// 组装最终结果
pub fn assemble(
    request: &CalcRequest,
    harvest: Harvest,
    version: &str,
    stdout: String,
    outfiles: BTreeMap<String, String>,
) -> Result<CalcResult> {
    let Harvest {
        mut qcvars,
        gradient,
        hessian,
        molecule,
        ..
    } = harvest;

    if let Some(grad) = gradient {
        qcvars.insert("CURRENT GRADIENT".to_string(), QcValue::Array(grad));
    }
    if let Some(hess) = hessian {
        qcvars.insert("CURRENT HESSIAN".to_string(), QcValue::Array(hess));
    }

    let label = request.driver.current_label();
    let value = qcvars
        .get(&label)
        .ok_or_else(|| HarnessError::MissingQuantity {
            name: label.clone(),
        })?;
    let return_result = to_return_result(request, &label, value)?;

    Ok(CalcResult {
        driver: request.driver,
        model: request.model.clone(),
        molecule: request.molecule.clone(),
        success: true,
        return_result,
        qcvars,
        provenance: Provenance {
            creator: CREATOR.to_string(),
            version: version.to_string(),
            routine: ROUTINE.to_string(),
        },
        final_molecule: molecule,
        stdout,
        outfiles,
    })
}

fn to_return_result(request: &CalcRequest, label: &str, value: &QcValue) -> Result<ReturnResult> {
    let nc = 3 * request.molecule.natom();
    let mismatch = |expected: String, found: String| HarnessError::ShapeMismatch {
        name: label.to_string(),
        expected,
        found,
    };

    let kind = |v: &QcValue| match v {
        QcValue::Decimal(_) => "scalar".to_string(),
        QcValue::Array(_) => "array".to_string(),
    };

    match request.driver {
        Driver::Energy => value
            .as_decimal()
            .map(|d| ReturnResult::Scalar(d.to_f64()))
            .ok_or_else(|| mismatch("scalar".to_string(), kind(value))),
        Driver::Gradient => {
            let a = value
                .as_array()
                .ok_or_else(|| mismatch("array".to_string(), kind(value)))?;
            if a.len() != nc {
                return Err(mismatch(
                    format!("{} components", nc),
                    format!("{} components", a.len()),
                ));
            }
            Ok(ReturnResult::Vector(a.iter().copied().collect()))
        }
        Driver::Hessian => {
            let a = value
                .as_array()
                .ok_or_else(|| mismatch("array".to_string(), kind(value)))?;
            if a.shape() != [nc, nc] {
                return Err(mismatch(
                    format!("{} x {}", nc, nc),
                    format!("{:?}", a.shape()),
                ));
            }
            Ok(ReturnResult::Matrix {
                rows: nc,
                cols: nc,
                data: a.iter().copied().collect(),
            })
        }
    }
}
