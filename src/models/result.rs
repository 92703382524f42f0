//! # 计算结果数据模型
//!
//! 一次计算最终返回给调用方的结构化记录。
//!
//! ## 依赖关系
//! - 被 `harness/assemble.rs`, `commands/` 使用
//! - 使用 `models/request.rs`, `models/value.rs`

use super::molecule::Molecule;
use super::request::{Driver, Model};
use super::value::QcValue;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 主返回值，类型由驱动决定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReturnResult {
    /// energy
    Scalar(f64),
    /// gradient，长度 3N
    Vector(Vec<f64>),
    /// hessian，3N x 3N 行优先
    Matrix {
        rows: usize,
        cols: usize,
        data: Vec<f64>,
    },
}

impl ReturnResult {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            ReturnResult::Scalar(x) => Some(*x),
            _ => None,
        }
    }

    /// 展平为有序序列
    pub fn as_flat(&self) -> Vec<f64> {
        match self {
            ReturnResult::Scalar(x) => vec![*x],
            ReturnResult::Vector(v) => v.clone(),
            ReturnResult::Matrix { data, .. } => data.clone(),
        }
    }

    /// 是否与驱动要求的类型一致
    pub fn matches(&self, driver: Driver) -> bool {
        matches!(
            (self, driver),
            (ReturnResult::Scalar(_), Driver::Energy)
                | (ReturnResult::Vector(_), Driver::Gradient)
                | (ReturnResult::Matrix { .. }, Driver::Hessian)
        )
    }
}

/// 来源信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub creator: String,
    pub version: String,
    pub routine: String,
}

/// 计算结果
#[derive(Debug, Clone, Serialize)]
pub struct CalcResult {
    pub driver: Driver,
    pub model: Model,
    pub molecule: Molecule,
    pub success: bool,
    pub return_result: ReturnResult,
    /// 收集到的全部物理量
    pub qcvars: BTreeMap<String, QcValue>,
    pub provenance: Provenance,
    /// 程序输出的最终几何（若有）
    pub final_molecule: Option<Molecule>,
    pub stdout: String,
    /// 保留下来的输出文件
    pub outfiles: BTreeMap<String, String>,
}

impl CalcResult {
    /// 读取某个物理量的标量值
    pub fn qcvar_f64(&self, name: &str) -> Option<f64> {
        self.qcvars
            .get(name)
            .and_then(|v| v.as_decimal())
            .map(|d| d.to_f64())
    }

    /// 写为 JSON 文本
    pub fn to_json_pretty(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
