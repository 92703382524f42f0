//! # 计算请求数据模型
//!
//! 一次计算的完整描述：分子、驱动类型、方法/基组与关键字；
//! 以及与请求无关的资源配置 `JobConfig`。
//!
//! ## 依赖关系
//! - 被 `harness/`, `commands/` 使用
//! - 使用 `models/molecule.rs`, `keywords.rs`

use super::molecule::Molecule;
use crate::error::{HarnessError, Result};
use crate::keywords::Keywords;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 驱动类型：请求的计算输出
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    Energy,
    Gradient,
    Hessian,
}

impl Driver {
    /// 导数阶数
    pub fn derivative_int(self) -> u8 {
        match self {
            Driver::Energy => 0,
            Driver::Gradient => 1,
            Driver::Hessian => 2,
        }
    }

    /// 结果中对应的量名，如 `CURRENT ENERGY`
    pub fn current_label(self) -> String {
        format!("CURRENT {}", self.to_string().to_uppercase())
    }
}

impl std::fmt::Display for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Driver::Energy => write!(f, "energy"),
            Driver::Gradient => write!(f, "gradient"),
            Driver::Hessian => write!(f, "hessian"),
        }
    }
}

/// 方法与基组
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub method: String,
    pub basis: String,
}

/// 计算请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalcRequest {
    pub molecule: Molecule,
    pub driver: Driver,
    pub model: Model,
    #[serde(default)]
    pub keywords: Keywords,
}

impl CalcRequest {
    pub fn new(molecule: Molecule, driver: Driver, method: &str, basis: &str) -> Self {
        CalcRequest {
            molecule,
            driver,
            model: Model {
                method: method.to_string(),
                basis: basis.to_string(),
            },
            keywords: Keywords::default(),
        }
    }

    pub fn with_keywords(mut self, keywords: Keywords) -> Self {
        self.keywords = keywords;
        self
    }

    /// 从 JSON 文件读取请求
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| HarnessError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

/// 资源配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// 内存 (GiB)
    pub memory: f64,

    /// 进程数
    pub nprocs: u32,

    /// 临时目录的父目录；为空时使用系统临时目录
    pub scratch_directory: Option<PathBuf>,

    /// 超时 (秒)
    pub timeout: Option<u64>,

    /// 计算结束后保留临时目录
    pub keep_scratch: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        JobConfig {
            memory: 2.0,
            nprocs: 1,
            scratch_directory: None,
            timeout: None,
            keep_scratch: false,
        }
    }
}

impl JobConfig {
    /// GiB -> byte
    pub fn memory_bytes(&self) -> u64 {
        (self.memory * 1024f64.powi(3)) as u64
    }
}
