//! # 数据模型模块
//!
//! 定义计算请求、分子、收集到的物理量与最终结果。
//!
//! ## 依赖关系
//! - 被 `harness/` 和 `commands/` 使用
//! - 子模块: molecule, request, result, value

pub mod molecule;
pub mod request;
pub mod result;
pub mod value;

pub use molecule::Molecule;
pub use request::{CalcRequest, Driver, JobConfig, Model};
pub use result::{CalcResult, Provenance, ReturnResult};
pub use value::{PrintedDecimal, QcValue};
