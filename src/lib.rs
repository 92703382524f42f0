//! # nwharness - NWChem 计算适配库
//!
//! 把"分子 + 驱动 + 方法/基组 + 关键字"形式的计算请求翻译成 NWChem 输入，
//! 在私有临时目录中运行 NWChem，并把文本输出整理为结构化结果。
//!
//! ## 依赖关系
//! ```text
//! lib.rs
//!   ├── harness/    (查找、输入生成、执行、收集、组装)
//!   ├── batch/      (并行批量计算)
//!   ├── keywords.rs (关键字校验与格式化)
//!   ├── models/     (请求、分子、结果数据模型)
//!   ├── utils/      (输出样式、进度条、日志)
//!   └── error.rs    (错误处理)
//! ```

pub mod batch;
pub mod error;
pub mod harness;
pub mod keywords;
pub mod models;
pub mod utils;

pub use error::{HarnessError, Result};
pub use harness::NwchemHarness;
pub use keywords::{KeywordValue, Keywords};
pub use models::{CalcRequest, CalcResult, Driver, JobConfig, Molecule};
