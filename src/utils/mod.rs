//! # 工具函数模块
//!
//! 终端输出样式、进度条与日志初始化。
//!
//! ## 依赖关系
//! - 被 `batch/` 与命令行层使用
//! - 子模块: logging, output, progress

pub mod logging;
pub mod output;
pub mod progress;
