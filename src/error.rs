//! # 统一错误处理模块
//!
//! 定义 nwharness 的所有错误类型，使用 `thiserror` 派生。
//!
//! 整个流水线没有任何重试：每一种错误对单次计算都是终止性的，
//! 由调用方决定是否修正输入后重新提交。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// nwharness 统一错误类型
#[derive(Error, Debug)]
pub enum HarnessError {
    // ─────────────────────────────────────────────────────────────
    // 可用性错误
    // ─────────────────────────────────────────────────────────────
    #[error("Program '{program}' not found in PATH. {hint}")]
    NotFound { program: String, hint: String },

    #[error("Failed to detect program version: {0}")]
    VersionQuery(String),

    // ─────────────────────────────────────────────────────────────
    // 输入错误
    // ─────────────────────────────────────────────────────────────
    #[error("Input error: {0}")]
    InputError(String),

    #[error("Invalid keyword '{key}': {reason}")]
    InvalidKeyword { key: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // 执行错误
    // ─────────────────────────────────────────────────────────────
    #[error("Execution failed: {command}\n{stderr}")]
    ExecutionFailed {
        command: String,
        stdout: String,
        stderr: String,
    },

    #[error("Execution exceeded the {seconds} s timeout: {command}")]
    TimedOut { command: String, seconds: u64 },

    // ─────────────────────────────────────────────────────────────
    // 结果收集错误
    // ─────────────────────────────────────────────────────────────
    #[error("Quantity '{name}' was not found in program output")]
    MissingQuantity { name: String },

    #[error("Quantity '{name}' has unexpected shape: expected {expected}, found {found}")]
    ShapeMismatch {
        name: String,
        expected: String,
        found: String,
    },

    #[error("Failed to parse {what}\nReason: {reason}")]
    ParseError { what: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 序列化错误
    // ─────────────────────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

impl HarnessError {
    /// 程序报告的输入错误（区别于执行失败）
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            HarnessError::InputError(_) | HarnessError::InvalidKeyword { .. }
        )
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, HarnessError>;
