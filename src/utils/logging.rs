//! # 日志初始化
//!
//! 使用 `tracing-subscriber` 的 fmt 订阅器，输出到 stderr，
//! 不干扰 stdout 上的结果与表格。
//!
//! 过滤规则优先级：`--log-level` 参数 > `NWHARNESS_LOG` 环境变量 > `warn`。
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 使用 `tracing-subscriber`

use tracing_subscriber::EnvFilter;

/// 日志过滤环境变量
pub const LOG_ENV: &str = "NWHARNESS_LOG";

const DEFAULT_DIRECTIVE: &str = "warn";

/// 构造过滤器；非法指令回退到默认级别
pub fn build_filter(level: Option<&str>) -> EnvFilter {
    let directive = level
        .map(|s| s.to_string())
        .or_else(|| std::env::var(LOG_ENV).ok())
        .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string());

    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// 安装全局订阅器；重复调用时保持已有的订阅器
pub fn init(level: Option<&str>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
