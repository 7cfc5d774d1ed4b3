//! # 日志初始化模块
//!
//! 为各个服务提供统一的 tracing 日志初始化能力。

use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;

/// 从配置初始化日志系统
///
/// # 参数
/// * `logging_config` - 日志配置（可选），如果为 None 则使用默认配置（info 级别）
///
/// # 示例
/// ```rust,ignore
/// use wachat_core::config::LoggingConfig;
///
/// // 使用默认配置
/// init_tracing_from_config(None);
///
/// // 使用 JSON 输出
/// let config = LoggingConfig {
///     format: "json".to_string(),
///     ..LoggingConfig::default()
/// };
/// init_tracing_from_config(Some(&config));
/// ```
pub fn init_tracing_from_config(logging_config: Option<&LoggingConfig>) {
    let default_config = LoggingConfig::default();
    let config = logging_config.unwrap_or(&default_config);

    // 优先使用环境变量 RUST_LOG，如果没有则使用配置文件的日志级别
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let builder = fmt::Subscriber::builder()
        .with_target(config.with_target)
        .with_thread_ids(config.with_thread_ids)
        .with_file(config.with_file)
        .with_line_number(config.with_line_number)
        .with_env_filter(env_filter);

    // 重复初始化（例如测试中）时忽略错误
    let result = if config.format.eq_ignore_ascii_case("json") {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(err) = result {
        ::tracing::debug!(error = %err, "tracing subscriber already initialised");
    }
}

/// 以服务名初始化日志并记录启动信息
pub fn init_tracing(service_name: &str, logging_config: Option<&LoggingConfig>) {
    init_tracing_from_config(logging_config);
    ::tracing::info!(service_name = %service_name, "tracing initialized");
}
