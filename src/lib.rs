//! WaChat Core 公共库
//!
//! 提供统一的配置加载、错误模型、日志初始化和通用工具函数

pub mod config;
pub mod error;
pub mod tracing;
pub mod utils;

pub use config::{
    ConfigManager, LoggingConfig, MessageServiceConfig, MongoInstanceConfig, ServerConfig,
    ServiceEndpointConfig, ServiceRuntimeConfig, ServicesConfig, WaChatAppConfig, load_config,
    load_config_for_environment, load_config_from_path,
};
pub use error::*;
pub use utils::*;
