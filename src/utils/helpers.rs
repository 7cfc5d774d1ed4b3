//! 辅助工具函数模块
//!
//! 提供配置加载、服务初始化等常用辅助函数

use crate::config::{ServiceRuntimeConfig, WaChatAppConfig};
use anyhow::{Context, Result};
use std::net::SocketAddr;

/// 服务启动辅助函数
pub struct ServiceHelper;

impl ServiceHelper {
    /// 加载配置并验证
    ///
    /// # 参数
    /// * `config_path` - 配置路径
    /// * `strict` - 是否严格验证配置引用
    pub fn load_config(config_path: Option<&str>, strict: bool) -> Result<&'static WaChatAppConfig> {
        crate::config::ConfigManager::load_dotenv();
        let config = crate::config::load_config(config_path);

        if strict {
            config
                .validate_references()
                .with_context(|| "configuration validation failed")?;
            return Ok(config);
        }

        // 非严格模式下，即使验证失败也继续运行，只记录警告日志
        if let Err(e) = config.validate_references() {
            tracing::warn!("configuration reference validation failed: {}", e);
        }

        Ok(config)
    }

    /// 从服务配置中解析服务器地址
    ///
    /// # 参数
    /// * `config` - 应用配置
    /// * `runtime` - 服务运行时配置
    /// * `port_override` - 外部指定的端口（如 PORT 环境变量）
    pub fn parse_server_addr(
        config: &WaChatAppConfig,
        runtime: &ServiceRuntimeConfig,
        port_override: Option<u16>,
    ) -> Result<SocketAddr> {
        let server = config.compose_server_config(runtime);
        let port = port_override.unwrap_or(server.port);
        let addr = format!("{}:{}", server.address, port)
            .parse()
            .with_context(|| format!("invalid server address: {}:{}", server.address, port))?;
        Ok(addr)
    }
}
