//! WaChat Core 配置模块
//!
//! 该模块提供了完整的应用程序配置管理功能，包括：
//! - 配置文件/配置目录加载和解析
//! - 环境特定配置覆盖
//! - MongoDB 实例与消息服务配置定义

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use toml::Value;
use tracing::warn;

mod manager;
pub use manager::ConfigManager;

/// 全局应用配置实例，使用 OnceLock 确保只初始化一次
static APP_CONFIG: OnceLock<WaChatAppConfig> = OnceLock::new();

/// MongoDB 实例配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MongoInstanceConfig {
    /// MongoDB 连接 URL
    pub url: String,
    /// 数据库名称
    #[serde(default)]
    pub database: Option<String>,
}

/// 服务端点配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServiceEndpointConfig {
    /// 服务地址
    pub address: Option<String>,
    /// 服务端口
    pub port: Option<u16>,
}

/// 服务运行时配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServiceRuntimeConfig {
    /// 服务名称
    #[serde(default)]
    pub service_name: Option<String>,
    /// 服务器配置
    #[serde(default)]
    pub server: Option<ServiceEndpointConfig>,
}

/// 全局监听配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 3001,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（RUST_LOG 优先）
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 输出格式：pretty / json
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_true")]
    pub with_target: bool,
    #[serde(default)]
    pub with_thread_ids: bool,
    #[serde(default)]
    pub with_file: bool,
    #[serde(default)]
    pub with_line_number: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            with_target: true,
            with_thread_ids: false,
            with_file: false,
            with_line_number: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_true() -> bool {
    true
}

/// 消息服务配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MessageServiceConfig {
    /// 运行时配置
    #[serde(flatten)]
    pub runtime: ServiceRuntimeConfig,
    /// MongoDB 配置引用
    #[serde(default)]
    pub mongodb: Option<String>,
    /// 消息集合名称
    #[serde(default)]
    pub collection: Option<String>,
    /// Webhook 订阅校验令牌
    #[serde(default)]
    pub webhook_verify_token: Option<String>,
    /// 业务号码（出站消息的发送方）
    #[serde(default)]
    pub business_phone_number: Option<String>,
    /// 是否开启自动回复
    #[serde(default)]
    pub auto_reply: Option<bool>,
    /// 自动回复标记为已送达的延迟（毫秒）
    #[serde(default)]
    pub auto_reply_delivered_after_ms: Option<u64>,
    /// 自动回复标记为已读的延迟（毫秒）
    #[serde(default)]
    pub auto_reply_read_after_ms: Option<u64>,
    /// 开发环境允许的跨域来源
    #[serde(default)]
    pub cors_origins: Option<Vec<String>>,
    /// 生产环境前端静态目录
    #[serde(default)]
    pub frontend_dir: Option<String>,
    /// 请求体大小上限（字节）
    #[serde(default)]
    pub body_limit_bytes: Option<usize>,
    /// 优雅停机等待时间（秒）
    #[serde(default)]
    pub shutdown_grace_seconds: Option<u64>,
    /// 推送广播缓冲区大小
    #[serde(default)]
    pub push_buffer: Option<usize>,
}

/// 服务配置集合
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServicesConfig {
    /// 消息服务配置
    #[serde(default)]
    pub message: Option<MessageServiceConfig>,
}

/// WaChat 应用配置主结构体
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WaChatAppConfig {
    /// 全局监听配置
    #[serde(default)]
    pub server: ServerConfig,
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
    /// MongoDB 配置映射
    #[serde(default)]
    pub mongodb: HashMap<String, MongoInstanceConfig>,
    /// 服务配置
    #[serde(default)]
    pub services: ServicesConfig,
}

impl WaChatAppConfig {
    /// 获取 MongoDB 配置
    pub fn mongodb_profile(&self, name: &str) -> Option<&MongoInstanceConfig> {
        self.mongodb.get(name)
    }

    /// 获取消息服务配置
    pub fn message_service(&self) -> MessageServiceConfig {
        self.services.message.clone().unwrap_or_default()
    }

    /// 校验服务配置中引用的基础设施配置是否存在
    pub fn validate_references(&self) -> Result<()> {
        if let Some(message) = &self.services.message {
            if let Some(name) = &message.mongodb {
                if self.mongodb_profile(name).is_none() {
                    return Err(anyhow!(
                        "services.message references unknown mongodb profile '{}'",
                        name
                    ));
                }
            }
        }
        Ok(())
    }

    /// 组合服务监听地址（服务级配置优先）
    pub fn compose_server_config(&self, runtime: &ServiceRuntimeConfig) -> ServerConfig {
        let mut server = self.server.clone();
        if let Some(endpoint) = runtime.server.as_ref() {
            if let Some(address) = endpoint.address.as_ref() {
                server.address = address.clone();
            }
            if let Some(port) = endpoint.port {
                server.port = port;
            }
        }
        server
    }

    /// 确保配置有默认值
    fn ensure_defaults(&mut self) {
        if self.server.address.is_empty() {
            self.server.address = "0.0.0.0".to_string();
        }
        if self.server.port == 0 {
            self.server.port = 3001;
        }
    }
}

/// 加载配置（进程内只加载一次）
pub fn load_config(path: Option<&str>) -> &'static WaChatAppConfig {
    let candidates: Vec<PathBuf> = match path {
        Some(p) => vec![PathBuf::from(p)],
        None => vec![PathBuf::from("config"), PathBuf::from("config.toml")],
    };

    APP_CONFIG.get_or_init(|| load_with_fallback(&candidates))
}

/// 从指定文件或目录加载配置，并应用当前环境的覆盖配置
pub fn load_config_from_path(path: &Path) -> Result<WaChatAppConfig> {
    load_config_for_environment(path, &ConfigManager::get_environment())
}

/// 按指定环境名加载配置
pub fn load_config_for_environment(path: &Path, environment: &str) -> Result<WaChatAppConfig> {
    if !path.exists() {
        return Err(anyhow!(
            "configuration path {} does not exist",
            path.display()
        ));
    }

    let metadata = path
        .metadata()
        .with_context(|| format!("unable to read metadata for {}", path.display()))?;

    let (mut merged, overlay_root) = if metadata.is_dir() {
        (load_directory_value(path)?, path.to_path_buf())
    } else {
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        (load_toml_value(path)?, parent)
    };

    ConfigManager::apply_environment_overlay(&mut merged, &overlay_root, environment)?;

    let mut cfg: WaChatAppConfig = merged
        .try_into()
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    cfg.ensure_defaults();
    Ok(cfg)
}

/// 使用备选方案加载配置
fn load_with_fallback(candidates: &[PathBuf]) -> WaChatAppConfig {
    for path in candidates {
        match load_config_from_path(path) {
            Ok(cfg) => return cfg,
            Err(err) => {
                warn!("failed to load config from {}: {err:#}", path.display());
            }
        }
    }

    warn!("no configuration source succeeded, falling back to defaults");
    WaChatAppConfig::default()
}

/// 从目录加载配置：base.toml + shared/ + services/ + overrides/
fn load_directory_value(path: &Path) -> Result<Value> {
    let base_file = path.join("base.toml");
    if !base_file.exists() {
        return Err(anyhow!(
            "missing base configuration: {}",
            base_file.display()
        ));
    }

    let mut merged = load_toml_value(&base_file)?;

    if !merged.is_table() {
        return Err(anyhow!(
            "base configuration must be a table: {}",
            base_file.display()
        ));
    }

    merge_directory(&mut merged, &path.join("shared"))?;
    merge_directory(&mut merged, &path.join("services"))?;
    merge_directory(&mut merged, &path.join("overrides"))?;

    Ok(merged)
}

/// 合并目录中的配置
fn merge_directory(root: &mut Value, dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("unable to read config directory {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(OsStr::to_str)
                .map(|ext| ext.eq_ignore_ascii_case("toml"))
                .unwrap_or(false)
        })
        .collect::<Vec<_>>();

    entries.sort_by_key(|entry| entry.path());

    for entry in entries {
        let value = load_toml_value(&entry.path())?;
        merge_value(root, value);
    }

    Ok(())
}

/// 加载 TOML 值
fn load_toml_value(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read config fragment {}", path.display()))?;
    let value: Value = toml::from_str(&content)
        .with_context(|| format!("invalid TOML content in fragment {}", path.display()))?;
    Ok(value)
}

/// 合并值（表递归合并，其余类型直接覆盖）
pub(crate) fn merge_value(base: &mut Value, overlay: Value) {
    match overlay {
        Value::Table(overlay_table) => {
            if let Value::Table(base_table) = base {
                for (key, overlay_value) in overlay_table.into_iter() {
                    match base_table.get_mut(&key) {
                        Some(base_value) => merge_value(base_value, overlay_value),
                        None => {
                            base_table.insert(key, overlay_value);
                        }
                    }
                }
            } else {
                *base = Value::Table(overlay_table);
            }
        }
        other => {
            *base = other;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn loads_single_file_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.toml");
        write(
            &file,
            r#"
[mongodb.primary]
url = "mongodb://localhost:27017"
database = "whatsapp"

[services.message]
mongodb = "primary"
webhook_verify_token = "secret"
"#,
        );

        let cfg = load_config_for_environment(&file, "development").unwrap();
        assert_eq!(cfg.server.address, "0.0.0.0");
        assert_eq!(cfg.server.port, 3001);
        assert_eq!(cfg.logging.level, "info");

        let message = cfg.message_service();
        assert_eq!(message.webhook_verify_token.as_deref(), Some("secret"));
        assert_eq!(
            cfg.mongodb_profile("primary").and_then(|p| p.database.as_deref()),
            Some("whatsapp")
        );
        cfg.validate_references().unwrap();
    }

    #[test]
    fn directory_fragments_are_merged_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("base.toml"),
            r#"
[server]
address = "127.0.0.1"
port = 4000

[logging]
level = "debug"
"#,
        );
        write(
            &dir.path().join("services/message.toml"),
            r#"
[services.message]
business_phone_number = "15550001111"
auto_reply = true

[services.message.server]
port = 4100
"#,
        );
        write(
            &dir.path().join("overrides/local.toml"),
            r#"
[logging]
format = "json"
"#,
        );

        let cfg = load_config_for_environment(dir.path(), "development").unwrap();
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.logging.format, "json");

        let message = cfg.message_service();
        assert_eq!(message.auto_reply, Some(true));
        let server = cfg.compose_server_config(&message.runtime);
        assert_eq!(server.address, "127.0.0.1");
        assert_eq!(server.port, 4100);
    }

    #[test]
    fn environment_overlay_overrides_base() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("base.toml"), "[server]\nport = 4000\n");
        write(
            &dir.path().join("environments/production.toml"),
            "[server]\nport = 8080\n",
        );

        let dev = load_config_for_environment(dir.path(), "development").unwrap();
        assert_eq!(dev.server.port, 4000);

        let prod = load_config_for_environment(dir.path(), "production").unwrap();
        assert_eq!(prod.server.port, 8080);
    }

    #[test]
    fn unknown_mongodb_reference_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.toml");
        write(&file, "[services.message]\nmongodb = \"missing\"\n");

        let cfg = load_config_for_environment(&file, "development").unwrap();
        let err = cfg.validate_references().unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn missing_directory_base_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config_for_environment(dir.path(), "development").is_err());
    }
}
