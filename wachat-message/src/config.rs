use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use wachat_core::config::{ConfigManager, MessageServiceConfig, WaChatAppConfig};
use wachat_core::error::WaChatError;

use crate::domain::model::{AutoReplyPolicy, MessageDomainConfig};

pub const DEFAULT_COLLECTION: &str = "processed_messages";
pub const DEFAULT_DATABASE: &str = "whatsapp";
pub const DEFAULT_VERIFY_TOKEN: &str = "your_verify_token_here";
pub const DEFAULT_BUSINESS_NUMBER: &str = "business_number";
pub const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// 消息服务运行配置（配置文件 + 环境变量覆盖）
#[derive(Clone, Debug)]
pub struct MessageServiceSettings {
    pub mongo_uri: Option<String>,
    pub mongo_database: String,
    pub collection: String,
    pub webhook_verify_token: String,
    pub business_phone_number: String,
    pub auto_reply: bool,
    pub auto_reply_delivered_after: Duration,
    pub auto_reply_read_after: Duration,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub frontend_dir: Option<PathBuf>,
    pub body_limit_bytes: usize,
    pub shutdown_grace: Duration,
    pub push_buffer: usize,
    pub port_override: Option<u16>,
}

impl Default for MessageServiceSettings {
    fn default() -> Self {
        Self {
            mongo_uri: None,
            mongo_database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            webhook_verify_token: DEFAULT_VERIFY_TOKEN.to_string(),
            business_phone_number: DEFAULT_BUSINESS_NUMBER.to_string(),
            auto_reply: false,
            auto_reply_delivered_after: Duration::from_secs(1),
            auto_reply_read_after: Duration::from_secs(3),
            environment: "development".to_string(),
            cors_origins: default_cors_origins(),
            frontend_dir: None,
            body_limit_bytes: DEFAULT_BODY_LIMIT,
            shutdown_grace: Duration::from_secs(10),
            push_buffer: 256,
            port_override: None,
        }
    }
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

impl MessageServiceSettings {
    /// 从应用配置加载，环境变量优先
    pub fn from_app_config(app: &WaChatAppConfig) -> Result<Self> {
        let service = app.message_service();
        let mut settings = Self::from_service_config(app, &service);

        if let Some(uri) = ConfigManager::env_string("MONGODB_URI") {
            settings.mongo_uri = Some(uri);
        }
        if let Some(database) = ConfigManager::env_string("MONGODB_DATABASE") {
            settings.mongo_database = database;
        }
        if let Some(token) = ConfigManager::env_string("WEBHOOK_VERIFY_TOKEN") {
            settings.webhook_verify_token = token;
        }
        if let Some(number) = ConfigManager::env_string("BUSINESS_PHONE_NUMBER") {
            settings.business_phone_number = number;
        }
        if let Some(enabled) = ConfigManager::env_bool("AUTO_REPLY") {
            settings.auto_reply = enabled;
        }
        if let Some(dir) = ConfigManager::env_string("FRONTEND_DIR") {
            settings.frontend_dir = Some(PathBuf::from(dir));
        }
        settings.port_override = ConfigManager::env_parse::<u16>("PORT");
        settings.environment = ConfigManager::get_environment();

        Ok(settings)
    }

    /// 仅从配置文件内容构建（不读取环境变量）
    pub fn from_service_config(app: &WaChatAppConfig, service: &MessageServiceConfig) -> Self {
        let defaults = Self::default();
        let profile = service
            .mongodb
            .as_ref()
            .and_then(|name| app.mongodb_profile(name));

        let delivered_after = service
            .auto_reply_delivered_after_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.auto_reply_delivered_after);
        let read_after = service
            .auto_reply_read_after_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.auto_reply_read_after)
            .max(delivered_after);

        Self {
            mongo_uri: profile.map(|profile| profile.url.clone()),
            mongo_database: profile
                .and_then(|profile| profile.database.clone())
                .unwrap_or(defaults.mongo_database),
            collection: service.collection.clone().unwrap_or(defaults.collection),
            webhook_verify_token: service
                .webhook_verify_token
                .clone()
                .unwrap_or(defaults.webhook_verify_token),
            business_phone_number: service
                .business_phone_number
                .clone()
                .unwrap_or(defaults.business_phone_number),
            auto_reply: service.auto_reply.unwrap_or(false),
            auto_reply_delivered_after: delivered_after,
            auto_reply_read_after: read_after,
            environment: defaults.environment,
            cors_origins: service
                .cors_origins
                .clone()
                .filter(|origins| !origins.is_empty())
                .unwrap_or(defaults.cors_origins),
            frontend_dir: service.frontend_dir.as_ref().map(PathBuf::from),
            body_limit_bytes: service
                .body_limit_bytes
                .unwrap_or(defaults.body_limit_bytes),
            shutdown_grace: service
                .shutdown_grace_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_grace),
            push_buffer: service.push_buffer.unwrap_or(defaults.push_buffer).max(1),
            port_override: None,
        }
    }

    /// MongoDB 连接串为必填项
    pub fn require_mongo_uri(&self) -> wachat_core::error::Result<&str> {
        self.mongo_uri
            .as_deref()
            .ok_or_else(|| WaChatError::Config("MONGODB_URI environment variable is required".into()))
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn domain_config(&self) -> MessageDomainConfig {
        let config = MessageDomainConfig::new(self.business_phone_number.clone());
        if self.auto_reply {
            config.with_auto_reply(AutoReplyPolicy {
                delivered_after: self.auto_reply_delivered_after,
                read_after: self.auto_reply_read_after,
            })
        } else {
            config
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wachat_core::config::{MongoInstanceConfig, ServicesConfig};

    #[test]
    fn defaults_match_service_contract() {
        let settings = MessageServiceSettings::default();
        assert_eq!(settings.collection, "processed_messages");
        assert_eq!(settings.business_phone_number, "business_number");
        assert_eq!(settings.body_limit_bytes, 10 * 1024 * 1024);
        let err = settings.require_mongo_uri().unwrap_err();
        assert!(matches!(err, WaChatError::Config(_)));
        assert_eq!(
            err.to_string(),
            "Configuration error: MONGODB_URI environment variable is required"
        );
        assert!(settings.domain_config().auto_reply.is_none());
    }

    #[test]
    fn service_section_resolves_mongo_profile() {
        let mut app = WaChatAppConfig::default();
        app.mongodb.insert(
            "primary".to_string(),
            MongoInstanceConfig {
                url: "mongodb://localhost:27017".to_string(),
                database: Some("wachat".to_string()),
            },
        );
        let service = MessageServiceConfig {
            mongodb: Some("primary".to_string()),
            auto_reply: Some(true),
            auto_reply_delivered_after_ms: Some(500),
            auto_reply_read_after_ms: Some(200),
            cors_origins: Some(vec![]),
            ..Default::default()
        };
        app.services = ServicesConfig {
            message: Some(service.clone()),
        };

        let settings = MessageServiceSettings::from_service_config(&app, &service);
        assert_eq!(settings.require_mongo_uri().unwrap(), "mongodb://localhost:27017");
        assert_eq!(settings.mongo_database, "wachat");
        // 已读不早于送达
        assert_eq!(settings.auto_reply_read_after, Duration::from_millis(500));
        assert_eq!(settings.cors_origins.len(), 2);

        let policy = settings.domain_config().auto_reply.unwrap();
        assert_eq!(policy.delivered_after, Duration::from_millis(500));
    }
}
