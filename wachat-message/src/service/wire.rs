//! Wire 风格的依赖注入模块
//!
//! 按依赖顺序构建仓储、推送中心、领域服务与应用处理器

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::Router;
use tracing::info;
use wachat_core::config::WaChatAppConfig;

use crate::application::handlers::{MessageCommandHandler, MessageQueryHandler};
use crate::config::MessageServiceSettings;
use crate::domain::model::MessageDomainConfig;
use crate::domain::repository::{MessageRepository, PushPublisher};
use crate::domain::service::MessageDomainService;
use crate::infrastructure::persistence::MongoMessageStore;
use crate::infrastructure::push::{BroadcastHub, NullPushPublisher};
use crate::interface::http::{AppState, build_router};

/// 应用上下文 - 包含 HTTP 服务所需的全部组件
pub struct ApplicationContext {
    pub settings: Arc<MessageServiceSettings>,
    pub command_handler: Arc<MessageCommandHandler>,
    pub query_handler: Arc<MessageQueryHandler>,
    pub hub: Arc<BroadcastHub>,
}

impl ApplicationContext {
    pub fn app_state(&self) -> AppState {
        AppState {
            command_handler: Arc::clone(&self.command_handler),
            query_handler: Arc::clone(&self.query_handler),
            hub: Arc::clone(&self.hub),
            settings: Arc::clone(&self.settings),
            started_at: Instant::now(),
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.app_state())
    }
}

/// 离线工具上下文：不推送、不自动回复
pub struct ToolContext {
    pub settings: MessageServiceSettings,
    pub command_handler: Arc<MessageCommandHandler>,
    pub query_handler: Arc<MessageQueryHandler>,
}

fn build_handlers(
    repository: Arc<dyn MessageRepository>,
    publisher: Arc<dyn PushPublisher>,
    domain_config: MessageDomainConfig,
) -> (Arc<MessageCommandHandler>, Arc<MessageQueryHandler>) {
    let domain_service = Arc::new(MessageDomainService::new(
        repository,
        publisher,
        domain_config,
    ));
    (
        Arc::new(MessageCommandHandler::new(Arc::clone(&domain_service))),
        Arc::new(MessageQueryHandler::new(domain_service)),
    )
}

/// 使用给定仓储组装上下文（测试与本地开发可传入内存仓储）
pub fn build_context(
    settings: MessageServiceSettings,
    repository: Arc<dyn MessageRepository>,
) -> ApplicationContext {
    let hub = Arc::new(BroadcastHub::new(settings.push_buffer));
    let publisher: Arc<dyn PushPublisher> = hub.clone();
    let (command_handler, query_handler) =
        build_handlers(repository, publisher, settings.domain_config());

    ApplicationContext {
        settings: Arc::new(settings),
        command_handler,
        query_handler,
        hub,
    }
}

/// 构建应用上下文
///
/// # 参数
/// * `app_config` - 应用配置
pub async fn initialize(app_config: &WaChatAppConfig) -> Result<ApplicationContext> {
    let settings = MessageServiceSettings::from_app_config(app_config)
        .context("Failed to load message service settings")?;

    let store = MongoMessageStore::new(&settings)
        .await
        .context("Failed to connect to MongoDB")?;
    info!(
        collection = %settings.collection,
        auto_reply = settings.auto_reply,
        environment = %settings.environment,
        "message store ready"
    );

    Ok(build_context(settings, Arc::new(store)))
}

/// 构建离线工具上下文
pub async fn initialize_tools(app_config: &WaChatAppConfig) -> Result<ToolContext> {
    let mut settings = MessageServiceSettings::from_app_config(app_config)
        .context("Failed to load message service settings")?;
    settings.auto_reply = false;

    let store = MongoMessageStore::new(&settings)
        .await
        .context("Failed to connect to MongoDB")?;
    let (command_handler, query_handler) = build_handlers(
        Arc::new(store),
        Arc::new(NullPushPublisher),
        settings.domain_config(),
    );

    Ok(ToolContext {
        settings,
        command_handler,
        query_handler,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::InMemoryMessageStore;

    #[tokio::test]
    async fn context_shares_hub_with_query_handler() {
        let context = build_context(
            MessageServiceSettings::default(),
            Arc::new(InMemoryMessageStore::new()),
        );
        assert_eq!(context.query_handler.subscriber_count(), 0);

        let _receiver = context.hub.subscribe();
        assert_eq!(context.query_handler.subscriber_count(), 1);
        assert!(context.query_handler.storage_healthy().await);
    }
}
