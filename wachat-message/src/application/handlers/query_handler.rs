//! 查询处理器（查询侧）

use std::sync::Arc;

use tracing::instrument;
use wachat_core::error::Result;

use crate::application::queries::{
    ConversationStatsQuery, ListConversationsQuery, ListMessagesQuery, StoreSummaryQuery,
};
use crate::domain::model::{ConversationStats, ConversationSummary, MessagePage};
use crate::domain::service::{MessageDomainService, StoreSummary};

pub struct MessageQueryHandler {
    domain_service: Arc<MessageDomainService>,
}

impl MessageQueryHandler {
    pub fn new(domain_service: Arc<MessageDomainService>) -> Self {
        Self { domain_service }
    }

    #[instrument(skip(self, _query))]
    pub async fn handle_list_conversations(
        &self,
        _query: ListConversationsQuery,
    ) -> Result<Vec<ConversationSummary>> {
        self.domain_service.list_conversations().await
    }

    #[instrument(skip(self), fields(wa_id = %query.wa_id))]
    pub async fn handle_list_messages(&self, query: ListMessagesQuery) -> Result<MessagePage> {
        self.domain_service
            .list_messages(&query.wa_id, query.page, query.limit)
            .await
    }

    #[instrument(skip(self), fields(wa_id = %query.wa_id))]
    pub async fn handle_conversation_stats(
        &self,
        query: ConversationStatsQuery,
    ) -> Result<ConversationStats> {
        self.domain_service.conversation_stats(&query.wa_id).await
    }

    #[instrument(skip(self, _query))]
    pub async fn handle_store_summary(&self, _query: StoreSummaryQuery) -> Result<StoreSummary> {
        self.domain_service.store_summary().await
    }

    /// 存储连通性，供健康检查使用
    pub async fn storage_healthy(&self) -> bool {
        self.domain_service.storage_healthy().await
    }

    pub fn subscriber_count(&self) -> usize {
        self.domain_service.subscriber_count()
    }
}
