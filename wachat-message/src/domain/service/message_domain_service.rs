//! 消息领域服务 - 发送、状态更新、会话查询等业务逻辑

use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use tracing::{debug, info, warn};
use wachat_core::error::{InfraResultExt, Result, WaChatError};
use wachat_core::{bail_infra, try_infra};
use wachat_core::utils::{current_unix_seconds, generate_message_id, total_pages};

use crate::domain::model::{
    ConversationStats, ConversationSummary, Message, MessageDomainConfig, MessagePage,
    MessageStatus, Pagination, PushEvent, StatusUpdateEvent,
};
use crate::domain::repository::{MessageRepository, PushPublisher};

/// 默认分页大小
pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// 存储层可接受的最大偏移量（Mongo 以 i64 编码 skip）
const MAX_SKIP: u64 = i64::MAX as u64;

/// 页码与页大小换算为偏移量
pub(crate) fn page_skip(page: u64, limit: u64) -> u64 {
    page.saturating_sub(1).saturating_mul(limit).min(MAX_SKIP)
}

/// 存储概况
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSummary {
    pub total_messages: u64,
    pub conversations: Vec<String>,
}

/// 消息领域服务 - 包含所有业务逻辑
pub struct MessageDomainService {
    pub(crate) repo: Arc<dyn MessageRepository>,
    pub(crate) publisher: Arc<dyn PushPublisher>,
    pub(crate) config: MessageDomainConfig,
}

impl MessageDomainService {
    pub fn new(
        repo: Arc<dyn MessageRepository>,
        publisher: Arc<dyn PushPublisher>,
        config: MessageDomainConfig,
    ) -> Self {
        Self {
            repo,
            publisher,
            config,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.publisher.subscriber_count()
    }

    /// 业务方发送文本消息
    pub async fn send_message(
        &self,
        wa_id: &str,
        text: &str,
        profile_name: Option<&str>,
    ) -> Result<Message> {
        let wa_id = wa_id.trim();
        let text = text.trim();
        if wa_id.is_empty() || text.is_empty() {
            return Err(WaChatError::validation("wa_id and text are required"));
        }

        let profile_name = profile_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(wa_id);

        let message = Message::text(
            generate_message_id("msg"),
            wa_id,
            self.config.business_phone_number.as_str(),
            wa_id,
            current_unix_seconds(),
            text,
        )
        .with_status(MessageStatus::Sent)
        .with_profile_name(profile_name);

        let inserted = self
            .repo
            .insert_if_absent(&message)
            .await
            .into_storage("Failed to store message")?;
        if !inserted {
            bail_infra!(
                anyhow!("message id {} already exists", message.id),
                "Failed to store message"
            );
        }

        info!(message_id = %message.id, wa_id = %message.wa_id, "outbound message stored");
        self.emit(PushEvent::NewMessage(message.clone())).await;
        Ok(message)
    }

    /// 按 id 或 meta_msg_id 更新消息状态
    pub async fn update_status(&self, message_id: &str, status: MessageStatus) -> Result<Message> {
        let candidates = vec![message_id.to_string()];
        let updated = self
            .repo
            .update_status(&candidates, status, Utc::now())
            .await
            .into_storage("Failed to update message status")?
            .ok_or_else(|| WaChatError::not_found("Message not found"))?;

        info!(message_id = %message_id, status = %status, "message status updated");
        self.emit(PushEvent::StatusUpdate(StatusUpdateEvent {
            id: message_id.to_string(),
            status,
            wa_id: updated.wa_id.clone(),
            timestamp: None,
        }))
        .await;
        Ok(updated)
    }

    /// 会话列表
    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        self.repo
            .conversation_summaries()
            .await
            .into_storage("Failed to fetch conversations")
    }

    /// 会话消息分页：按时间倒序分页，页内正序返回
    pub async fn list_messages(
        &self,
        wa_id: &str,
        page: Option<u64>,
        limit: Option<u64>,
    ) -> Result<MessagePage> {
        let page = page.unwrap_or(1).max(1);
        let limit = limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, self.config.max_page_size.max(1));
        let skip = page_skip(page, limit);

        let total_messages = self
            .repo
            .count_conversation_messages(wa_id)
            .await
            .into_storage("Failed to fetch messages")?;

        // 超出范围的页不访问存储
        let mut messages = if skip >= total_messages {
            Vec::new()
        } else {
            self.repo
                .list_conversation_messages(wa_id, skip, limit)
                .await
                .into_storage("Failed to fetch messages")?
        };
        messages.reverse();

        debug!(wa_id = %wa_id, page, limit, returned = messages.len(), "conversation page loaded");

        let has_more = skip + (messages.len() as u64) < total_messages;
        Ok(MessagePage {
            messages,
            pagination: Pagination {
                page,
                limit,
                total_messages,
                total_pages: total_pages(total_messages, limit),
                has_more,
            },
        })
    }

    /// 会话统计
    pub async fn conversation_stats(&self, wa_id: &str) -> Result<ConversationStats> {
        self.repo
            .conversation_stats(wa_id)
            .await
            .into_storage("Failed to fetch conversation stats")
    }

    /// 直接导入一条消息（不推送），id 已存在时返回 false
    pub async fn import_message(&self, message: &Message) -> Result<bool> {
        self.repo
            .insert_if_absent(message)
            .await
            .into_storage("Failed to import message")
    }

    /// 管理员批量清空
    pub async fn clear_all(&self) -> Result<u64> {
        let deleted = self
            .repo
            .delete_all()
            .await
            .into_storage("Failed to clear messages")?;
        warn!(deleted, "all messages cleared");
        Ok(deleted)
    }

    /// 存储概况：消息总数与会话列表
    pub async fn store_summary(&self) -> Result<StoreSummary> {
        let total_messages = try_infra!(self.repo.count_all().await, "Failed to count messages");
        let conversations = try_infra!(
            self.repo.distinct_conversations().await,
            "Failed to list conversations"
        );
        Ok(StoreSummary {
            total_messages,
            conversations,
        })
    }

    /// 存储是否可用
    pub async fn storage_healthy(&self) -> bool {
        match self.repo.ping().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "message store ping failed");
                false
            }
        }
    }

    /// 推送失败不影响主流程，只记录日志
    pub(crate) async fn emit(&self, event: PushEvent) {
        emit_with(self.publisher.as_ref(), event).await;
    }
}

/// 发布推送事件，发布失败转换为 `WaChatError::Push`
pub(crate) async fn publish_event(publisher: &dyn PushPublisher, event: PushEvent) -> Result<()> {
    let name = event.name();
    publisher
        .publish(event)
        .await
        .map_err(|err| WaChatError::Push(format!("{name}: {err:#}")))
}

pub(crate) async fn emit_with(publisher: &dyn PushPublisher, event: PushEvent) {
    if let Err(err) = publish_event(publisher, event).await {
        warn!(error = %err, "failed to publish push event");
    }
}
