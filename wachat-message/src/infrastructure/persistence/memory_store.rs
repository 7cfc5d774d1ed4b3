use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::model::{ConversationStats, ConversationSummary, Message, MessageStatus};
use crate::domain::repository::MessageRepository;
use crate::domain::service::aggregation::{conversation_stats, summarize_conversations};

/// 内存消息仓储（本地开发与测试使用），按插入顺序保存
#[derive(Default, Clone)]
pub struct InMemoryMessageStore {
    messages: Arc<RwLock<Vec<Message>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_any(message: &Message, candidate_ids: &[String]) -> bool {
    candidate_ids.iter().any(|candidate| {
        message.id == *candidate || message.meta_msg_id.as_deref() == Some(candidate.as_str())
    })
}

#[async_trait]
impl MessageRepository for InMemoryMessageStore {
    async fn insert_if_absent(&self, message: &Message) -> Result<bool> {
        let mut guard = self.messages.write().await;
        if guard.iter().any(|existing| existing.id == message.id) {
            return Ok(false);
        }
        guard.push(message.clone());
        Ok(true)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Message>> {
        let guard = self.messages.read().await;
        Ok(guard.iter().find(|message| message.id == id).cloned())
    }

    async fn update_status(
        &self,
        candidate_ids: &[String],
        status: MessageStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Message>> {
        let mut guard = self.messages.write().await;
        if let Some(message) = guard
            .iter_mut()
            .find(|message| matches_any(message, candidate_ids))
        {
            message.status = status;
            message.updated_at = updated_at;
            return Ok(Some(message.clone()));
        }
        Ok(None)
    }

    async fn list_conversation_messages(
        &self,
        wa_id: &str,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Message>> {
        let guard = self.messages.read().await;
        let mut conversation: Vec<&Message> = guard
            .iter()
            .filter(|message| message.wa_id == wa_id)
            .collect();
        // 时间相同时后插入的排在前面
        conversation.reverse();
        conversation.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Ok(conversation
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn count_conversation_messages(&self, wa_id: &str) -> Result<u64> {
        let guard = self.messages.read().await;
        Ok(guard.iter().filter(|message| message.wa_id == wa_id).count() as u64)
    }

    async fn conversation_summaries(&self) -> Result<Vec<ConversationSummary>> {
        let guard = self.messages.read().await;
        Ok(summarize_conversations(guard.iter()))
    }

    async fn conversation_stats(&self, wa_id: &str) -> Result<ConversationStats> {
        let guard = self.messages.read().await;
        Ok(conversation_stats(
            guard.iter().filter(|message| message.wa_id == wa_id),
        ))
    }

    async fn count_all(&self) -> Result<u64> {
        Ok(self.messages.read().await.len() as u64)
    }

    async fn distinct_conversations(&self) -> Result<Vec<String>> {
        let guard = self.messages.read().await;
        let mut ids: Vec<String> = guard.iter().map(|message| message.wa_id.clone()).collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn delete_all(&self) -> Result<u64> {
        let mut guard = self.messages.write().await;
        let deleted = guard.len() as u64;
        guard.clear();
        Ok(deleted)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
