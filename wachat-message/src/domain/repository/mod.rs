use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::model::{
    ConversationStats, ConversationSummary, Message, MessageStatus, PushEvent,
};

/// 消息仓储接口（需要作为 trait 对象使用，保留 async-trait）
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// 插入消息；id 已存在时返回 `Ok(false)`
    async fn insert_if_absent(&self, message: &Message) -> Result<bool>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Message>>;

    /// 按 id 或 meta_msg_id 命中任一候选 ID 的第一条消息更新状态，返回更新后的消息
    async fn update_status(
        &self,
        candidate_ids: &[String],
        status: MessageStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Message>>;

    /// 会话消息，按时间倒序
    async fn list_conversation_messages(
        &self,
        wa_id: &str,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Message>>;

    async fn count_conversation_messages(&self, wa_id: &str) -> Result<u64>;

    /// 按 wa_id 分组的会话摘要，按最后一条消息时间倒序
    async fn conversation_summaries(&self) -> Result<Vec<ConversationSummary>>;

    async fn conversation_stats(&self, wa_id: &str) -> Result<ConversationStats>;

    async fn count_all(&self) -> Result<u64>;

    async fn distinct_conversations(&self) -> Result<Vec<String>>;

    /// 管理员批量清空，返回删除条数
    async fn delete_all(&self) -> Result<u64>;

    /// 存储连通性检查
    async fn ping(&self) -> Result<()>;
}

/// 实时推送发布接口
#[async_trait]
pub trait PushPublisher: Send + Sync {
    async fn publish(&self, event: PushEvent) -> Result<()>;

    /// 当前在线的订阅连接数
    fn subscriber_count(&self) -> usize {
        0
    }
}
