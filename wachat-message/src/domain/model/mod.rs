//! 消息领域模型

pub mod webhook;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use webhook::{
    ChangeMetadata, ChangeValue, ContactProfile, InboundMedia, InboundMessage, InboundText,
    ProviderTimestamp, StatusNotification, WebhookChange, WebhookContact, WebhookEntry,
    WebhookPayload,
};

/// 消息状态（单调推进只是约定，不做强制）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    pub const ALL: [MessageStatus; 4] = [
        MessageStatus::Sent,
        MessageStatus::Delivered,
        MessageStatus::Read,
        MessageStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Read => "read",
            MessageStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown message status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for MessageStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// 消息类型判别字段，未知类型原样保留
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    Document,
    Audio,
    Video,
    Other(String),
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::Document => "document",
            MessageKind::Audio => "audio",
            MessageKind::Video => "video",
            MessageKind::Other(other) => other.as_str(),
        }
    }
}

impl From<String> for MessageKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "text" => MessageKind::Text,
            "image" => MessageKind::Image,
            "document" => MessageKind::Document,
            "audio" => MessageKind::Audio,
            "video" => MessageKind::Video,
            _ => MessageKind::Other(value),
        }
    }
}

impl From<&str> for MessageKind {
    fn from(value: &str) -> Self {
        MessageKind::from(value.to_string())
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 文本内容
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextBody {
    #[serde(default)]
    pub body: String,
}

impl TextBody {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

/// 图片元数据
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default)]
    pub caption: String,
}

/// 文档元数据
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default)]
    pub caption: String,
}

/// 消息实体（集合 processed_messages 中的一条记录）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// 提供方分配的消息 ID（唯一）
    pub id: String,
    /// 状态回执关联使用的第二 ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_msg_id: Option<String>,
    /// 会话键
    pub wa_id: String,
    pub from: String,
    pub to: String,
    /// Unix 时间戳（秒）
    pub timestamp: i64,
    #[serde(rename = "type", default)]
    pub message_type: MessageKind,
    #[serde(default)]
    pub text: TextBody,
    #[serde(default)]
    pub status: MessageStatus,
    #[serde(default)]
    pub profile_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentMeta>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// 构造一条文本消息，创建/更新时间取当前时间
    pub fn text(
        id: impl Into<String>,
        wa_id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        timestamp: i64,
        body: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            meta_msg_id: None,
            wa_id: wa_id.into(),
            from: from.into(),
            to: to.into(),
            timestamp,
            message_type: MessageKind::Text,
            text: TextBody::new(body),
            status: MessageStatus::Sent,
            profile_name: String::new(),
            image: None,
            document: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: MessageStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_profile_name(mut self, profile_name: impl Into<String>) -> Self {
        self.profile_name = profile_name.into();
        self
    }

    /// 是否由会话对端（联系人）发出
    pub fn is_from_contact(&self) -> bool {
        self.from == self.wa_id
    }

    /// 业务方发出且尚未被阅读
    pub fn is_unread_business(&self) -> bool {
        !self.is_from_contact() && self.status != MessageStatus::Read
    }
}

/// 会话列表中的最后一条消息预览
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastMessagePreview {
    pub text: TextBody,
    pub timestamp: i64,
    pub status: MessageStatus,
    #[serde(rename = "type")]
    pub message_type: MessageKind,
}

impl From<&Message> for LastMessagePreview {
    fn from(message: &Message) -> Self {
        Self {
            text: message.text.clone(),
            timestamp: message.timestamp,
            status: message.status,
            message_type: message.message_type.clone(),
        }
    }
}

/// 按 wa_id 分组的会话摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    #[serde(rename = "_id")]
    pub wa_id: String,
    pub profile_name: String,
    #[serde(rename = "messageCount")]
    pub message_count: u64,
    #[serde(rename = "unreadCount")]
    pub unread_count: u64,
    #[serde(rename = "lastMessage")]
    pub last_message: LastMessagePreview,
}

/// 单个会话的统计
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationStats {
    pub total_messages: u64,
    pub sent_by_business: u64,
    pub sent_by_user: u64,
    pub unread_messages: u64,
    pub first_message: Option<i64>,
    pub last_message: Option<i64>,
}

/// 分页信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total_messages: u64,
    pub total_pages: u64,
    pub has_more: bool,
}

/// 会话消息分页结果（页内按时间正序）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub pagination: Pagination,
}

/// 状态变更推送内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdateEvent {
    pub id: String,
    pub status: MessageStatus,
    pub wa_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// 实时推送事件，序列化为 `{"event": ..., "data": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PushEvent {
    NewMessage(Message),
    StatusUpdate(StatusUpdateEvent),
}

impl PushEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PushEvent::NewMessage(_) => "new_message",
            PushEvent::StatusUpdate(_) => "status_update",
        }
    }

    pub fn wa_id(&self) -> &str {
        match self {
            PushEvent::NewMessage(message) => &message.wa_id,
            PushEvent::StatusUpdate(update) => &update.wa_id,
        }
    }
}

/// Webhook 处理结果统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestionReport {
    pub inserted: u64,
    pub duplicates: u64,
    pub rejected: u64,
    pub statuses_applied: u64,
    pub statuses_unmatched: u64,
    /// 存储层失败的条目
    pub failed: u64,
}

impl std::ops::AddAssign for IngestionReport {
    fn add_assign(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
        self.rejected += other.rejected;
        self.statuses_applied += other.statuses_applied;
        self.statuses_unmatched += other.statuses_unmatched;
        self.failed += other.failed;
    }
}

/// 自动回复策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoReplyPolicy {
    pub delivered_after: Duration,
    pub read_after: Duration,
}

impl Default for AutoReplyPolicy {
    fn default() -> Self {
        Self {
            delivered_after: Duration::from_secs(1),
            read_after: Duration::from_secs(3),
        }
    }
}

/// 领域配置
#[derive(Debug, Clone)]
pub struct MessageDomainConfig {
    /// 业务号码，出站消息的 from
    pub business_phone_number: String,
    /// 为 None 时不发送自动回复
    pub auto_reply: Option<AutoReplyPolicy>,
    /// 单页消息数上限
    pub max_page_size: u64,
}

impl MessageDomainConfig {
    pub fn new(business_phone_number: impl Into<String>) -> Self {
        Self {
            business_phone_number: business_phone_number.into(),
            auto_reply: None,
            max_page_size: 500,
        }
    }

    pub fn with_auto_reply(mut self, policy: AutoReplyPolicy) -> Self {
        self.auto_reply = Some(policy);
        self
    }
}

impl Default for MessageDomainConfig {
    fn default() -> Self {
        Self::new("business_number")
    }
}
