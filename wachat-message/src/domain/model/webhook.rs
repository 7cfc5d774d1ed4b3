//! WhatsApp Cloud API Webhook 载荷结构
//!
//! 字段尽量宽松（缺省即空），单条坏数据由领域服务拒绝而不是让整个载荷解析失败。

use serde::Deserialize;

use wachat_core::utils::parse_unix_timestamp;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub value: Option<ChangeValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messaging_product: Option<String>,
    #[serde(default)]
    pub metadata: Option<ChangeMetadata>,
    #[serde(default)]
    pub contacts: Vec<WebhookContact>,
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
    #[serde(default)]
    pub statuses: Vec<StatusNotification>,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

impl ChangeValue {
    /// 查找与发送方匹配的联系人昵称
    pub fn contact_name(&self, wa_id: &str) -> Option<&str> {
        self.contacts
            .iter()
            .find(|contact| contact.wa_id.as_deref() == Some(wa_id))
            .and_then(|contact| contact.profile.as_ref())
            .and_then(|profile| profile.name.as_deref())
            .filter(|name| !name.is_empty())
    }

    pub fn phone_number_id(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.phone_number_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeMetadata {
    #[serde(default)]
    pub display_phone_number: Option<String>,
    #[serde(default)]
    pub phone_number_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookContact {
    #[serde(default)]
    pub wa_id: Option<String>,
    #[serde(default)]
    pub profile: Option<ContactProfile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactProfile {
    #[serde(default)]
    pub name: Option<String>,
}

/// 提供方时间戳：字符串或数字形式的 Unix 秒
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ProviderTimestamp {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ProviderTimestamp {
    pub fn as_unix_seconds(&self) -> Option<i64> {
        match self {
            ProviderTimestamp::Integer(value) => Some(*value),
            ProviderTimestamp::Float(value) if value.is_finite() => Some(value.trunc() as i64),
            ProviderTimestamp::Float(_) => None,
            ProviderTimestamp::Text(raw) => parse_unix_timestamp(raw),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundText {
    #[serde(default)]
    pub body: Option<String>,
}

/// 媒体类消息（image/document/audio/video）的公共字段
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundMedia {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

impl InboundMedia {
    /// 非空的说明文字
    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref().filter(|caption| !caption.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub timestamp: Option<ProviderTimestamp>,
    #[serde(rename = "type", default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub meta_msg_id: Option<String>,
    #[serde(default)]
    pub text: Option<InboundText>,
    #[serde(default)]
    pub image: Option<InboundMedia>,
    #[serde(default)]
    pub document: Option<InboundMedia>,
    #[serde(default)]
    pub audio: Option<InboundMedia>,
    #[serde(default)]
    pub video: Option<InboundMedia>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusNotification {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub meta_msg_id: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<ProviderTimestamp>,
    #[serde(default)]
    pub recipient_id: Option<String>,
}

impl StatusNotification {
    /// 参与对账的候选 ID（id 与 meta_msg_id，去空去重）
    pub fn candidate_ids(&self) -> Vec<String> {
        let mut ids = Vec::with_capacity(2);
        for id in [Some(self.id.as_str()), self.meta_msg_id.as_deref()]
            .into_iter()
            .flatten()
        {
            if !id.is_empty() && !ids.iter().any(|existing: &String| existing == id) {
                ids.push(id.to_string());
            }
        }
        ids
    }
}
