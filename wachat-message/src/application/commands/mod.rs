//! 命令结构体定义（Command DTO）

use crate::domain::model::{Message, MessageStatus, WebhookPayload};

/// 业务方发送文本消息
#[derive(Debug, Clone)]
pub struct SendMessageCommand {
    pub wa_id: String,
    pub text: String,
    pub profile_name: Option<String>,
}

/// 手动更新消息状态
#[derive(Debug, Clone)]
pub struct UpdateStatusCommand {
    pub message_id: String,
    pub status: MessageStatus,
}

/// 处理一份 webhook 载荷
#[derive(Debug, Clone)]
pub struct IngestWebhookCommand {
    pub payload: WebhookPayload,
}

/// 批量导入已构造好的消息（按 id 幂等）
#[derive(Debug, Clone)]
pub struct ImportMessagesCommand {
    pub messages: Vec<Message>,
}

/// 清空全部消息
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearMessagesCommand;
