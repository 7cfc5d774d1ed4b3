//! Webhook 载荷处理：入站消息、状态回执、提供方错误

use std::sync::Arc;

use chrono::Utc;
use rand::seq::SliceRandom;
use tracing::{debug, error, info, warn};
use wachat_core::utils::{current_unix_seconds, generate_message_id};

use super::message_domain_service::{MessageDomainService, emit_with};
use crate::domain::model::{
    AutoReplyPolicy, ChangeValue, DocumentMeta, ImageMeta, IngestionReport, InboundMessage,
    Message, MessageKind, MessageStatus, ProviderTimestamp, PushEvent, StatusNotification,
    StatusUpdateEvent, TextBody, WebhookPayload,
};
use crate::domain::repository::{MessageRepository, PushPublisher};

/// 自动回复候选文本
pub const AUTO_REPLIES: [&str; 3] = [
    "Thank you for your message! We'll get back to you soon.",
    "Hi there! Thanks for reaching out. Someone from our team will assist you shortly.",
    "We've received your message and will respond as soon as possible.",
];

impl MessageDomainService {
    /// 处理完整的 webhook 载荷（所有 entry 与 change）
    ///
    /// 单条失败只记录日志并计入报告，不会中断整个载荷。
    pub async fn ingest_webhook(&self, payload: &WebhookPayload) -> IngestionReport {
        let mut report = IngestionReport::default();
        for entry in &payload.entry {
            for change in &entry.changes {
                let Some(value) = change.value.as_ref() else {
                    debug!(field = ?change.field, "webhook change without value");
                    continue;
                };
                report += self.process_change(value).await;
            }
        }
        info!(
            inserted = report.inserted,
            duplicates = report.duplicates,
            rejected = report.rejected,
            statuses_applied = report.statuses_applied,
            statuses_unmatched = report.statuses_unmatched,
            failed = report.failed,
            "webhook payload processed"
        );
        report
    }

    pub(crate) async fn process_change(&self, value: &ChangeValue) -> IngestionReport {
        let mut report = IngestionReport::default();

        for inbound in &value.messages {
            self.process_inbound(value, inbound, &mut report).await;
        }

        for status in &value.statuses {
            self.process_status(status, &mut report).await;
        }

        if !value.errors.is_empty() {
            error!(errors = ?value.errors, "WhatsApp API reported errors");
        }

        report
    }

    async fn process_inbound(
        &self,
        value: &ChangeValue,
        inbound: &InboundMessage,
        report: &mut IngestionReport,
    ) {
        let message = match self.normalize_inbound(value, inbound) {
            Ok(message) => message,
            Err(reason) => {
                warn!(message_id = %inbound.id, reason, "inbound message rejected");
                report.rejected += 1;
                return;
            }
        };

        match self.repo.insert_if_absent(&message).await {
            Ok(true) => {
                report.inserted += 1;
                info!(message_id = %message.id, from = %message.from, "saved incoming message");
                self.emit(PushEvent::NewMessage(message.clone())).await;
                if let Some(policy) = self.config.auto_reply {
                    self.send_auto_reply(&message.wa_id, &message.profile_name, policy)
                        .await;
                }
            }
            Ok(false) => {
                report.duplicates += 1;
                info!(message_id = %message.id, "message already exists, skipping");
            }
            Err(err) => {
                report.failed += 1;
                error!(message_id = %message.id, error = %err, "failed to store incoming message");
            }
        }
    }

    /// 将提供方的入站消息转换为存储实体
    pub(crate) fn normalize_inbound(
        &self,
        value: &ChangeValue,
        inbound: &InboundMessage,
    ) -> std::result::Result<Message, &'static str> {
        if inbound.id.is_empty() {
            return Err("missing message id");
        }
        if inbound.from.is_empty() {
            return Err("missing sender");
        }
        let timestamp = inbound
            .timestamp
            .as_ref()
            .and_then(ProviderTimestamp::as_unix_seconds)
            .ok_or("unparsable timestamp")?;

        let to = value
            .phone_number_id()
            .unwrap_or(self.config.business_phone_number.as_str());
        let profile_name = value
            .contact_name(&inbound.from)
            .unwrap_or(inbound.from.as_str());
        let kind = MessageKind::from(inbound.message_type.as_deref().unwrap_or("text"));

        let mut message = Message::text(
            inbound.id.clone(),
            inbound.from.clone(),
            inbound.from.clone(),
            to,
            timestamp,
            String::new(),
        )
        .with_status(MessageStatus::Delivered)
        .with_profile_name(profile_name);
        message.meta_msg_id = inbound.meta_msg_id.clone().filter(|id| !id.is_empty());

        let body = match &kind {
            MessageKind::Text => inbound
                .text
                .as_ref()
                .and_then(|text| text.body.clone())
                .unwrap_or_default(),
            MessageKind::Image => {
                let media = inbound.image.clone().unwrap_or_default();
                let body = media.caption().unwrap_or("[Image]").to_string();
                message.image = Some(ImageMeta {
                    caption: media.caption().unwrap_or_default().to_string(),
                    id: media.id,
                    mime_type: media.mime_type,
                    sha256: media.sha256,
                });
                body
            }
            MessageKind::Document => {
                let media = inbound.document.clone().unwrap_or_default();
                let body = match media.caption() {
                    Some(caption) => caption.to_string(),
                    None => format!(
                        "[Document: {}]",
                        media
                            .filename
                            .as_deref()
                            .filter(|name| !name.is_empty())
                            .unwrap_or("file")
                    ),
                };
                message.document = Some(DocumentMeta {
                    caption: media.caption().unwrap_or_default().to_string(),
                    id: media.id,
                    mime_type: media.mime_type,
                    sha256: media.sha256,
                    filename: media.filename,
                });
                body
            }
            MessageKind::Audio => "[Voice message]".to_string(),
            MessageKind::Video => inbound
                .video
                .as_ref()
                .and_then(|media| media.caption())
                .unwrap_or("[Video]")
                .to_string(),
            MessageKind::Other(other) => format!("[{other} message]"),
        };
        message.text = TextBody::new(body);
        message.message_type = kind;
        Ok(message)
    }

    async fn process_status(&self, status: &StatusNotification, report: &mut IngestionReport) {
        let Ok(new_status) = status.status.parse::<MessageStatus>() else {
            warn!(message_id = %status.id, status = %status.status, "unknown status value, skipping");
            report.rejected += 1;
            return;
        };

        let candidates = status.candidate_ids();
        if candidates.is_empty() {
            warn!("status notification without message id");
            report.rejected += 1;
            return;
        }

        match self
            .repo
            .update_status(&candidates, new_status, Utc::now())
            .await
        {
            Ok(Some(updated)) => {
                report.statuses_applied += 1;
                info!(message_id = %candidates[0], status = %new_status, "message status updated");
                self.emit(PushEvent::StatusUpdate(StatusUpdateEvent {
                    id: candidates[0].clone(),
                    status: new_status,
                    wa_id: updated.wa_id,
                    timestamp: status
                        .timestamp
                        .as_ref()
                        .and_then(ProviderTimestamp::as_unix_seconds),
                }))
                .await;
            }
            Ok(None) => {
                report.statuses_unmatched += 1;
                info!(candidates = ?candidates, "message not found for status update");
            }
            Err(err) => {
                report.failed += 1;
                error!(candidates = ?candidates, error = %err, "failed to apply status update");
            }
        }
    }

    /// 发送自动回复，并在后台模拟送达与已读
    async fn send_auto_reply(&self, wa_id: &str, profile_name: &str, policy: AutoReplyPolicy) {
        let body = AUTO_REPLIES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(AUTO_REPLIES[0]);

        let reply = Message::text(
            generate_message_id("auto_reply"),
            wa_id,
            self.config.business_phone_number.as_str(),
            wa_id,
            current_unix_seconds(),
            body,
        )
        .with_status(MessageStatus::Sent)
        .with_profile_name(profile_name);

        match self.repo.insert_if_absent(&reply).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(message_id = %reply.id, "auto reply id collided, skipping");
                return;
            }
            Err(err) => {
                error!(wa_id = %wa_id, error = %err, "failed to store auto reply");
                return;
            }
        }
        info!(message_id = %reply.id, wa_id = %wa_id, "sent auto reply");
        self.emit(PushEvent::NewMessage(reply.clone())).await;

        tokio::spawn(advance_auto_reply(
            self.repo.clone(),
            self.publisher.clone(),
            reply.id,
            reply.wa_id,
            policy,
        ));
    }
}

async fn advance_auto_reply(
    repo: Arc<dyn MessageRepository>,
    publisher: Arc<dyn PushPublisher>,
    message_id: String,
    wa_id: String,
    policy: AutoReplyPolicy,
) {
    let steps = [
        (MessageStatus::Delivered, policy.delivered_after),
        (
            MessageStatus::Read,
            policy.read_after.saturating_sub(policy.delivered_after),
        ),
    ];
    let candidates = vec![message_id.clone()];

    for (status, delay) in steps {
        tokio::time::sleep(delay).await;
        match repo.update_status(&candidates, status, Utc::now()).await {
            Ok(Some(_)) => {
                emit_with(
                    publisher.as_ref(),
                    PushEvent::StatusUpdate(StatusUpdateEvent {
                        id: message_id.clone(),
                        status,
                        wa_id: wa_id.clone(),
                        timestamp: None,
                    }),
                )
                .await;
            }
            Ok(None) => {
                debug!(message_id = %message_id, "auto reply removed before status update");
                return;
            }
            Err(err) => {
                error!(message_id = %message_id, error = %err, "failed to advance auto reply");
                return;
            }
        }
    }
}
