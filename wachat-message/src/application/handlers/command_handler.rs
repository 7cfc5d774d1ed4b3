//! 命令处理器（编排层）- 轻量级，只负责编排领域服务

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument};
use wachat_core::error::Result;

use crate::application::commands::{
    ClearMessagesCommand, ImportMessagesCommand, IngestWebhookCommand, SendMessageCommand,
    UpdateStatusCommand,
};
use crate::domain::model::{IngestionReport, Message};
use crate::domain::service::MessageDomainService;

/// 导入结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    pub inserted: u64,
    pub skipped: u64,
}

/// 消息命令处理器
pub struct MessageCommandHandler {
    domain_service: Arc<MessageDomainService>,
}

impl MessageCommandHandler {
    pub fn new(domain_service: Arc<MessageDomainService>) -> Self {
        Self { domain_service }
    }

    #[instrument(skip(self, command), fields(wa_id = %command.wa_id))]
    pub async fn handle_send_message(&self, command: SendMessageCommand) -> Result<Message> {
        self.domain_service
            .send_message(
                &command.wa_id,
                &command.text,
                command.profile_name.as_deref(),
            )
            .await
    }

    #[instrument(skip(self), fields(message_id = %command.message_id, status = %command.status))]
    pub async fn handle_update_status(&self, command: UpdateStatusCommand) -> Result<Message> {
        self.domain_service
            .update_status(&command.message_id, command.status)
            .await
    }

    /// 处理 webhook 载荷；单条失败只体现在报告中
    #[instrument(skip(self, command), fields(entries = command.payload.entry.len()))]
    pub async fn handle_ingest_webhook(&self, command: IngestWebhookCommand) -> IngestionReport {
        let start = Instant::now();
        let report = self.domain_service.ingest_webhook(&command.payload).await;
        info!(
            duration_ms = start.elapsed().as_millis() as u64,
            inserted = report.inserted,
            "webhook ingestion finished"
        );
        report
    }

    #[instrument(skip(self, command), fields(count = command.messages.len()))]
    pub async fn handle_import(&self, command: ImportMessagesCommand) -> Result<ImportOutcome> {
        let mut outcome = ImportOutcome::default();
        for message in &command.messages {
            if self.domain_service.import_message(message).await? {
                outcome.inserted += 1;
            } else {
                outcome.skipped += 1;
            }
        }
        Ok(outcome)
    }

    #[instrument(skip(self, _command))]
    pub async fn handle_clear(&self, _command: ClearMessagesCommand) -> Result<u64> {
        self.domain_service.clear_all().await
    }
}
