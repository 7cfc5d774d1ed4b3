//! 离线导入：处理本地 webhook 载荷文件，并在没有数据时写入示例会话

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use wachat_core::utils::current_unix_seconds;

use crate::application::commands::{ImportMessagesCommand, IngestWebhookCommand};
use crate::application::handlers::command_handler::ImportOutcome;
use crate::application::handlers::{MessageCommandHandler, MessageQueryHandler};
use crate::application::queries::StoreSummaryQuery;
use crate::domain::model::MessageStatus::{Delivered, Read};
use crate::domain::model::{IngestionReport, Message, MessageStatus, WebhookPayload};
use crate::domain::service::StoreSummary;

/// 业务方消息在示例数据中的显示昵称
pub const BUSINESS_PROFILE_NAME: &str = "You";

struct SampleMessage {
    id: &'static str,
    from_contact: bool,
    text: &'static str,
    seconds_ago: i64,
    status: MessageStatus,
}

struct SampleContact {
    wa_id: &'static str,
    profile_name: &'static str,
    messages: &'static [SampleMessage],
}

const fn sample(
    id: &'static str,
    from_contact: bool,
    text: &'static str,
    seconds_ago: i64,
    status: MessageStatus,
) -> SampleMessage {
    SampleMessage {
        id,
        from_contact,
        text,
        seconds_ago,
        status,
    }
}

const SAMPLE_CONTACTS: &[SampleContact] = &[
    SampleContact {
        wa_id: "1234567890",
        profile_name: "Ashutosh Rana",
        messages: &[
            sample("msg_Ashutosh_1", true, "Hello! How are you today?", 7200, Read),
            sample(
                "msg_business_Ashutosh_1",
                false,
                "Hi Ashutosh! I'm doing well, thank you for asking. How can I help you today?",
                7000,
                Read,
            ),
            sample(
                "msg_Ashutosh_2",
                true,
                "I wanted to ask about the project timeline.",
                6800,
                Delivered,
            ),
            sample(
                "msg_business_Ashutosh_2",
                false,
                "Sure! Let me check the current status and get back to you with an update.",
                6600,
                Read,
            ),
        ],
    },
    SampleContact {
        wa_id: "0987654321",
        profile_name: "Jane Smith",
        messages: &[
            sample(
                "msg_jane_1",
                true,
                "Good morning! I hope you're having a great day.",
                3600,
                Read,
            ),
            sample(
                "msg_business_jane_1",
                false,
                "Good morning Jane! Thank you, I hope you are too. What can I do for you?",
                3400,
                Read,
            ),
            sample(
                "msg_jane_2",
                true,
                "I was wondering if we could schedule our meeting for tomorrow?",
                3200,
                Delivered,
            ),
            sample("msg_jane_3", true, "See you tomorrow!", 600, Delivered),
        ],
    },
    SampleContact {
        wa_id: "5555555555",
        profile_name: "Customer Support",
        messages: &[
            sample(
                "msg_support_1",
                true,
                "Hello! I need help with my recent order.",
                10800,
                Read,
            ),
            sample(
                "msg_business_support_1",
                false,
                "Of course! I'd be happy to help. Can you provide your order number?",
                10600,
                Read,
            ),
            sample(
                "msg_business_support_2",
                false,
                "Your order has been shipped and should arrive in 2-3 business days.",
                3800,
                Read,
            ),
        ],
    },
    SampleContact {
        wa_id: "7777777777",
        profile_name: "Vivek Chauhan",
        messages: &[
            sample(
                "msg_Vivek_1",
                true,
                "Hi there! I saw your latest announcement.",
                14400,
                Read,
            ),
            sample(
                "msg_business_Vivek_1",
                false,
                "Hello Vivek! Thank you for reaching out. What did you think about it?",
                14200,
                Read,
            ),
            sample(
                "msg_Vivek_2",
                true,
                "It looks really promising! Thanks for the quick response!",
                7400,
                Read,
            ),
        ],
    },
    SampleContact {
        wa_id: "9999999999",
        profile_name: "Sarah Wilson",
        messages: &[
            sample(
                "msg_sarah_1",
                true,
                "Hello! I'm interested in your services.",
                18000,
                Read,
            ),
            sample(
                "msg_business_sarah_1",
                false,
                "Hi Sarah! That's wonderful to hear. I'd be happy to discuss our services with you.",
                17800,
                Read,
            ),
            sample(
                "msg_sarah_2",
                true,
                "Can we schedule a meeting to discuss this further?",
                10900,
                Delivered,
            ),
        ],
    },
];

/// 构造示例会话消息，时间戳相对 `now` 计算
pub fn sample_messages(now: i64, business_number: &str) -> Vec<Message> {
    SAMPLE_CONTACTS
        .iter()
        .flat_map(|contact| {
            contact.messages.iter().map(move |sample| {
                let (from, to, profile_name) = if sample.from_contact {
                    (contact.wa_id, business_number, contact.profile_name)
                } else {
                    (business_number, contact.wa_id, BUSINESS_PROFILE_NAME)
                };
                Message::text(
                    sample.id,
                    contact.wa_id,
                    from,
                    to,
                    now - sample.seconds_ago,
                    sample.text,
                )
                .with_status(sample.status)
                .with_profile_name(profile_name)
            })
        })
        .collect()
}

/// 一次载荷目录处理的结果
#[derive(Debug, Clone, Default)]
pub struct PayloadRunReport {
    pub files_processed: usize,
    pub files_failed: usize,
    pub ingestion: IngestionReport,
    pub seeded: Option<ImportOutcome>,
    pub summary: Option<StoreSummary>,
}

/// 载荷目录处理器
pub struct PayloadProcessor {
    command_handler: Arc<MessageCommandHandler>,
    query_handler: Arc<MessageQueryHandler>,
    business_number: String,
}

impl PayloadProcessor {
    pub fn new(
        command_handler: Arc<MessageCommandHandler>,
        query_handler: Arc<MessageQueryHandler>,
        business_number: impl Into<String>,
    ) -> Self {
        Self {
            command_handler,
            query_handler,
            business_number: business_number.into(),
        }
    }

    /// 按文件名顺序处理目录下的所有 `*.json` 载荷
    pub async fn process_directory(&self, dir: &Path) -> Result<PayloadRunReport> {
        let mut report = PayloadRunReport::default();

        if !dir.is_dir() {
            warn!(dir = %dir.display(), "payloads directory not found, creating sample data");
            report.seeded = Some(self.seed().await?);
            report.summary = Some(self.summary().await?);
            return Ok(report);
        }

        let files = list_payload_files(dir).await?;
        if files.is_empty() {
            info!(dir = %dir.display(), "no JSON payloads found, creating sample data");
            report.seeded = Some(self.seed().await?);
            report.summary = Some(self.summary().await?);
            return Ok(report);
        }

        info!(count = files.len(), "processing payload files");
        for file in &files {
            match read_payload(file).await {
                Ok(payload) => {
                    let ingestion = self
                        .command_handler
                        .handle_ingest_webhook(IngestWebhookCommand { payload })
                        .await;
                    info!(
                        file = %file.display(),
                        inserted = ingestion.inserted,
                        duplicates = ingestion.duplicates,
                        statuses = ingestion.statuses_applied,
                        "payload processed"
                    );
                    report.ingestion += ingestion;
                    report.files_processed += 1;
                }
                Err(err) => {
                    error!(file = %file.display(), error = %format!("{err:#}"), "failed to parse payload");
                    report.files_failed += 1;
                }
            }
        }

        let summary = self.summary().await?;
        info!(
            total_messages = summary.total_messages,
            conversations = summary.conversations.len(),
            "payload processing completed"
        );

        if summary.total_messages == 0 {
            info!("no messages were processed, creating sample data");
            report.seeded = Some(self.seed().await?);
            report.summary = Some(self.summary().await?);
        } else {
            report.summary = Some(summary);
        }
        Ok(report)
    }

    /// 写入示例数据（按消息 id 幂等）
    pub async fn seed(&self) -> Result<ImportOutcome> {
        let messages = sample_messages(current_unix_seconds(), &self.business_number);
        let outcome = self
            .command_handler
            .handle_import(ImportMessagesCommand { messages })
            .await?;
        info!(
            created = outcome.inserted,
            skipped = outcome.skipped,
            conversations = SAMPLE_CONTACTS.len(),
            "sample data created"
        );
        Ok(outcome)
    }

    async fn summary(&self) -> Result<StoreSummary> {
        let summary = self
            .query_handler
            .handle_store_summary(StoreSummaryQuery)
            .await?;
        info!(
            total_messages = summary.total_messages,
            conversation_ids = %summary.conversations.join(", "),
            "store summary"
        );
        Ok(summary)
    }
}

async fn list_payload_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("unable to read payloads directory {}", dir.display()))?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

async fn read_payload(path: &Path) -> Result<WebhookPayload> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("unable to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid payload JSON in {}", path.display()))
}
