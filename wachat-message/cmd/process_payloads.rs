//! 批量导入 Webhook 样例负载，目录为空时写入内置示例数据

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use wachat_core::tracing::init_tracing;
use wachat_core::utils::ServiceHelper;
use wachat_message::application::seed::PayloadProcessor;
use wachat_message::service::wire;

#[derive(Debug, Parser)]
#[command(name = "wachat-process-payloads", version, about = "Import webhook payload files")]
struct Args {
    #[arg(long, short = 'c', env = "WACHAT_CONFIG")]
    config: Option<String>,

    /// 负载 JSON 文件所在目录
    #[arg(long, default_value = "payloads")]
    dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let app_config = ServiceHelper::load_config(args.config.as_deref(), false)?;
    init_tracing("wachat-process-payloads", Some(&app_config.logging));

    let tools = wire::initialize_tools(app_config).await?;
    let processor = PayloadProcessor::new(
        tools.command_handler,
        tools.query_handler,
        tools.settings.business_phone_number.clone(),
    );

    let report = processor.process_directory(&args.dir).await?;
    info!(
        files_processed = report.files_processed,
        files_failed = report.files_failed,
        inserted = report.ingestion.inserted,
        duplicates = report.ingestion.duplicates,
        statuses_applied = report.ingestion.statuses_applied,
        seeded = report.seeded.map(|outcome| outcome.inserted).unwrap_or(0),
        "payload processing finished"
    );
    if let Some(summary) = report.summary {
        info!(
            total_messages = summary.total_messages,
            conversations = ?summary.conversations,
            "store summary"
        );
    }
    Ok(())
}
