//! 清空消息集合（管理工具）

use anyhow::Result;
use clap::Parser;
use tracing::info;
use wachat_core::tracing::init_tracing;
use wachat_core::utils::ServiceHelper;
use wachat_message::application::commands::ClearMessagesCommand;
use wachat_message::service::wire;

#[derive(Debug, Parser)]
#[command(name = "wachat-clear-messages", version, about = "Delete every stored message")]
struct Args {
    #[arg(long, short = 'c', env = "WACHAT_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let app_config = ServiceHelper::load_config(args.config.as_deref(), false)?;
    init_tracing("wachat-clear-messages", Some(&app_config.logging));

    let tools = wire::initialize_tools(app_config).await?;
    let deleted = tools
        .command_handler
        .handle_clear(ClearMessagesCommand)
        .await?;
    info!(deleted, collection = %tools.settings.collection, "messages cleared");
    Ok(())
}
