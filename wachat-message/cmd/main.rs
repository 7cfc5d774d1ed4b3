//! # WaChat 消息服务入口
//!
//! 启动 HTTP API、Webhook 回调与 WebSocket 推送

use anyhow::Result;
use clap::Parser;
use tracing::error;
use wachat_core::tracing::init_tracing;
use wachat_core::utils::ServiceHelper;
use wachat_message::service::ApplicationBootstrap;

#[derive(Debug, Parser)]
#[command(name = "wachat-message", version, about = "WhatsApp-style messaging backend")]
struct Args {
    /// 配置文件或配置目录
    #[arg(long, short = 'c', env = "WACHAT_CONFIG")]
    config: Option<String>,

    /// 严格校验配置引用
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let app_config = ServiceHelper::load_config(args.config.as_deref(), args.strict)?;
    init_tracing("wachat-message", Some(&app_config.logging));

    if let Err(err) = ApplicationBootstrap::run(app_config).await {
        error!(error = %format!("{err:#}"), "message service exited with error");
        return Err(err);
    }
    Ok(())
}
