//! 应用启动器 - 负责依赖注入和服务启动

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};
use wachat_core::config::WaChatAppConfig;
use wachat_core::utils::ServiceHelper;

use super::wire;

/// 应用启动器
pub struct ApplicationBootstrap;

impl ApplicationBootstrap {
    /// 运行应用的主入口点
    pub async fn run(app_config: &'static WaChatAppConfig) -> Result<()> {
        let context = wire::initialize(app_config).await?;

        let service = app_config.message_service();
        let address: SocketAddr = ServiceHelper::parse_server_addr(
            app_config,
            &service.runtime,
            context.settings.port_override,
        )
        .context("invalid message service address")?;

        let listener = TcpListener::bind(address)
            .await
            .with_context(|| format!("failed to bind {address}"))?;
        info!(
            address = %address,
            environment = %context.settings.environment,
            "message service listening"
        );

        let grace = context.settings.shutdown_grace;
        Self::serve(listener, context.router(), grace).await
    }

    /// 启动 HTTP 服务，收到 SIGINT / SIGTERM 后优雅停机
    pub async fn serve(listener: TcpListener, router: Router, grace: Duration) -> Result<()> {
        Self::serve_until(listener, router, grace, shutdown_signal()).await
    }

    /// 启动 HTTP 服务，`signal` 完成后停止接收新连接并等待在途请求，
    /// 超过 `grace` 仍未结束则强制退出
    pub async fn serve_until<F>(
        listener: TcpListener,
        router: Router,
        grace: Duration,
        signal: F,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let mut server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.changed().await;
                })
                .await
        });

        tokio::select! {
            result = &mut server => {
                return match result {
                    Ok(result) => result.context("HTTP server error"),
                    Err(err) => Err(anyhow!("HTTP server task failed: {err}")),
                };
            }
            _ = signal => {}
        }

        info!("shutting down gracefully");
        let _ = shutdown_tx.send(true);

        match tokio::time::timeout(grace, &mut server).await {
            Ok(Ok(Ok(()))) => {
                info!("HTTP server closed");
                Ok(())
            }
            Ok(Ok(Err(err))) => Err(anyhow!(err).context("HTTP server error during shutdown")),
            Ok(Err(err)) => Err(anyhow!("HTTP server task failed: {err}")),
            Err(_) => {
                server.abort();
                warn!(grace_ms = grace.as_millis() as u64, "forced shutdown after grace period");
                Ok(())
            }
        }
    }
}

/// 等待 SIGINT / SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown signal received (SIGINT)"),
            Err(err) => {
                error!(error = %err, "failed to listen for SIGINT");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                info!("shutdown signal received (SIGTERM)");
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
