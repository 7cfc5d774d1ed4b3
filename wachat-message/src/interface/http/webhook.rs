//! WhatsApp Cloud API 回调 `/api/webhook`

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::state::AppState;
use crate::application::commands::IngestWebhookCommand;
use crate::domain::model::WebhookPayload;

#[derive(Debug, Default, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// 订阅校验：mode 为 subscribe 且 token 一致时回显 challenge
pub async fn verify(State(state): State<AppState>, Query(params): Query<VerifyParams>) -> Response {
    let subscribed = params.mode.as_deref() == Some("subscribe")
        && params.verify_token.as_deref() == Some(state.settings.webhook_verify_token.as_str());

    if subscribed {
        info!("webhook subscription verified");
        (StatusCode::OK, params.challenge.unwrap_or_default()).into_response()
    } else {
        warn!(mode = ?params.mode, "webhook verification rejected");
        (StatusCode::FORBIDDEN, "Forbidden").into_response()
    }
}

/// 接收回调并在回复前完成处理，回复 200 时消息已落库；处理失败只记日志
pub async fn receive(State(state): State<AppState>, body: Bytes) -> Response {
    let value: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "webhook body is not valid JSON");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid JSON payload" })),
            )
                .into_response();
        }
    };

    match serde_json::from_value::<WebhookPayload>(value) {
        Ok(payload) => {
            let report = state
                .command_handler
                .handle_ingest_webhook(IngestWebhookCommand { payload })
                .await;
            debug!(report = ?report, "webhook acknowledged");
        }
        Err(err) => warn!(error = %err, "webhook payload has unexpected shape, ignored"),
    }

    (StatusCode::OK, "OK").into_response()
}
