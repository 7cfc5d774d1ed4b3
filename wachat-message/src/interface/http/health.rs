use axum::Json;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::IntoResponse;
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};

use super::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let mongodb = if state.query_handler.storage_healthy().await {
        "Connected"
    } else {
        "Disconnected"
    };

    Json(json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "uptime": state.started_at.elapsed().as_secs_f64(),
        "mongodb": mongodb,
        "environment": state.settings.environment,
        "connectedClients": state.query_handler.subscriber_count(),
    }))
}

/// 开发环境下的接口说明
pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "WhatsApp Web Clone API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "webhook": "/api/webhook",
            "conversations": "/api/messages/conversations",
            "messages": "/api/messages/messages/:wa_id",
            "send": "/api/messages/send",
            "status": "/api/messages/status/:message_id",
            "stats": "/api/messages/stats/:wa_id",
            "push": "/ws",
        }
    }))
}

pub async fn api_not_found(method: Method, uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Route not found",
            "message": format!("Cannot {} {}", method, uri.path()),
        })),
    )
}
