use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{debug, error};
use wachat_core::error::WaChatError;

/// HTTP 层错误，响应体为 `{"error": ..., "details"?: ...}`
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    PayloadTooLarge(String),
    Internal { error: String, details: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// 请求体解析失败：超过大小上限为 413，其余为 400
    pub fn from_json_rejection(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(rejection.body_text())
        } else {
            Self::BadRequest(rejection.body_text())
        }
    }

    /// 将领域错误映射为 HTTP 错误，`operation` 作为 500 响应的 error 字段
    pub fn from_domain(err: WaChatError, operation: &str) -> Self {
        if err.is_client_error() {
            debug!(operation, error = %err, "request rejected");
        }
        match err {
            WaChatError::Validation(message) => Self::BadRequest(message),
            WaChatError::NotFound(message) => Self::NotFound(message),
            WaChatError::Storage { source, .. } => Self::Internal {
                error: operation.to_string(),
                details: format!("{source:#}"),
            },
            other => Self::Internal {
                error: operation.to_string(),
                details: other.to_string(),
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            ApiError::BadRequest(message)
            | ApiError::NotFound(message)
            | ApiError::PayloadTooLarge(message) => {
                json!({ "error": message })
            }
            ApiError::Internal { error, details } => {
                error!(error = %error, details = %details, "request failed");
                json!({ "error": error, "details": details })
            }
        };
        (status, Json(body)).into_response()
    }
}
