//! 会话与消息接口 `/api/messages/*`

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use super::error::ApiError;
use super::state::AppState;
use crate::application::commands::{SendMessageCommand, UpdateStatusCommand};
use crate::application::queries::{
    ConversationStatsQuery, ListConversationsQuery, ListMessagesQuery,
};
use crate::domain::model::{
    ConversationStats, ConversationSummary, Message, MessagePage, MessageStatus,
};

pub const INVALID_STATUS: &str = "Invalid status. Must be: sent, delivered, read, or failed";

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SendMessageRequest {
    pub wa_id: Option<String>,
    pub text: Option<String>,
    pub profile_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

/// 宽松解析分页参数：非数字视为缺省，负数按 0 处理（随后被领域层钳制）
fn parse_page_value(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .map(|value| value.max(0) as u64)
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(ApiError::from_json_rejection)
}

pub async fn list_conversations(
    State(state): State<AppState>,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    state
        .query_handler
        .handle_list_conversations(ListConversationsQuery)
        .await
        .map(Json)
        .map_err(|err| ApiError::from_domain(err, "Failed to fetch conversations"))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Path(wa_id): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<MessagePage>, ApiError> {
    let query = ListMessagesQuery {
        wa_id,
        page: parse_page_value(params.page.as_deref()),
        limit: parse_page_value(params.limit.as_deref()),
    };
    state
        .query_handler
        .handle_list_messages(query)
        .await
        .map(Json)
        .map_err(|err| ApiError::from_domain(err, "Failed to fetch messages"))
}

pub async fn send_message(
    State(state): State<AppState>,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let request = json_body(body)?;
    let command = SendMessageCommand {
        wa_id: request.wa_id.unwrap_or_default(),
        text: request.text.unwrap_or_default(),
        profile_name: request.profile_name,
    };
    let message = state
        .command_handler
        .handle_send_message(command)
        .await
        .map_err(|err| ApiError::from_domain(err, "Failed to send message"))?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<Message>, ApiError> {
    let request = json_body(body)?;
    let status = request
        .status
        .as_deref()
        .and_then(|raw| raw.parse::<MessageStatus>().ok())
        .ok_or_else(|| ApiError::bad_request(INVALID_STATUS))?;

    state
        .command_handler
        .handle_update_status(UpdateStatusCommand { message_id, status })
        .await
        .map(Json)
        .map_err(|err| ApiError::from_domain(err, "Failed to update message status"))
}

pub async fn conversation_stats(
    State(state): State<AppState>,
    Path(wa_id): Path<String>,
) -> Result<Json<ConversationStats>, ApiError> {
    state
        .query_handler
        .handle_conversation_stats(ConversationStatsQuery { wa_id })
        .await
        .map(Json)
        .map_err(|err| ApiError::from_domain(err, "Failed to fetch conversation stats"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_values_are_lenient() {
        assert_eq!(parse_page_value(None), None);
        assert_eq!(parse_page_value(Some("3")), Some(3));
        assert_eq!(parse_page_value(Some(" 20 ")), Some(20));
        assert_eq!(parse_page_value(Some("-4")), Some(0));
        assert_eq!(parse_page_value(Some("abc")), None);
    }
}
