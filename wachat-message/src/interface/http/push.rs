//! WebSocket 推送通道 `/ws`
//!
//! 每个连接订阅广播中心，所有事件全局下发；客户端的
//! join/leave 帧只维护连接的会话集合并记录日志。

use std::collections::HashSet;

use axum::extract::State;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use wachat_core::utils::random_base36;

use super::state::AppState;
use crate::domain::model::PushEvent;

/// 客户端上行帧
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientFrame {
    JoinConversation(String),
    LeaveConversation(String),
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    // 在握手完成前订阅，握手后立即产生的事件不会丢失
    let events = state.hub.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, events))
}

async fn handle_socket(socket: WebSocket, mut events: broadcast::Receiver<PushEvent>) {
    let connection_id = random_base36(12);
    let (mut sink, mut stream) = socket.split();
    let mut joined: HashSet<String> = HashSet::new();
    info!(connection_id = %connection_id, "push client connected");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let frame = match serde_json::to_string(&event) {
                        Ok(frame) => frame,
                        Err(err) => {
                            warn!(error = %err, event = event.name(), "failed to encode push event");
                            continue;
                        }
                    };
                    if sink.send(WsMessage::Text(frame)).await.is_err() {
                        break;
                    }
                    debug!(
                        connection_id = %connection_id,
                        event = event.name(),
                        wa_id = event.wa_id(),
                        joined = joined.contains(event.wa_id()),
                        "push event forwarded"
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(connection_id = %connection_id, skipped, "push client lagging, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => apply_client_frame(&connection_id, &text, &mut joined),
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(connection_id = %connection_id, error = %err, "push socket error");
                    break;
                }
            },
        }
    }

    info!(
        connection_id = %connection_id,
        joined = joined.len(),
        "push client disconnected"
    );
}

fn apply_client_frame(connection_id: &str, text: &str, joined: &mut HashSet<String>) {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(ClientFrame::JoinConversation(wa_id)) => {
            info!(connection_id, wa_id = %wa_id, "joined conversation");
            joined.insert(wa_id);
        }
        Ok(ClientFrame::LeaveConversation(wa_id)) => {
            info!(connection_id, wa_id = %wa_id, "left conversation");
            joined.remove(&wa_id);
        }
        Err(err) => debug!(connection_id, error = %err, "ignored client frame"),
    }
}
