//! WaChat 消息服务
//!
//! WhatsApp Cloud API 回调接入、会话与消息查询、消息发送与状态更新，
//! 以及基于 WebSocket 的实时推送。

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;
pub mod service;
