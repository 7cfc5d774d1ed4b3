//! HTTP / WebSocket 接口层

pub mod error;
pub mod health;
pub mod messages;
pub mod push;
pub mod router;
pub mod state;
pub mod webhook;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
