use std::sync::Arc;
use std::time::Instant;

use crate::application::handlers::{MessageCommandHandler, MessageQueryHandler};
use crate::config::MessageServiceSettings;
use crate::infrastructure::push::BroadcastHub;

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    pub command_handler: Arc<MessageCommandHandler>,
    pub query_handler: Arc<MessageQueryHandler>,
    pub hub: Arc<BroadcastHub>,
    pub settings: Arc<MessageServiceSettings>,
    pub started_at: Instant,
}
