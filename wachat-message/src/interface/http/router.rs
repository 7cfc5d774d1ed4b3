//! 路由装配：API、Webhook、推送通道与中间件

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{any, get, patch, post};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::state::AppState;
use super::{health, messages, push, webhook};
use crate::config::MessageServiceSettings;

pub fn build_router(state: AppState) -> Router {
    let settings = state.settings.clone();

    let mut router = Router::new()
        .route("/health", get(health::health))
        .route("/ws", get(push::ws_handler))
        .route(
            "/api/webhook",
            get(webhook::verify)
                .post(webhook::receive)
                .fallback(health::api_not_found),
        )
        .route(
            "/api/messages/conversations",
            get(messages::list_conversations).fallback(health::api_not_found),
        )
        .route(
            "/api/messages/messages/:wa_id",
            get(messages::list_messages).fallback(health::api_not_found),
        )
        .route(
            "/api/messages/send",
            post(messages::send_message).fallback(health::api_not_found),
        )
        .route(
            "/api/messages/status/:message_id",
            patch(messages::update_status).fallback(health::api_not_found),
        )
        .route(
            "/api/messages/stats/:wa_id",
            get(messages::conversation_stats).fallback(health::api_not_found),
        )
        .route("/api/*rest", any(health::api_not_found));

    if settings.is_production() {
        if let Some(dir) = settings.frontend_dir.as_ref() {
            let index = ServeFile::new(dir.join("index.html"));
            router = router.fallback_service(ServeDir::new(dir).fallback(index));
        }
    } else {
        router = router.route("/", get(health::index));
    }

    router
        .layer(DefaultBodyLimit::max(settings.body_limit_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&settings))
                .into_inner(),
        )
        .with_state(state)
}

/// 开发环境使用白名单，生产环境回显请求来源
fn cors_layer(settings: &MessageServiceSettings) -> CorsLayer {
    let origins = if settings.is_production() {
        AllowOrigin::mirror_request()
    } else {
        let allowed: Vec<HeaderValue> = settings
            .cors_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(allowed)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}
