// 生产模式静态资源托管、跨域与请求体上限测试

use reqwest::StatusCode;
use serde_json::{Value, json};
use tempfile::TempDir;
use wachat_message::config::MessageServiceSettings;

mod common;
use common::{TestApp, spawn_app_with, text_payload};

fn frontend_build() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>spa</html>").unwrap();
    std::fs::create_dir(dir.path().join("assets")).unwrap();
    std::fs::write(dir.path().join("assets").join("app.js"), "console.log('app');").unwrap();
    dir
}

async fn spawn_production(dir: &TempDir) -> TestApp {
    spawn_app_with(MessageServiceSettings {
        environment: "production".into(),
        frontend_dir: Some(dir.path().to_path_buf()),
        ..MessageServiceSettings::default()
    })
    .await
}

#[tokio::test]
async fn client_routes_fall_back_to_index_html() {
    let dir = frontend_build();
    let app = spawn_production(&dir).await;

    let response = app.client.get(app.url("/chat/123")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "<html>spa</html>");

    let response = app.client.get(app.url("/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "<html>spa</html>");

    let response = app.client.get(app.url("/assets/app.js")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "console.log('app');");
}

#[tokio::test]
async fn api_routes_win_over_static_files() {
    let dir = frontend_build();
    let app = spawn_production(&dir).await;

    let health = app.get_json("/health").await;
    assert_eq!(health["environment"], "production");

    let response = app.client.get(app.url("/api/nope")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Route not found");
}

#[tokio::test]
async fn production_cors_mirrors_request_origin() {
    let dir = frontend_build();
    let app = spawn_production(&dir).await;

    let response = app
        .client
        .get(app.url("/health"))
        .header("origin", "https://chat.anything.example")
        .send()
        .await
        .unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "https://chat.anything.example"
    );
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-credentials")
            .unwrap(),
        "true"
    );
}

#[tokio::test]
async fn oversized_bodies_are_rejected_with_413() {
    let app = spawn_app_with(MessageServiceSettings {
        body_limit_bytes: 1024,
        ..MessageServiceSettings::default()
    })
    .await;

    let response = app
        .client
        .post(app.url("/api/messages/send"))
        .json(&json!({ "wa_id": "555", "text": "x".repeat(4096) }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());

    let payload = text_payload("wamid.big", "555", "Big", &"y".repeat(4096), "1754400000");
    let response = app.post_webhook(&payload).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let conversations = app.get_json("/api/messages/conversations").await;
    assert_eq!(conversations.as_array().unwrap().len(), 0);

    // 上限以内照常处理
    let response = app.send("555", "small").await;
    assert_eq!(response.status(), StatusCode::CREATED);
}
