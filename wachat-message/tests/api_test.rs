// 会话与消息 REST 接口测试

use reqwest::StatusCode;
use serde_json::{Value, json};

mod common;
use common::spawn_app;

#[tokio::test]
async fn health_reports_store_and_clients() {
    let app = spawn_app().await;

    let body = app.get_json("/health").await;
    assert_eq!(body["status"], "OK");
    assert_eq!(body["mongodb"], "Connected");
    assert_eq!(body["environment"], "development");
    assert_eq!(body["connectedClients"], 0);
    assert!(body["uptime"].as_f64().unwrap() >= 0.0);
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn development_root_lists_endpoints() {
    let app = spawn_app().await;
    let body = app.get_json("/").await;
    assert_eq!(body["endpoints"]["webhook"], "/api/webhook");
}

#[tokio::test]
async fn send_message_creates_business_message() {
    let app = spawn_app().await;

    let response = app.send("919937320320", "  Hello there  ").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let message: Value = response.json().await.unwrap();

    assert!(message["id"].as_str().unwrap().starts_with("msg_"));
    assert_eq!(message["wa_id"], "919937320320");
    assert_eq!(message["from"], "business_number");
    assert_eq!(message["to"], "919937320320");
    assert_eq!(message["type"], "text");
    assert_eq!(message["text"]["body"], "Hello there");
    assert_eq!(message["status"], "sent");
    assert_eq!(message["profile_name"], "919937320320");
}

#[tokio::test]
async fn send_message_requires_wa_id_and_text() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/messages/send"))
        .json(&json!({ "wa_id": "919937320320", "text": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "wa_id and text are required");

    let response = app
        .client
        .post(app.url("/api/messages/send"))
        .json(&json!({ "text": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .client
        .post(app.url("/api/messages/send"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn conversations_and_stats_follow_sent_messages() {
    let app = spawn_app().await;
    app.send("111", "first").await;
    app.send("111", "second").await;
    app.send("222", "other").await;

    let conversations = app.get_json("/api/messages/conversations").await;
    let conversations = conversations.as_array().unwrap();
    assert_eq!(conversations.len(), 2);

    let first = conversations.iter().find(|c| c["_id"] == "111").unwrap();
    assert_eq!(first["messageCount"], 2);
    assert_eq!(first["unreadCount"], 2);
    assert_eq!(first["profile_name"], "111");

    let stats = app.get_json("/api/messages/stats/111").await;
    assert_eq!(stats["totalMessages"], 2);
    assert_eq!(stats["sentByBusiness"], 2);
    assert_eq!(stats["sentByUser"], 0);
    assert_eq!(stats["unreadMessages"], 2);

    let empty = app.get_json("/api/messages/stats/nobody").await;
    assert_eq!(empty["totalMessages"], 0);
    assert!(empty["firstMessage"].is_null());
}

#[tokio::test]
async fn messages_are_paged_from_the_newest() {
    let app = spawn_app().await;
    for text in ["m1", "m2", "m3", "m4", "m5"] {
        app.send("333", text).await;
    }

    let page = app
        .get_json("/api/messages/messages/333?page=1&limit=2")
        .await;
    let texts: Vec<&str> = page["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["text"]["body"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["m4", "m5"]);
    assert_eq!(page["pagination"]["totalMessages"], 5);
    assert_eq!(page["pagination"]["totalPages"], 3);
    assert_eq!(page["pagination"]["hasMore"], true);

    let last = app
        .get_json("/api/messages/messages/333?page=3&limit=2")
        .await;
    assert_eq!(last["messages"].as_array().unwrap().len(), 1);
    assert_eq!(last["pagination"]["hasMore"], false);

    // 非法参数按缺省/钳制处理
    let defaults = app
        .get_json("/api/messages/messages/333?page=abc&limit=0")
        .await;
    assert_eq!(defaults["pagination"]["page"], 1);
    assert_eq!(defaults["pagination"]["limit"], 1);
}

#[tokio::test]
async fn status_update_validates_and_applies() {
    let app = spawn_app().await;
    let message: Value = app.send("444", "ping").await.json().await.unwrap();
    let id = message["id"].as_str().unwrap();

    let response = app
        .client
        .patch(app.url(&format!("/api/messages/status/{id}")))
        .json(&json!({ "status": "seen" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["error"],
        "Invalid status. Must be: sent, delivered, read, or failed"
    );

    let response = app
        .client
        .patch(app.url("/api/messages/status/does-not-exist"))
        .json(&json!({ "status": "read" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Message not found");

    let response = app
        .client
        .patch(app.url(&format!("/api/messages/status/{id}")))
        .json(&json!({ "status": "read" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["status"], "read");

    let stats = app.get_json("/api/messages/stats/444").await;
    assert_eq!(stats["unreadMessages"], 0);
}

#[tokio::test]
async fn unknown_api_route_returns_json_404() {
    let app = spawn_app().await;
    let response = app
        .client
        .delete(app.url("/api/unknown/thing"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Route not found");
    assert_eq!(body["message"], "Cannot DELETE /api/unknown/thing");
}

#[tokio::test]
async fn cors_allows_configured_development_origin() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/health"))
        .header("origin", "http://localhost:3000")
        .send()
        .await
        .unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "http://localhost:3000"
    );
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-credentials")
            .unwrap(),
        "true"
    );

    let response = app
        .client
        .get(app.url("/health"))
        .header("origin", "http://evil.example")
        .send()
        .await
        .unwrap();
    assert!(response.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn wrong_method_on_known_route_returns_json_404() {
    let app = spawn_app().await;

    let response = app.client.get(app.url("/api/messages/send")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Route not found");
    assert_eq!(body["message"], "Cannot GET /api/messages/send");

    let response = app.client.delete(app.url("/api/webhook")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Cannot DELETE /api/webhook");
}
