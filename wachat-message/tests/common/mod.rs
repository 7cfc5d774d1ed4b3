// 集成测试公共工具：在随机端口上启动完整路由，仓储使用内存实现

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::net::TcpListener;
use wachat_message::config::MessageServiceSettings;
use wachat_message::infrastructure::persistence::InMemoryMessageStore;
use wachat_message::infrastructure::push::BroadcastHub;
use wachat_message::service::wire::build_context;

pub struct TestApp {
    pub address: String,
    pub ws_url: String,
    pub client: reqwest::Client,
    pub hub: Arc<BroadcastHub>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn send(&self, wa_id: &str, text: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/messages/send"))
            .json(&json!({ "wa_id": wa_id, "text": text }))
            .send()
            .await
            .expect("send request failed")
    }

    pub async fn post_webhook(&self, payload: &Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/webhook"))
            .json(payload)
            .send()
            .await
            .expect("webhook request failed")
    }

    pub async fn get_json(&self, path: &str) -> Value {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
            .json()
            .await
            .expect("response is not JSON")
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(MessageServiceSettings::default()).await
}

pub async fn spawn_app_with(settings: MessageServiceSettings) -> TestApp {
    let context = build_context(settings, Arc::new(InMemoryMessageStore::new()));
    let app = context.router();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://{addr}"),
        ws_url: format!("ws://{addr}/ws"),
        client: reqwest::Client::new(),
        hub: Arc::clone(&context.hub),
    }
}

/// 构造一条入站文本消息回调
pub fn text_payload(message_id: &str, from: &str, name: &str, body: &str, timestamp: &str) -> Value {
    json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "30164062719905277",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "metadata": {
                        "display_phone_number": "15550783881",
                        "phone_number_id": "629305560276479"
                    },
                    "contacts": [{ "profile": { "name": name }, "wa_id": from }],
                    "messages": [{
                        "from": from,
                        "id": message_id,
                        "timestamp": timestamp,
                        "text": { "body": body },
                        "type": "text"
                    }]
                }
            }]
        }]
    })
}

/// 构造一条状态回执回调
pub fn status_payload(id: &str, meta_msg_id: Option<&str>, status: &str, recipient: &str) -> Value {
    let mut notification = json!({
        "id": id,
        "status": status,
        "timestamp": "1754400020",
        "recipient_id": recipient
    });
    if let Some(meta) = meta_msg_id {
        notification["meta_msg_id"] = json!(meta);
    }
    json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "30164062719905277",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "metadata": {
                        "display_phone_number": "15550783881",
                        "phone_number_id": "629305560276479"
                    },
                    "statuses": [notification]
                }
            }]
        }]
    })
}
