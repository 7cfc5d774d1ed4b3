use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::trace;

use crate::domain::model::PushEvent;
use crate::domain::repository::PushPublisher;

/// 进程内广播中心，所有 WebSocket 连接共享同一个事件流
pub struct BroadcastHub {
    sender: broadcast::Sender<PushEvent>,
}

impl BroadcastHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl PushPublisher for BroadcastHub {
    async fn publish(&self, event: PushEvent) -> Result<()> {
        let name = event.name();
        // 没有订阅者时 send 返回错误，这里视为正常
        match self.sender.send(event) {
            Ok(receivers) => trace!(event = name, receivers, "push event broadcast"),
            Err(_) => trace!(event = name, "no push subscribers"),
        }
        Ok(())
    }

    fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{MessageStatus, StatusUpdateEvent};

    fn status_event(id: &str) -> PushEvent {
        PushEvent::StatusUpdate(StatusUpdateEvent {
            id: id.to_string(),
            status: MessageStatus::Delivered,
            wa_id: "123".to_string(),
            timestamp: None,
        })
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_ok() {
        let hub = BroadcastHub::new(4);
        assert_eq!(hub.subscriber_count(), 0);
        hub.publish(status_event("a")).await.unwrap();
    }

    #[tokio::test]
    async fn every_subscriber_receives_events() {
        let hub = BroadcastHub::new(4);
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);

        hub.publish(status_event("a")).await.unwrap();
        assert_eq!(first.recv().await.unwrap(), status_event("a"));
        assert_eq!(second.recv().await.unwrap(), status_event("a"));
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_missed_events() {
        let hub = BroadcastHub::new(2);
        let mut rx = hub.subscribe();
        for id in ["a", "b", "c"] {
            hub.publish(status_event(id)).await.unwrap();
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        assert_eq!(rx.recv().await.unwrap(), status_event("b"));
    }
}
