use anyhow::Result;
use async_trait::async_trait;

use crate::domain::model::PushEvent;
use crate::domain::repository::PushPublisher;

/// 离线工具使用的空推送实现，直接丢弃事件
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPushPublisher;

#[async_trait]
impl PushPublisher for NullPushPublisher {
    async fn publish(&self, _event: PushEvent) -> Result<()> {
        Ok(())
    }
}
