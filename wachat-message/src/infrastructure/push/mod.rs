pub mod broadcast_hub;
pub mod null_publisher;

pub use broadcast_hub::BroadcastHub;
pub use null_publisher::NullPushPublisher;
