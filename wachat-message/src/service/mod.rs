//! # 消息服务层
//!
//! 提供应用启动和依赖注入

pub mod bootstrap;
pub mod wire;

pub use bootstrap::ApplicationBootstrap;
pub use wire::{ApplicationContext, ToolContext};
