//! WaChat Core 错误工具模块
//!
//! - 统一定义业务层错误类型 `WaChatError`
//! - 为基础设施层提供便捷的错误转换工具

use thiserror::Error;

/// 业务层结果类型
pub type Result<T> = std::result::Result<T, WaChatError>;

/// 基础设施层结果类型（仓储、推送等实现统一返回 anyhow）
pub type InfraResult<T> = anyhow::Result<T>;

/// 业务错误类型
#[derive(Debug, Error)]
pub enum WaChatError {
    /// 参数校验失败
    #[error("{0}")]
    Validation(String),

    /// 资源不存在
    #[error("{0}")]
    NotFound(String),

    /// 存储层错误
    #[error("{context}: {source:#}")]
    Storage {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    /// 推送层错误
    #[error("Push error: {0}")]
    Push(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),
}

impl WaChatError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// 是否为调用方可修正的错误
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }
}

/// 将基础设施错误映射为存储错误
pub fn map_infra_error(err: anyhow::Error, context: impl Into<String>) -> WaChatError {
    WaChatError::Storage {
        context: context.into(),
        source: err,
    }
}

/// `InfraResult` 扩展：附带上下文转换为业务层 `Result`
pub trait InfraResultExt<T> {
    fn into_storage(self, context: &str) -> Result<T>;
}

impl<T> InfraResultExt<T> for InfraResult<T> {
    fn into_storage(self, context: &str) -> Result<T> {
        self.map_err(|err| map_infra_error(err, context))
    }
}

/// 便捷宏：将基础设施错误映射为存储错误并提前返回
#[macro_export]
macro_rules! bail_infra {
    ($err:expr, $msg:expr) => {
        return Err($crate::error::map_infra_error($err, $msg))
    };
}

/// 便捷宏：从返回 `InfraResult` 的表达式中直接转换为业务层 `Result`
#[macro_export]
macro_rules! try_infra {
    ($expr:expr, $msg:expr) => {
        $crate::error::InfraResultExt::into_storage($expr, $msg)?
    };
}
