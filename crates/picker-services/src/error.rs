//! 服务层错误类型定义

use thiserror::Error;

/// 服务调用错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// 服务端点不可达
    #[error("Service '{service}' is unavailable")]
    Unavailable { service: String },

    /// 调用已发出但传输失败
    #[error("Service call '{service}' failed: {reason}")]
    CallFailed { service: String, reason: String },

    /// 未知运动组
    #[error("Unknown motion group '{0}'")]
    UnknownGroup(String),
}

impl ServiceError {
    pub fn unavailable(service: impl Into<String>) -> Self {
        Self::Unavailable {
            service: service.into(),
        }
    }

    pub fn call_failed(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CallFailed {
            service: service.into(),
            reason: reason.into(),
        }
    }
}
