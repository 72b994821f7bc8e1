//! 协议层错误类型定义

use thiserror::Error;

/// 协议层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// 轨迹不包含任何航点
    #[error("Trajectory is empty")]
    EmptyTrajectory,

    /// 四元数范数为零或非有限值，无法归一化
    #[error("Degenerate quaternion: ({x}, {y}, {z}, {w})")]
    DegenerateQuaternion { x: f64, y: f64, z: f64, w: f64 },

    /// 未知的服务错误码
    #[error("Unknown error code: {0}")]
    UnknownErrorCode(i32),
}
