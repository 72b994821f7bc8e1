//! 编排层错误类型定义

use crate::report::{FailureKind, Phase};
use picker_protocol::{ErrorCode, Timestamp};
use picker_services::ServiceError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// 规划失败
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanningError {
    /// 运动组没有末端连杆，无法构造目标约束（未调用规划服务）
    #[error("No goal constraint for group '{group}' (no end-effector link)")]
    NoGoalConstraint { group: String },

    /// 规划服务调用失败
    #[error("Planning service call failed: {0}")]
    Service(#[from] ServiceError),

    /// 规划器返回非成功错误码
    #[error("Planner returned {code:?} for group '{group}'")]
    ErrorCode { group: String, code: ErrorCode },

    /// 规划器返回空轨迹
    #[error("Planner returned an empty trajectory for group '{group}'")]
    EmptyTrajectory { group: String },
}

/// 抓取时刻无法赶上
///
/// `now + duration > pick_time`，目标被丢弃（不重新入队）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingInfeasible {
    pub pick_time: Timestamp,
    pub now: Timestamp,
    pub duration: Duration,
}

impl TimingInfeasible {
    /// 预计到达时刻晚于抓取时刻的量
    pub fn lateness(&self) -> Duration {
        self.now.saturating_add(self.duration).saturating_duration_since(self.pick_time)
    }
}

impl fmt::Display for TimingInfeasible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pick at {:.3}s unreachable: trajectory of {:.3}s would arrive {:.3}s late",
            self.pick_time.as_secs_f64(),
            self.duration.as_secs_f64(),
            self.lateness().as_secs_f64()
        )
    }
}

impl std::error::Error for TimingInfeasible {}

/// 编排器错误类型
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// 配置错误（启动时致命）
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 服务不可达（启动时致命）
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(#[from] ServiceError),

    /// 规划失败
    #[error("Planning failed in {phase} phase: {source}")]
    Planning {
        phase: Phase,
        #[source]
        source: PlanningError,
    },

    /// 抓取时刻无法赶上
    #[error(transparent)]
    TimingInfeasible(#[from] TimingInfeasible),

    /// 等待吸附超时
    #[error("Object not attached within {0:?}")]
    AttachmentTimeout(Duration),

    /// 吸附丢失
    #[error("Object detached during {0} phase")]
    AttachmentLost(Phase),

    /// 执行器（吸盘）操作失败
    #[error("Actuator {} failed", actuator_action(.engage))]
    ActuatorFailure { engage: bool },

    /// 配置文件读取失败
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// 配置文件解析失败
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// 配置序列化失败
    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

fn actuator_action(engage: &bool) -> &'static str {
    if *engage { "engage" } else { "release" }
}

impl OrchestratorError {
    /// 失败类别
    pub fn kind(&self) -> FailureKind {
        match self {
            OrchestratorError::Configuration(_)
            | OrchestratorError::Io(_)
            | OrchestratorError::ConfigParse(_)
            | OrchestratorError::ConfigSerialize(_) => FailureKind::Configuration,
            OrchestratorError::ServiceUnavailable(_) => FailureKind::ServiceUnavailable,
            OrchestratorError::Planning { .. } => FailureKind::Planning,
            OrchestratorError::TimingInfeasible(_) => FailureKind::TimingInfeasible,
            OrchestratorError::AttachmentTimeout(_) => FailureKind::AttachmentTimeout,
            OrchestratorError::AttachmentLost(_) => FailureKind::AttachmentLost,
            OrchestratorError::ActuatorFailure { .. } => FailureKind::ActuatorFailure,
        }
    }

    /// 启动期致命错误（进程应退出）
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self.kind(),
            FailureKind::Configuration | FailureKind::ServiceUnavailable
        )
    }

    /// 任务期致命错误（仅中止当前任务）
    pub fn is_task_fatal(&self) -> bool {
        !self.is_startup_fatal()
    }

    pub(crate) fn planning(phase: Phase, source: PlanningError) -> Self {
        OrchestratorError::Planning { phase, source }
    }
}
