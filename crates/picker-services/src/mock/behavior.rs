//! 模拟世界的行为脚本与调用记录

use crate::service::MoveMode;
use picker_protocol::ErrorCode;
use std::time::Duration;

/// 单次规划调用的行为
#[derive(Debug, Clone, PartialEq)]
pub enum PlanBehavior {
    /// 使用运动组默认时长成功
    Succeed,
    /// 以指定轨迹时长成功
    SucceedIn(Duration),
    /// 返回非成功错误码
    Fail(ErrorCode),
    /// 服务不可达
    Unreachable,
    /// 返回成功码但轨迹为空
    EmptyTrajectory,
    /// 规划期间物体脱落，耗时 `latency` 后以默认时长成功
    DetachDuring(Duration),
}

/// 单次轨迹执行的行为
#[derive(Debug, Clone, PartialEq)]
pub enum ExecBehavior {
    /// 正常执行到结束（可被 stop 中断）
    Succeed,
    /// 执行完整时长后报告错误码
    Fail(ErrorCode),
    /// 服务不可达
    Unreachable,
}

/// 真空吸盘模型
///
/// 仅在接触运动组（默认机械臂）执行轨迹且吸盘已开启时产生接触。
#[derive(Debug, Clone, PartialEq)]
pub enum GripperBehavior {
    /// 轨迹开始 `after` 后（不晚于轨迹结束）吸附
    AttachOnContact { after: Duration },
    /// 从不吸附
    Never,
    /// 先按 `attach_after` 吸附，随后在下一次接触组执行开始 `drop_after` 后脱落
    DropDuringTransfer {
        attach_after: Duration,
        drop_after: Duration,
    },
    /// 先按 `attach_after` 吸附，随后在下一次非接触组（导轨）执行开始 `drop_after` 后脱落
    DropDuringPlace {
        attach_after: Duration,
        drop_after: Duration,
    },
}

impl Default for GripperBehavior {
    fn default() -> Self {
        Self::AttachOnContact {
            after: Duration::from_millis(150),
        }
    }
}

/// 服务调用记录（按发生顺序）
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCall {
    Plan {
        group: String,
        yaw_tolerance: f64,
        planner_id: String,
        attempts: u32,
        allowed_planning_time: f64,
    },
    Execute {
        group: String,
        first_waypoint: Duration,
        duration: Duration,
    },
    ExecuteFinished {
        group: String,
        code: ErrorCode,
    },
    Stop {
        group: String,
    },
    MoveNamed {
        group: String,
        pose: String,
        mode: MoveMode,
    },
    Actuator {
        enable: bool,
    },
    Switch {
        start: Vec<String>,
        stop: Vec<String>,
    },
}

impl ServiceCall {
    /// 调用涉及的运动组（若有）
    pub fn group(&self) -> Option<&str> {
        match self {
            Self::Plan { group, .. }
            | Self::Execute { group, .. }
            | Self::ExecuteFinished { group, .. }
            | Self::Stop { group }
            | Self::MoveNamed { group, .. } => Some(group),
            Self::Actuator { .. } | Self::Switch { .. } => None,
        }
    }
}
