//! 外部服务消息
//!
//! - 运动规划服务：`MotionPlanRequest` / `MotionPlanResponse`
//! - 轨迹执行服务：请求为 `MotionPlan`，响应为 `ErrorCode`
//! - 控制器切换服务：`SwitchControllerRequest`，响应 `ok: bool`
//! - 执行器（吸盘）控制服务：请求 `enable: bool`，响应 `success: bool`

use crate::error::ProtocolError;
use crate::geometry::PoseStamped;
use crate::trajectory::{JointTrajectory, RobotState};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 默认规划器标识（固定，不做规划器选择）
pub const DEFAULT_PLANNER_ID: &str = "RRTConnectkConfigDefault";

/// 规划/执行服务错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum ErrorCode {
    Success = 1,
    Failure = 99999,
    PlanningFailed = -1,
    InvalidMotionPlan = -2,
    MotionPlanInvalidatedByEnvironmentChange = -3,
    ControlFailed = -4,
    UnableToAcquireSensorData = -5,
    TimedOut = -6,
    /// 执行被 stop 中断
    Preempted = -7,
    StartStateInCollision = -10,
    GoalInCollision = -12,
    InvalidGroupName = -15,
    InvalidGoalConstraints = -16,
    NoIkSolution = -31,
}

impl ErrorCode {
    /// 从原始错误码解析
    pub fn from_raw(code: i32) -> Result<Self, ProtocolError> {
        Self::try_from(code).map_err(|_| ProtocolError::UnknownErrorCode(code))
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// 位置约束：目标点 ± 各轴容差（米）
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PositionConstraint {
    pub link_name: String,
    pub target: PoseStamped,
    /// x/y/z 容差
    pub tolerance: [f64; 3],
}

/// 朝向约束：目标朝向 ± 各轴角度容差（弧度）
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrientationConstraint {
    pub link_name: String,
    pub target: PoseStamped,
    /// roll/pitch/yaw 容差
    pub tolerance: [f64; 3],
}

/// 目标约束集合
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GoalConstraints {
    pub position: PositionConstraint,
    pub orientation: OrientationConstraint,
}

impl GoalConstraints {
    /// 从末端位姿构造约束
    pub fn from_pose(
        link_name: impl Into<String>,
        target: &PoseStamped,
        position_tolerance: [f64; 3],
        orientation_tolerance: [f64; 3],
    ) -> Self {
        let link_name = link_name.into();
        Self {
            position: PositionConstraint {
                link_name: link_name.clone(),
                target: target.clone(),
                tolerance: position_tolerance,
            },
            orientation: OrientationConstraint {
                link_name,
                target: target.clone(),
                tolerance: orientation_tolerance,
            },
        }
    }

    /// 偏航（绕 Z）容差
    pub fn yaw_tolerance(&self) -> f64 {
        self.orientation.tolerance[2]
    }
}

/// 运动规划请求
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionPlanRequest {
    pub group_name: String,
    pub start_state: RobotState,
    pub goal_constraints: Vec<GoalConstraints>,
    /// 允许的规划时间（秒）
    pub allowed_planning_time: f64,
    /// 最大规划尝试次数
    pub num_planning_attempts: u32,
    pub planner_id: String,
}

/// 运动规划响应
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionPlanResponse {
    pub trajectory: JointTrajectory,
    /// 起始状态回显
    pub trajectory_start: RobotState,
    /// 规划耗时（秒）
    pub planning_time: f64,
    pub error_code: ErrorCode,
}

/// 控制器切换严格度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Strictness {
    /// 尽力而为：部分控制器切换失败不影响其余控制器
    #[default]
    BestEffort,
    /// 严格：任一失败则整体失败
    Strict,
}

/// 控制器切换请求
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SwitchControllerRequest {
    pub start_controllers: Vec<String>,
    pub stop_controllers: Vec<String>,
    pub strictness: Strictness,
}

impl SwitchControllerRequest {
    /// 激活单个控制器（尽力而为）
    pub fn activate(controller: impl Into<String>) -> Self {
        Self {
            start_controllers: vec![controller.into()],
            stop_controllers: Vec::new(),
            strictness: Strictness::BestEffort,
        }
    }

    /// 停用单个控制器（尽力而为）
    pub fn deactivate(controller: impl Into<String>) -> Self {
        Self {
            start_controllers: Vec::new(),
            stop_controllers: vec![controller.into()],
            strictness: Strictness::BestEffort,
        }
    }
}
