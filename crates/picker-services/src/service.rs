//! 服务接口 Trait 定义
//!
//! 所有接口都是同步阻塞调用，且要求 `Send + Sync`：编排线程与接触监视线程
//! 会并发使用同一服务句柄（例如监视线程在轨迹执行期间调用 `stop`）。

use crate::error::ServiceError;
use picker_protocol::{
    ErrorCode, MotionPlan, MotionPlanRequest, MotionPlanResponse, RobotState,
    SwitchControllerRequest,
};
use std::sync::Arc;
use std::time::Duration;

/// 服务端点（可探测是否就绪）
pub trait ServiceEndpoint: Send + Sync {
    /// 端点名称（用于日志）
    fn endpoint_name(&self) -> &str;

    /// 等待端点就绪，最长 `timeout`
    ///
    /// 返回 `false` 表示超时仍不可达。默认实现认为端点始终可用。
    fn wait_until_ready(&self, timeout: Duration) -> bool {
        let _ = timeout;
        true
    }
}

/// 运动规划服务
pub trait MotionPlanningService: ServiceEndpoint {
    /// 请求一次规划
    ///
    /// `Err` 表示服务调用本身失败；规划失败通过响应中的 `error_code` 表达。
    fn plan(&self, request: &MotionPlanRequest) -> Result<MotionPlanResponse, ServiceError>;
}

/// 轨迹执行服务
pub trait TrajectoryExecutionService: Send + Sync {
    /// 在 `group` 上执行 `plan`，阻塞直到运动完成或被 stop
    fn execute(&self, group: &str, plan: &MotionPlan) -> Result<ErrorCode, ServiceError>;
}

/// 末端执行器（吸盘）控制服务
pub trait ActuatorService: ServiceEndpoint {
    /// 开关执行器，返回服务端报告的 `success`
    fn set_enabled(&self, enable: bool) -> Result<bool, ServiceError>;
}

/// 控制器切换服务
pub trait ControllerSwitchService: ServiceEndpoint {
    /// 切换控制器，返回服务端报告的 `ok`
    fn switch_controllers(&self, request: &SwitchControllerRequest) -> Result<bool, ServiceError>;
}

/// 命名位姿移动方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveMode {
    /// 阻塞直到运动完成
    Blocking,
    /// 发出运动后立即返回
    Async,
}

/// 运动组接口
pub trait MotionGroupInterface: Send + Sync {
    /// 机器人模型中已知的运动组
    fn group_names(&self) -> Vec<String>;

    /// 运动组末端连杆；未知运动组返回 `None`
    fn end_effector_link(&self, group: &str) -> Option<String>;

    /// 当前状态快照
    fn current_state(&self, group: &str) -> Result<RobotState, ServiceError>;

    /// 立即停止该运动组上正在执行的运动（无运动时为空操作）
    fn stop(&self, group: &str);

    /// 移动到命名位姿
    fn move_to_named(
        &self,
        group: &str,
        pose_name: &str,
        mode: MoveMode,
    ) -> Result<ErrorCode, ServiceError>;
}

/// 编排器使用的全部服务句柄
///
/// `Clone` 是轻量的（仅克隆 `Arc` 指针）。
#[derive(Clone)]
pub struct Services {
    pub planning: Arc<dyn MotionPlanningService>,
    pub execution: Arc<dyn TrajectoryExecutionService>,
    pub actuator: Arc<dyn ActuatorService>,
    pub controllers: Arc<dyn ControllerSwitchService>,
    pub groups: Arc<dyn MotionGroupInterface>,
}

impl Services {
    /// 等待启动时必须就绪的端点（规划、执行器、控制器切换）
    ///
    /// 每个端点最多等待 `timeout`，任一不可达即返回 `ServiceError::Unavailable`，不重试。
    pub fn wait_until_ready(&self, timeout: Duration) -> Result<(), ServiceError> {
        if !self.planning.wait_until_ready(timeout) {
            return Err(ServiceError::unavailable(self.planning.endpoint_name()));
        }
        if !self.actuator.wait_until_ready(timeout) {
            return Err(ServiceError::unavailable(self.actuator.endpoint_name()));
        }
        if !self.controllers.wait_until_ready(timeout) {
            return Err(ServiceError::unavailable(self.controllers.endpoint_name()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("planning", &self.planning.endpoint_name())
            .field("actuator", &self.actuator.endpoint_name())
            .field("controllers", &self.controllers.endpoint_name())
            .finish_non_exhaustive()
    }
}
