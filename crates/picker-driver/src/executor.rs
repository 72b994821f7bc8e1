//! 轨迹执行器与控制器切换
//!
//! 执行前尽力激活该组控制器，执行后无条件停用，控制器不会被遗留在激活状态。
//! 执行失败只记录日志，由调用方决定是否继续（编排器视为非致命）。

use picker_protocol::{ControlGroupInfo, ErrorCode, MotionPlan, SwitchControllerRequest};
use picker_services::{
    ControllerSwitchService, MotionGroupInterface, MoveMode, TrajectoryExecutionService,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 轨迹执行器
pub struct TrajectoryExecutor {
    execution: Arc<dyn TrajectoryExecutionService>,
    controllers: Arc<dyn ControllerSwitchService>,
    groups: Arc<dyn MotionGroupInterface>,
}

impl TrajectoryExecutor {
    pub fn new(
        execution: Arc<dyn TrajectoryExecutionService>,
        controllers: Arc<dyn ControllerSwitchService>,
        groups: Arc<dyn MotionGroupInterface>,
    ) -> Self {
        Self {
            execution,
            controllers,
            groups,
        }
    }

    /// 在 `group` 上执行 `plan`，阻塞直到完成或被 stop
    ///
    /// 返回执行是否成功。无论结果如何，返回前控制器已停用。
    pub fn execute(&self, group: &ControlGroupInfo, plan: &MotionPlan) -> bool {
        if !self.activate_controller(&group.controller_name) {
            warn!(
                "Controller '{}' activation failed, executing anyway",
                group.controller_name
            );
        }

        let result = self.execution.execute(&group.group_name, plan);
        self.deactivate_controller(&group.controller_name);

        match result {
            Ok(code) if code.is_success() => {
                debug!("Trajectory on '{}' completed", group.group_name);
                true
            },
            Ok(ErrorCode::Preempted) => {
                info!("Trajectory on '{}' was stopped", group.group_name);
                false
            },
            Ok(code) => {
                warn!("Trajectory on '{}' finished with {:?}", group.group_name, code);
                false
            },
            Err(e) => {
                error!("Trajectory execution on '{}' failed: {}", group.group_name, e);
                false
            },
        }
    }

    /// 激活控制器（尽力而为，幂等）
    pub fn activate_controller(&self, controller: &str) -> bool {
        self.switch(&SwitchControllerRequest::activate(controller), controller, true)
    }

    /// 停用控制器（尽力而为，幂等）
    pub fn deactivate_controller(&self, controller: &str) -> bool {
        self.switch(&SwitchControllerRequest::deactivate(controller), controller, false)
    }

    fn switch(&self, request: &SwitchControllerRequest, controller: &str, activate: bool) -> bool {
        let action = if activate { "activate" } else { "deactivate" };
        match self.controllers.switch_controllers(request) {
            Ok(true) => {
                debug!("Controller '{}' {}d", controller, action);
                true
            },
            Ok(false) => {
                warn!("Failed to {} controller '{}'", action, controller);
                false
            },
            Err(e) => {
                warn!("Failed to {} controller '{}': {}", action, controller, e);
                false
            },
        }
    }

    /// 立即停止运动组当前运动
    pub fn stop(&self, group: &ControlGroupInfo) {
        self.groups.stop(&group.group_name);
    }

    /// 回到等待位姿
    ///
    /// 停用精运动组控制器、激活粗运动组控制器，再将粗运动组移动到其命名等待位姿。
    pub fn move_to_wait_pose(
        &self,
        rail: &ControlGroupInfo,
        arm: &ControlGroupInfo,
        mode: MoveMode,
    ) -> bool {
        self.deactivate_controller(&arm.controller_name);
        self.activate_controller(&rail.controller_name);

        match self.groups.move_to_named(&rail.group_name, &rail.wait_pose_name, mode) {
            Ok(code) if code.is_success() => {
                info!(
                    "Group '{}' moving to '{}' ({:?})",
                    rail.group_name, rail.wait_pose_name, mode
                );
                true
            },
            Ok(code) => {
                error!(
                    "Move of '{}' to '{}' failed with {:?}",
                    rail.group_name, rail.wait_pose_name, code
                );
                false
            },
            Err(e) => {
                error!(
                    "Move of '{}' to '{}' failed: {}",
                    rail.group_name, rail.wait_pose_name, e
                );
                false
            },
        }
    }
}
