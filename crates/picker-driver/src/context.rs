//! 任务上下文
//!
//! 单个任务所需的全部组件。启动时构造一次，之后只读。

use crate::actuator::ActuatorController;
use crate::config::OrchestratorConfig;
use crate::executor::TrajectoryExecutor;
use crate::planner::MotionPlanClient;
use picker_protocol::GraspRotations;
use picker_services::{AttachmentFeedback, MotionGroupInterface, Services};
use std::sync::Arc;

/// 任务上下文
pub struct TaskContext {
    pub(crate) config: OrchestratorConfig,
    pub(crate) planner: MotionPlanClient,
    pub(crate) executor: TrajectoryExecutor,
    pub(crate) actuator: ActuatorController,
    pub(crate) groups: Arc<dyn MotionGroupInterface>,
    pub(crate) feedback: AttachmentFeedback,
    pub(crate) rotations: GraspRotations,
}

impl TaskContext {
    pub fn new(services: &Services, feedback: AttachmentFeedback, config: OrchestratorConfig) -> Self {
        Self {
            planner: MotionPlanClient::new(
                services.planning.clone(),
                services.groups.clone(),
                config.planning.clone(),
            ),
            executor: TrajectoryExecutor::new(
                services.execution.clone(),
                services.controllers.clone(),
                services.groups.clone(),
            ),
            actuator: ActuatorController::new(services.actuator.clone()),
            groups: services.groups.clone(),
            feedback,
            rotations: GraspRotations::from_pick_angle(config.preferred_pick_angle),
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }
}
