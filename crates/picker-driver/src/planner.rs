//! 运动规划客户端
//!
//! 构造目标约束、调用规划服务、校验结果并做首航点修正。
//! 返回的 [`MotionPlan`] 已可直接交给执行器。

use crate::config::PlanningConfig;
use crate::error::PlanningError;
use picker_protocol::{GoalConstraints, MotionPlan, MotionPlanRequest, PoseStamped, RobotState};
use picker_services::{MotionGroupInterface, MotionPlanningService};
use std::sync::Arc;
use tracing::{debug, warn};

/// 运动规划客户端
pub struct MotionPlanClient {
    planning: Arc<dyn MotionPlanningService>,
    groups: Arc<dyn MotionGroupInterface>,
    config: PlanningConfig,
}

impl MotionPlanClient {
    pub fn new(
        planning: Arc<dyn MotionPlanningService>,
        groups: Arc<dyn MotionGroupInterface>,
        config: PlanningConfig,
    ) -> Self {
        Self {
            planning,
            groups,
            config,
        }
    }

    /// 为 `group` 规划一条到 `target` 的轨迹
    ///
    /// # 参数
    ///
    /// - `start_state`: 起始状态
    /// - `group`: 运动组名称
    /// - `target`: 末端目标位姿
    /// - `yaw_tolerance`: 绕 Z 轴的朝向容差（rad）
    ///
    /// # 错误
    ///
    /// - `PlanningError::NoGoalConstraint`: 运动组无末端连杆（不调用规划服务）
    /// - `PlanningError::Service`: 规划服务调用失败
    /// - `PlanningError::ErrorCode`: 规划器返回非成功错误码
    /// - `PlanningError::EmptyTrajectory`: 规划器返回空轨迹
    pub fn plan(
        &self,
        start_state: &RobotState,
        group: &str,
        target: &PoseStamped,
        yaw_tolerance: f64,
    ) -> Result<MotionPlan, PlanningError> {
        let request = self.build_request(start_state, group, target, yaw_tolerance)?;
        let response = self.planning.plan(&request)?;

        if !response.error_code.is_success() {
            warn!(
                "Planning for group '{}' failed with {:?}",
                group, response.error_code
            );
            return Err(PlanningError::ErrorCode {
                group: group.to_string(),
                code: response.error_code,
            });
        }

        let mut plan = MotionPlan {
            trajectory: response.trajectory,
            start_state: response.trajectory_start,
            planning_time: response.planning_time,
        };
        plan.trajectory
            .curate(self.config.first_waypoint_epsilon())
            .map_err(|_| PlanningError::EmptyTrajectory {
                group: group.to_string(),
            })?;

        debug!(
            "Planned {} waypoints for group '{}' in {:.3}s, duration {:.3}s",
            plan.trajectory.points.len(),
            group,
            plan.planning_time,
            plan.duration().as_secs_f64()
        );
        Ok(plan)
    }

    /// 构造规划请求
    fn build_request(
        &self,
        start_state: &RobotState,
        group: &str,
        target: &PoseStamped,
        yaw_tolerance: f64,
    ) -> Result<MotionPlanRequest, PlanningError> {
        let link = self.groups.end_effector_link(group).ok_or_else(|| {
            warn!("Group '{}' has no end-effector link", group);
            PlanningError::NoGoalConstraint {
                group: group.to_string(),
            }
        })?;

        let pos = self.config.position_tolerance;
        let rot = self.config.orientation_tolerance;
        let goal = GoalConstraints::from_pose(link, target, [pos; 3], [rot, rot, yaw_tolerance]);

        Ok(MotionPlanRequest {
            group_name: group.to_string(),
            start_state: start_state.clone(),
            goal_constraints: vec![goal],
            allowed_planning_time: self.config.allowed_planning_time,
            num_planning_attempts: self.config.attempts,
            planner_id: self.config.planner_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picker_protocol::ErrorCode;
    use picker_services::mock::{MockWorld, PlanBehavior, ServiceCall};
    use std::time::Duration;

    fn client(world: &MockWorld) -> MotionPlanClient {
        let services = world.services();
        MotionPlanClient::new(services.planning, services.groups, PlanningConfig::default())
    }

    #[test]
    fn test_plan_curates_first_waypoint() {
        let world = MockWorld::new();
        let plan = client(&world)
            .plan(&RobotState::default(), "robot", &PoseStamped::default(), 0.1)
            .unwrap();
        assert_eq!(plan.trajectory.points[0].time_from_start, Duration::from_millis(10));
    }

    #[test]
    fn test_request_parameters() {
        let world = MockWorld::new();
        client(&world)
            .plan(&RobotState::default(), "robot_rail", &PoseStamped::default(), 3.0)
            .unwrap();

        let calls = world.calls();
        assert_eq!(
            calls[0],
            ServiceCall::Plan {
                group: "robot_rail".into(),
                yaw_tolerance: 3.0,
                planner_id: "RRTConnectkConfigDefault".into(),
                attempts: 4,
                allowed_planning_time: 1.0,
            }
        );
    }

    #[test]
    fn test_unknown_group_skips_service() {
        let world = MockWorld::new();
        let err = client(&world)
            .plan(&RobotState::default(), "gantry", &PoseStamped::default(), 0.1)
            .unwrap_err();
        assert!(matches!(err, PlanningError::NoGoalConstraint { .. }));
        assert!(world.calls().is_empty());
    }

    #[test]
    fn test_failure_modes() {
        let world = MockWorld::new();
        world.script_plan(PlanBehavior::Fail(ErrorCode::NoIkSolution));
        world.script_plan(PlanBehavior::Unreachable);
        world.script_plan(PlanBehavior::EmptyTrajectory);
        let client = client(&world);
        let plan = || client.plan(&RobotState::default(), "robot", &PoseStamped::default(), 0.1);

        assert_eq!(
            plan().unwrap_err(),
            PlanningError::ErrorCode {
                group: "robot".into(),
                code: ErrorCode::NoIkSolution
            }
        );
        assert!(matches!(plan().unwrap_err(), PlanningError::Service(_)));
        assert_eq!(
            plan().unwrap_err(),
            PlanningError::EmptyTrajectory {
                group: "robot".into()
            }
        );
        assert!(plan().is_ok());
    }
}
