//! 模拟世界
//!
//! 在进程内模拟全部外部服务：规划器、轨迹执行、真空吸盘、控制器管理器、
//! 运动组接口，以及吸附反馈信号。用于测试和 CLI 仿真运行。
//!
//! # 模型
//!
//! - 规划：按运动组默认时长生成 3 航点轨迹，首航点时间为 0（与真实规划器一致）
//! - 执行：按轨迹时长阻塞，每 2ms 检查一次 stop 请求，被 stop 时返回 `Preempted`
//! - 吸盘：开启后在接触组执行期间按 [`GripperBehavior`] 写入吸附反馈；关闭即释放
//! - 所有调用按顺序记录为 [`ServiceCall`]
//!
//! # 示例
//!
//! ```rust
//! use picker_services::mock::{MockWorld, ServiceCall};
//!
//! let world = MockWorld::new();
//! let services = world.services();
//! services.actuator.set_enabled(true).unwrap();
//! assert!(world.snapshot().actuator_engaged);
//! assert_eq!(world.calls(), vec![ServiceCall::Actuator { enable: true }]);
//! ```

mod behavior;

pub use behavior::{ExecBehavior, GripperBehavior, PlanBehavior, ServiceCall};

use crate::error::ServiceError;
use crate::feedback::AttachmentFeedback;
use crate::service::{
    ActuatorService, ControllerSwitchService, MotionGroupInterface, MotionPlanningService,
    MoveMode, ServiceEndpoint, Services, TrajectoryExecutionService,
};
use parking_lot::Mutex;
use picker_protocol::{
    ControlGroupInfo, ErrorCode, JointTrajectory, JointTrajectoryPoint, MotionPlan,
    MotionPlanRequest, MotionPlanResponse, RobotState, SwitchControllerRequest,
};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// 规划服务端点名
pub const PLANNING_ENDPOINT: &str = "plan_kinematic_path";
/// 吸盘控制服务端点名
pub const ACTUATOR_ENDPOINT: &str = "gripper/control";
/// 控制器切换服务端点名
pub const CONTROLLER_ENDPOINT: &str = "controller_manager/switch_controller";

/// 执行循环检查 stop 的周期
const EXECUTION_STEP: Duration = Duration::from_millis(2);

/// 模拟运动组
#[derive(Debug, Clone, PartialEq)]
pub struct MockGroup {
    pub end_effector: String,
    pub joint_names: Vec<String>,
    pub positions: Vec<f64>,
    pub named_poses: BTreeMap<String, Vec<f64>>,
    /// 默认规划时长
    pub plan_duration: Duration,
}

impl MockGroup {
    fn new(end_effector: &str, joints: &[&str], wait_pose: &str) -> Self {
        let joint_names: Vec<String> = joints.iter().map(|j| j.to_string()).collect();
        let zeros = vec![0.0; joint_names.len()];
        let mut named_poses = BTreeMap::new();
        named_poses.insert(wait_pose.to_string(), zeros.clone());
        Self {
            end_effector: end_effector.to_string(),
            joint_names,
            positions: zeros,
            named_poses,
            plan_duration: Duration::from_millis(300),
        }
    }
}

/// 模拟世界可观测状态
#[derive(Debug, Clone, PartialEq)]
pub struct MockWorldState {
    pub groups: BTreeMap<String, MockGroup>,
    pub actuator_engaged: bool,
    pub active_controllers: BTreeSet<String>,
    /// 当前正在执行轨迹的运动组
    pub executing: Option<String>,
    /// 是否检测到两个运动组同时执行
    pub concurrent_execution_detected: bool,
    pub calls: Vec<ServiceCall>,
}

/// 行为脚本（测试注入）
#[derive(Debug, Default)]
struct Script {
    plans: VecDeque<PlanBehavior>,
    executions: VecDeque<ExecBehavior>,
    gripper: GripperBehavior,
    actuator_fails: bool,
    actuator_unreachable: bool,
    actuator_delay: Duration,
    controller_switch_fails: bool,
    unavailable: BTreeSet<String>,
    named_move_duration: Duration,
    /// 已吸附且下一次接触组执行需要脱落
    drop_pending: bool,
}

struct WorldInner {
    state: Mutex<MockWorldState>,
    script: Mutex<Script>,
    stop_requests: Mutex<BTreeSet<String>>,
    feedback: AttachmentFeedback,
    contact_group: Mutex<String>,
}

impl WorldInner {
    fn record(&self, call: ServiceCall) {
        trace!("mock call: {:?}", call);
        self.state.lock().calls.push(call);
    }

    fn is_unavailable(&self, endpoint: &str) -> bool {
        self.script.lock().unavailable.contains(endpoint)
    }
}

/// 模拟世界
#[derive(Clone)]
pub struct MockWorld {
    inner: Arc<WorldInner>,
}

impl MockWorld {
    /// 使用默认运动组（"robot_rail" 导轨 + "robot" 机械臂）创建
    pub fn new() -> Self {
        Self::with_groups(&ControlGroupInfo::default_rail(), &ControlGroupInfo::default_arm())
    }

    /// 按运动组配置创建；`arm` 为接触组
    pub fn with_groups(rail: &ControlGroupInfo, arm: &ControlGroupInfo) -> Self {
        let mut groups = BTreeMap::new();
        groups.insert(
            rail.group_name.clone(),
            MockGroup::new("rail_tool", &["rail_joint"], &rail.wait_pose_name),
        );
        groups.insert(
            arm.group_name.clone(),
            MockGroup::new(
                "tool0",
                &[
                    "shoulder_pan_joint",
                    "shoulder_lift_joint",
                    "elbow_joint",
                    "wrist_1_joint",
                    "wrist_2_joint",
                    "wrist_3_joint",
                ],
                &arm.wait_pose_name,
            ),
        );

        let script = Script {
            named_move_duration: Duration::from_millis(20),
            ..Default::default()
        };

        Self {
            inner: Arc::new(WorldInner {
                state: Mutex::new(MockWorldState {
                    groups,
                    actuator_engaged: false,
                    active_controllers: BTreeSet::new(),
                    executing: None,
                    concurrent_execution_detected: false,
                    calls: Vec::new(),
                }),
                script: Mutex::new(script),
                stop_requests: Mutex::new(BTreeSet::new()),
                feedback: AttachmentFeedback::new(),
                contact_group: Mutex::new(arm.group_name.clone()),
            }),
        }
    }

    /// 全部服务句柄
    pub fn services(&self) -> Services {
        Services {
            planning: Arc::new(MockPlanner(self.inner.clone())),
            execution: Arc::new(MockExecutor(self.inner.clone())),
            actuator: Arc::new(MockActuator(self.inner.clone())),
            controllers: Arc::new(MockControllers(self.inner.clone())),
            groups: Arc::new(MockGroups(self.inner.clone())),
        }
    }

    /// 吸附反馈信号（与模拟吸盘共享）
    pub fn feedback(&self) -> AttachmentFeedback {
        self.inner.feedback.clone()
    }

    /// 设置运动组默认规划时长
    pub fn set_plan_duration(&self, group: &str, duration: Duration) {
        if let Some(g) = self.inner.state.lock().groups.get_mut(group) {
            g.plan_duration = duration;
        }
    }

    /// 追加一次规划调用的行为（按调用顺序消费，用完后默认成功）
    pub fn script_plan(&self, behavior: PlanBehavior) {
        self.inner.script.lock().plans.push_back(behavior);
    }

    /// 追加一次执行调用的行为（按调用顺序消费，用完后默认成功）
    pub fn script_execution(&self, behavior: ExecBehavior) {
        self.inner.script.lock().executions.push_back(behavior);
    }

    pub fn set_gripper(&self, behavior: GripperBehavior) {
        let mut script = self.inner.script.lock();
        script.gripper = behavior;
        script.drop_pending = false;
    }

    /// 吸盘服务报告失败（`success = false`）
    pub fn set_actuator_fails(&self, fails: bool) {
        self.inner.script.lock().actuator_fails = fails;
    }

    /// 吸盘服务传输失败
    pub fn set_actuator_unreachable(&self, unreachable: bool) {
        self.inner.script.lock().actuator_unreachable = unreachable;
    }

    /// 吸盘服务响应延迟
    pub fn set_actuator_delay(&self, delay: Duration) {
        self.inner.script.lock().actuator_delay = delay;
    }

    /// 控制器切换服务报告失败（`ok = false`）
    pub fn set_controller_switch_fails(&self, fails: bool) {
        self.inner.script.lock().controller_switch_fails = fails;
    }

    /// 标记端点不可达（影响启动探测）
    pub fn set_unavailable(&self, endpoint: &str, unavailable: bool) {
        let mut script = self.inner.script.lock();
        if unavailable {
            script.unavailable.insert(endpoint.to_string());
        } else {
            script.unavailable.remove(endpoint);
        }
    }

    /// 阻塞式命名位姿移动耗时
    pub fn set_named_move_duration(&self, duration: Duration) {
        self.inner.script.lock().named_move_duration = duration;
    }

    /// 移除运动组（模拟机器人模型中缺失该组）
    pub fn remove_group(&self, group: &str) {
        self.inner.state.lock().groups.remove(group);
    }

    /// 状态快照
    pub fn snapshot(&self) -> MockWorldState {
        self.inner.state.lock().clone()
    }

    /// 调用记录
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.inner.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.state.lock().calls.clear();
    }
}

impl Default for MockWorld {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== 服务实现 ====================

struct MockPlanner(Arc<WorldInner>);

impl ServiceEndpoint for MockPlanner {
    fn endpoint_name(&self) -> &str {
        PLANNING_ENDPOINT
    }

    fn wait_until_ready(&self, _timeout: Duration) -> bool {
        !self.0.is_unavailable(PLANNING_ENDPOINT)
    }
}

impl MotionPlanningService for MockPlanner {
    fn plan(&self, request: &MotionPlanRequest) -> Result<MotionPlanResponse, ServiceError> {
        let yaw_tolerance = request
            .goal_constraints
            .first()
            .map(|g| g.yaw_tolerance())
            .unwrap_or_default();
        self.0.record(ServiceCall::Plan {
            group: request.group_name.clone(),
            yaw_tolerance,
            planner_id: request.planner_id.clone(),
            attempts: request.num_planning_attempts,
            allowed_planning_time: request.allowed_planning_time,
        });

        let behavior = self.0.script.lock().plans.pop_front().unwrap_or(PlanBehavior::Succeed);
        let group = self.0.state.lock().groups.get(&request.group_name).cloned();

        let Some(group) = group else {
            return Ok(failed_response(request, ErrorCode::InvalidGroupName));
        };

        let duration = match behavior {
            PlanBehavior::Unreachable => return Err(ServiceError::unavailable(PLANNING_ENDPOINT)),
            PlanBehavior::Fail(code) => return Ok(failed_response(request, code)),
            PlanBehavior::EmptyTrajectory => {
                return Ok(MotionPlanResponse {
                    trajectory: JointTrajectory::new(group.joint_names.clone(), Vec::new()),
                    trajectory_start: request.start_state.clone(),
                    planning_time: 0.01,
                    error_code: ErrorCode::Success,
                });
            },
            PlanBehavior::DetachDuring(latency) => {
                debug!("mock gripper: object dropped while planning {}", request.group_name);
                self.0.feedback.set(false);
                self.0.script.lock().drop_pending = false;
                thread::sleep(latency);
                group.plan_duration
            },
            PlanBehavior::Succeed => group.plan_duration,
            PlanBehavior::SucceedIn(d) => d,
        };

        let start = group.positions.clone();
        let goal: Vec<f64> = start.iter().map(|p| p + 0.1).collect();
        let mid: Vec<f64> = start.iter().zip(&goal).map(|(a, b)| (a + b) / 2.0).collect();
        let trajectory = JointTrajectory::new(
            group.joint_names.clone(),
            vec![
                JointTrajectoryPoint::new(start, Duration::ZERO),
                JointTrajectoryPoint::new(mid, duration / 2),
                JointTrajectoryPoint::new(goal, duration),
            ],
        );

        Ok(MotionPlanResponse {
            trajectory,
            trajectory_start: request.start_state.clone(),
            planning_time: 0.05,
            error_code: ErrorCode::Success,
        })
    }
}

fn failed_response(request: &MotionPlanRequest, code: ErrorCode) -> MotionPlanResponse {
    MotionPlanResponse {
        trajectory: JointTrajectory::default(),
        trajectory_start: request.start_state.clone(),
        planning_time: 0.0,
        error_code: code,
    }
}

struct MockExecutor(Arc<WorldInner>);

impl TrajectoryExecutionService for MockExecutor {
    fn execute(&self, group: &str, plan: &MotionPlan) -> Result<ErrorCode, ServiceError> {
        let inner = &self.0;
        let duration = plan.duration();
        inner.record(ServiceCall::Execute {
            group: group.to_string(),
            first_waypoint: plan
                .trajectory
                .points
                .first()
                .map(|p| p.time_from_start)
                .unwrap_or_default(),
            duration,
        });

        let behavior = inner.script.lock().executions.pop_front().unwrap_or(ExecBehavior::Succeed);
        if behavior == ExecBehavior::Unreachable {
            return Err(ServiceError::call_failed("execute_trajectory", "connection lost"));
        }

        {
            let mut state = inner.state.lock();
            if state.executing.is_some() {
                state.concurrent_execution_detected = true;
            }
            state.executing = Some(group.to_string());
        }
        inner.stop_requests.lock().remove(group);

        let is_contact = *inner.contact_group.lock() == group;
        let (mut attach_at, mut drop_at) = {
            let script = inner.script.lock();
            let engaged = inner.state.lock().actuator_engaged;
            let attached = inner.feedback.is_attached();
            let attach_at = match script.gripper {
                _ if !is_contact || !engaged || attached => None,
                GripperBehavior::AttachOnContact { after }
                | GripperBehavior::DropDuringTransfer {
                    attach_after: after,
                    ..
                }
                | GripperBehavior::DropDuringPlace {
                    attach_after: after,
                    ..
                } => Some(after.min(duration)),
                GripperBehavior::Never => None,
            };
            let drop_at = match script.gripper {
                GripperBehavior::DropDuringTransfer { drop_after, .. }
                    if is_contact && attached && script.drop_pending =>
                {
                    Some(drop_after)
                },
                GripperBehavior::DropDuringPlace { drop_after, .. }
                    if !is_contact && attached && script.drop_pending =>
                {
                    Some(drop_after)
                },
                _ => None,
            };
            (attach_at, drop_at)
        };

        let start = Instant::now();
        let mut code = match behavior {
            ExecBehavior::Fail(code) => code,
            _ => ErrorCode::Success,
        };
        loop {
            let elapsed = start.elapsed();

            if let Some(at) = attach_at
                && elapsed >= at
            {
                attach_at = None;
                if inner.state.lock().actuator_engaged {
                    debug!("mock gripper: object attached on {}", group);
                    inner.feedback.set(true);
                    let mut script = inner.script.lock();
                    script.drop_pending = matches!(
                        script.gripper,
                        GripperBehavior::DropDuringTransfer { .. }
                            | GripperBehavior::DropDuringPlace { .. }
                    );
                }
            }

            if let Some(at) = drop_at
                && elapsed >= at
            {
                drop_at = None;
                debug!("mock gripper: object dropped on {}", group);
                inner.feedback.set(false);
                inner.script.lock().drop_pending = false;
            }

            if inner.stop_requests.lock().remove(group) {
                code = ErrorCode::Preempted;
                break;
            }

            if elapsed >= duration {
                break;
            }

            thread::sleep(EXECUTION_STEP);
        }

        {
            let mut state = inner.state.lock();
            if code != ErrorCode::Preempted
                && let (Some(last), Some(g)) =
                    (plan.trajectory.points.last(), state.groups.get_mut(group))
                && last.positions.len() == g.positions.len()
            {
                g.positions = last.positions.clone();
            }
            state.executing = None;
        }
        inner.record(ServiceCall::ExecuteFinished {
            group: group.to_string(),
            code,
        });
        Ok(code)
    }
}

struct MockActuator(Arc<WorldInner>);

impl ServiceEndpoint for MockActuator {
    fn endpoint_name(&self) -> &str {
        ACTUATOR_ENDPOINT
    }

    fn wait_until_ready(&self, _timeout: Duration) -> bool {
        !self.0.is_unavailable(ACTUATOR_ENDPOINT)
    }
}

impl ActuatorService for MockActuator {
    fn set_enabled(&self, enable: bool) -> Result<bool, ServiceError> {
        self.0.record(ServiceCall::Actuator { enable });

        let (delay, unreachable, fails) = {
            let script = self.0.script.lock();
            (script.actuator_delay, script.actuator_unreachable, script.actuator_fails)
        };
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        if unreachable {
            return Err(ServiceError::call_failed(ACTUATOR_ENDPOINT, "connection refused"));
        }
        if fails {
            return Ok(false);
        }

        self.0.state.lock().actuator_engaged = enable;
        if !enable {
            // 关闭真空即释放物体
            self.0.feedback.set(false);
            self.0.script.lock().drop_pending = false;
        }
        Ok(true)
    }
}

struct MockControllers(Arc<WorldInner>);

impl ServiceEndpoint for MockControllers {
    fn endpoint_name(&self) -> &str {
        CONTROLLER_ENDPOINT
    }

    fn wait_until_ready(&self, _timeout: Duration) -> bool {
        !self.0.is_unavailable(CONTROLLER_ENDPOINT)
    }
}

impl ControllerSwitchService for MockControllers {
    fn switch_controllers(&self, request: &SwitchControllerRequest) -> Result<bool, ServiceError> {
        self.0.record(ServiceCall::Switch {
            start: request.start_controllers.clone(),
            stop: request.stop_controllers.clone(),
        });

        if self.0.script.lock().controller_switch_fails {
            return Ok(false);
        }

        let mut state = self.0.state.lock();
        for c in &request.stop_controllers {
            state.active_controllers.remove(c);
        }
        for c in &request.start_controllers {
            state.active_controllers.insert(c.clone());
        }
        Ok(true)
    }
}

struct MockGroups(Arc<WorldInner>);

impl MotionGroupInterface for MockGroups {
    fn group_names(&self) -> Vec<String> {
        self.0.state.lock().groups.keys().cloned().collect()
    }

    fn end_effector_link(&self, group: &str) -> Option<String> {
        self.0.state.lock().groups.get(group).map(|g| g.end_effector.clone())
    }

    fn current_state(&self, group: &str) -> Result<RobotState, ServiceError> {
        let state = self.0.state.lock();
        let g = state
            .groups
            .get(group)
            .ok_or_else(|| ServiceError::UnknownGroup(group.to_string()))?;
        Ok(RobotState::new(g.joint_names.clone(), g.positions.clone()))
    }

    fn stop(&self, group: &str) {
        self.0.record(ServiceCall::Stop {
            group: group.to_string(),
        });
        let executing = self.0.state.lock().executing.as_deref() == Some(group);
        if executing {
            self.0.stop_requests.lock().insert(group.to_string());
        }
    }

    fn move_to_named(
        &self,
        group: &str,
        pose_name: &str,
        mode: MoveMode,
    ) -> Result<ErrorCode, ServiceError> {
        self.0.record(ServiceCall::MoveNamed {
            group: group.to_string(),
            pose: pose_name.to_string(),
            mode,
        });

        let target = {
            let state = self.0.state.lock();
            let g = state
                .groups
                .get(group)
                .ok_or_else(|| ServiceError::UnknownGroup(group.to_string()))?;
            match g.named_poses.get(pose_name) {
                Some(p) => p.clone(),
                None => return Ok(ErrorCode::InvalidGoalConstraints),
            }
        };

        if mode == MoveMode::Blocking {
            let duration = self.0.script.lock().named_move_duration;
            thread::sleep(duration);
        }

        if let Some(g) = self.0.state.lock().groups.get_mut(group) {
            g.positions = target;
        }
        Ok(ErrorCode::Success)
    }
}
