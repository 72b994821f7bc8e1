//! 编排器配置
//!
//! 启动时加载一次，进程生命周期内不变。所有时间字段以毫秒整数存储，
//! 通过 `*_period()` / `*_timeout()` 等方法取得 `Duration`。
//!
//! # TOML 示例
//!
//! ```toml
//! preferred_pick_angle = 1.5707963267948966
//! tick_period_ms = 100
//!
//! [rail]
//! group_name = "robot_rail"
//! controller_name = "robot_rail_controller"
//! wait_pose_name = "RAIL_ARM_WAIT"
//!
//! [planning.yaw_tolerance]
//! place = 3.14
//! ```
//!
//! 未出现的字段取默认值。

use crate::error::OrchestratorError;
use crate::report::Phase;
use picker_protocol::{ControlGroupInfo, DEFAULT_PLANNER_ID};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// 编排器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// 粗运动组（导轨）
    pub rail: ControlGroupInfo,
    /// 精运动组（机械臂）
    pub arm: ControlGroupInfo,
    /// 首选抓取角（rad，绕 Z 轴）
    pub preferred_pick_angle: f64,
    /// 控制循环周期
    pub tick_period_ms: u64,
    /// 启动时每个服务端点的最长等待时间
    pub service_timeout_ms: u64,
    /// 成功任务后异步回等待位姿的沉降时间
    pub settle_delay_ms: u64,
    /// 队列积压告警阈值（仅告警，不丢弃不阻塞）
    pub queue_warn_threshold: usize,
    pub planning: PlanningConfig,
    pub monitor: MonitorConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            rail: ControlGroupInfo::default_rail(),
            arm: ControlGroupInfo::default_arm(),
            preferred_pick_angle: std::f64::consts::FRAC_PI_2,
            tick_period_ms: 100,
            service_timeout_ms: 5000,
            settle_delay_ms: 3000,
            queue_warn_threshold: 32,
            planning: PlanningConfig::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

/// 规划参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    /// 允许的规划时间（秒）
    pub allowed_planning_time: f64,
    pub attempts: u32,
    pub planner_id: String,
    /// 位置容差（m，x/y/z 相同）
    pub position_tolerance: f64,
    /// 横滚/俯仰容差（rad）
    pub orientation_tolerance: f64,
    pub yaw_tolerance: YawTolerances,
    /// 首航点修正时间
    pub first_waypoint_epsilon_ms: u64,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            allowed_planning_time: 1.0,
            attempts: 4,
            planner_id: DEFAULT_PLANNER_ID.to_string(),
            position_tolerance: 0.01,
            orientation_tolerance: 0.01,
            yaw_tolerance: YawTolerances::default(),
            first_waypoint_epsilon_ms: 10,
        }
    }
}

impl PlanningConfig {
    pub fn first_waypoint_epsilon(&self) -> Duration {
        Duration::from_millis(self.first_waypoint_epsilon_ms)
    }
}

/// 各阶段偏航容差（rad）
///
/// 放置阶段几乎不约束偏航。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YawTolerances {
    pub approach: f64,
    pub pick: f64,
    pub retreat: f64,
    pub place: f64,
}

// 放置容差取 3.14 而不是 π
#[allow(clippy::approx_constant)]
impl Default for YawTolerances {
    fn default() -> Self {
        Self {
            approach: 0.1,
            pick: 0.1,
            retreat: 0.1,
            place: 3.14,
        }
    }
}

impl YawTolerances {
    /// 该阶段规划时使用的 yaw 容差
    ///
    /// `Reset` 不做规划（回等待位姿走命名位姿移动），按 approach 容差处理。
    pub fn for_phase(&self, phase: Phase) -> f64 {
        match phase {
            Phase::Approach => self.approach,
            Phase::Pick => self.pick,
            Phase::Retreat => self.retreat,
            Phase::Place => self.place,
            Phase::Reset => self.approach,
        }
    }

    fn all(&self) -> [f64; 4] {
        [self.approach, self.pick, self.retreat, self.place]
    }
}

/// 接触监视参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// 吸附检测（抓取轨迹执行期间）轮询周期
    pub acquisition_period_ms: u64,
    /// 吸附保持（撤离/放置期间）轮询周期
    pub retention_period_ms: u64,
    /// 阻塞等待吸附的轮询周期
    pub attachment_poll_ms: u64,
    /// 阻塞等待吸附的超时
    pub attachment_timeout_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            acquisition_period_ms: 100,
            retention_period_ms: 200,
            attachment_poll_ms: 10,
            attachment_timeout_ms: 2000,
        }
    }
}

impl MonitorConfig {
    pub fn acquisition_period(&self) -> Duration {
        Duration::from_millis(self.acquisition_period_ms)
    }

    pub fn retention_period(&self) -> Duration {
        Duration::from_millis(self.retention_period_ms)
    }

    pub fn attachment_poll(&self) -> Duration {
        Duration::from_millis(self.attachment_poll_ms)
    }

    pub fn attachment_timeout(&self) -> Duration {
        Duration::from_millis(self.attachment_timeout_ms)
    }
}

impl OrchestratorConfig {
    /// 从 TOML 文件加载并校验
    ///
    /// # 错误
    ///
    /// - `OrchestratorError::Io`: 文件读取失败
    /// - `OrchestratorError::ConfigParse`: TOML 格式错误
    /// - `OrchestratorError::Configuration`: 校验失败
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, OrchestratorError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, OrchestratorError> {
        let config: OrchestratorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, OrchestratorError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 保存到 TOML 文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), OrchestratorError> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        for (role, group) in [("rail", &self.rail), ("arm", &self.arm)] {
            if group.group_name.is_empty() {
                return Err(config_error(format!("{} group name is empty", role)));
            }
            if group.controller_name.is_empty() {
                return Err(config_error(format!("{} controller name is empty", role)));
            }
            if group.wait_pose_name.is_empty() {
                return Err(config_error(format!("{} wait pose name is empty", role)));
            }
        }
        if self.rail.group_name == self.arm.group_name {
            return Err(config_error(format!(
                "rail and arm must be distinct groups (both '{}')",
                self.rail.group_name
            )));
        }
        if self.rail.controller_name == self.arm.controller_name {
            return Err(config_error(format!(
                "rail and arm must use distinct controllers (both '{}')",
                self.rail.controller_name
            )));
        }
        if !self.preferred_pick_angle.is_finite() {
            return Err(config_error("preferred_pick_angle must be finite"));
        }
        if self.tick_period_ms == 0 {
            return Err(config_error("tick_period_ms must be > 0"));
        }
        if self.monitor.acquisition_period_ms == 0
            || self.monitor.retention_period_ms == 0
            || self.monitor.attachment_poll_ms == 0
        {
            return Err(config_error("monitor periods must be > 0"));
        }

        let planning = &self.planning;
        if !(planning.allowed_planning_time > 0.0) {
            return Err(config_error("allowed_planning_time must be > 0"));
        }
        if planning.attempts == 0 {
            return Err(config_error("planning attempts must be > 0"));
        }
        if planning.planner_id.is_empty() {
            return Err(config_error("planner_id is empty"));
        }
        if !(planning.position_tolerance > 0.0) || !(planning.orientation_tolerance > 0.0) {
            return Err(config_error("goal tolerances must be > 0"));
        }
        if planning.yaw_tolerance.all().iter().any(|t| !(*t > 0.0)) {
            return Err(config_error("yaw tolerances must be > 0"));
        }
        if planning.first_waypoint_epsilon_ms == 0 {
            return Err(config_error("first_waypoint_epsilon_ms must be > 0"));
        }
        Ok(())
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn service_timeout(&self) -> Duration {
        Duration::from_millis(self.service_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

fn config_error(msg: impl Into<String>) -> OrchestratorError {
    OrchestratorError::Configuration(msg.into())
}
