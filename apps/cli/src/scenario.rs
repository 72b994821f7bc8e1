//! 仿真场景
//!
//! JSON 场景文件：模拟世界参数 + 按时间顺序提交的目标序列。
//!
//! ```json
//! {
//!   "name": "conveyor",
//!   "description": "three boxes, the second one too late",
//!   "gripper": { "type": "attach_on_contact", "after_ms": 150 },
//!   "arm_plan_ms": 600,
//!   "targets": [
//!     { "lead_ms": 2500, "approach": [1.0, 0.5, 1.2], "pick": [1.0, 0.5, 0.9],
//!       "retreat": [1.0, 0.5, 1.2], "place": [-1.0, 0.0, 1.0] }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use picker_protocol::{Point, Pose, PoseStamped, Quaternion, TargetDescriptor, Timestamp};
use picker_services::mock::{GripperBehavior, MockWorld};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// 仿真场景
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// 场景名称
    pub name: String,

    /// 场景描述
    #[serde(default)]
    pub description: String,

    /// 吸盘模型
    #[serde(default)]
    pub gripper: GripperModel,

    /// 导轨规划时长（毫秒，未设置时使用模拟世界默认值）
    #[serde(default)]
    pub rail_plan_ms: Option<u64>,

    /// 机械臂规划时长（毫秒）
    #[serde(default)]
    pub arm_plan_ms: Option<u64>,

    /// 目标序列
    pub targets: Vec<ScenarioTarget>,
}

/// 吸盘模型（场景文件表示）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GripperModel {
    AttachOnContact { after_ms: u64 },
    Never,
    DropDuringTransfer { attach_after_ms: u64, drop_after_ms: u64 },
}

impl Default for GripperModel {
    fn default() -> Self {
        Self::AttachOnContact { after_ms: 150 }
    }
}

impl From<GripperModel> for GripperBehavior {
    fn from(model: GripperModel) -> Self {
        match model {
            GripperModel::AttachOnContact { after_ms } => GripperBehavior::AttachOnContact {
                after: Duration::from_millis(after_ms),
            },
            GripperModel::Never => GripperBehavior::Never,
            GripperModel::DropDuringTransfer {
                attach_after_ms,
                drop_after_ms,
            } => GripperBehavior::DropDuringTransfer {
                attach_after: Duration::from_millis(attach_after_ms),
                drop_after: Duration::from_millis(drop_after_ms),
            },
        }
    }
}

/// 场景中的单个目标
///
/// 位置为 `[x, y, z]`（米），朝向恒为单位四元数，由编排器按抓取角旋转。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioTarget {
    /// 相对上一个目标的提交延迟（毫秒）
    #[serde(default)]
    pub submit_after_ms: u64,

    /// 提交时刻到物体到达抓取点的时间（毫秒）
    pub lead_ms: u64,

    /// 坐标系
    #[serde(default = "default_frame")]
    pub frame: String,

    pub approach: [f64; 3],
    pub pick: [f64; 3],
    pub retreat: [f64; 3],
    pub place: [f64; 3],
}

fn default_frame() -> String {
    "world".to_string()
}

impl ScenarioTarget {
    pub fn submit_delay(&self) -> Duration {
        Duration::from_millis(self.submit_after_ms)
    }

    /// 以 `now` 为提交时刻生成目标描述符
    pub fn to_descriptor(&self, now: Timestamp) -> TargetDescriptor {
        let pose = |p: &[f64; 3], stamp: Timestamp| {
            PoseStamped::new(
                self.frame.clone(),
                stamp,
                Pose::new(Point::new(p[0], p[1], p[2]), Quaternion::identity()),
            )
        };
        let pick_time = now.saturating_add(Duration::from_millis(self.lead_ms));
        TargetDescriptor::new(
            pose(&self.approach, now),
            pose(&self.pick, pick_time),
            pose(&self.retreat, now),
            pose(&self.place, now),
        )
    }
}

impl Scenario {
    /// 加载场景文件
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("读取场景文件失败")?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let scenario: Scenario = serde_json::from_str(content).context("解析场景 JSON 失败")?;
        if scenario.targets.is_empty() {
            anyhow::bail!("场景 '{}' 没有目标", scenario.name);
        }
        Ok(scenario)
    }

    /// 按场景参数配置模拟世界
    pub fn apply_to(&self, world: &MockWorld, rail_group: &str, arm_group: &str) {
        world.set_gripper(self.gripper.into());
        if let Some(ms) = self.rail_plan_ms {
            world.set_plan_duration(rail_group, Duration::from_millis(ms));
        }
        if let Some(ms) = self.arm_plan_ms {
            world.set_plan_duration(arm_group, Duration::from_millis(ms));
        }
    }
}
