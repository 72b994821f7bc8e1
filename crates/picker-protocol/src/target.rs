//! 目标描述符与运动组配置

use crate::geometry::{PoseStamped, Timestamp};

/// 目标描述符
///
/// 描述一个待处理物体的四个带时间戳位姿。抓取位姿的时间戳表示物体
/// 到达抓取点的绝对时刻。出队后除规划前的朝向变换外不再修改。
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetDescriptor {
    /// 接近位姿（粗运动组）
    pub approach: PoseStamped,
    /// 抓取位姿（精运动组，带到达时间戳）
    pub pick: PoseStamped,
    /// 撤离位姿（精运动组）
    pub retreat: PoseStamped,
    /// 放置位姿（粗运动组）
    pub place: PoseStamped,
}

impl TargetDescriptor {
    pub fn new(
        approach: PoseStamped,
        pick: PoseStamped,
        retreat: PoseStamped,
        place: PoseStamped,
    ) -> Self {
        Self {
            approach,
            pick,
            retreat,
            place,
        }
    }

    /// 物体到达抓取点的时刻
    pub fn pick_time(&self) -> Timestamp {
        self.pick.stamp
    }
}

/// 运动组静态配置
///
/// 启动时加载一次，进程生命周期内不变。共两个实例：
/// 粗运动组 "rail" 与精运动组 "arm"。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlGroupInfo {
    /// 运动组名称
    pub group_name: String,
    /// 控制器名称
    pub controller_name: String,
    /// 等待（安全）位姿名称
    pub wait_pose_name: String,
}

impl ControlGroupInfo {
    pub fn new(
        group_name: impl Into<String>,
        controller_name: impl Into<String>,
        wait_pose_name: impl Into<String>,
    ) -> Self {
        Self {
            group_name: group_name.into(),
            controller_name: controller_name.into(),
            wait_pose_name: wait_pose_name.into(),
        }
    }

    /// 默认粗运动组（导轨）
    pub fn default_rail() -> Self {
        Self::new("robot_rail", "robot_rail_controller", "RAIL_ARM_WAIT")
    }

    /// 默认精运动组（机械臂）
    pub fn default_arm() -> Self {
        Self::new("robot", "robot_controller", "ARM_WAIT")
    }
}
