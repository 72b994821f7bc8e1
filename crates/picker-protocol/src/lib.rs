//! # Picker Protocol
//!
//! 抓放编排器的消息与数据类型定义（无服务依赖）
//!
//! ## 模块
//!
//! - `geometry`: 位姿、四元数、时间戳，以及抓取/放置朝向的旋转组合
//! - `trajectory`: 关节轨迹、机器人状态快照、运动规划结果
//! - `target`: 目标描述符（接近/抓取/撤离/放置四个带时间戳的位姿）和运动组配置
//! - `messages`: 外部服务的请求/响应消息与错误码
//!
//! 本 crate 不包含任何编排逻辑，只描述编排器与外部服务之间交换的数据。

mod error;
pub mod geometry;
pub mod messages;
pub mod target;
pub mod trajectory;

// 重新导出常用类型
pub use error::ProtocolError;
pub use geometry::*;
pub use messages::*;
pub use target::*;
pub use trajectory::*;
