//! 末端执行器（真空吸盘）控制

use picker_services::ActuatorService;
use std::sync::Arc;
use tracing::{debug, error};

/// 执行器控制器
///
/// 不重试。服务调用没有应用层超时，服务无响应时调用方会一直阻塞。
pub struct ActuatorController {
    service: Arc<dyn ActuatorService>,
}

impl ActuatorController {
    pub fn new(service: Arc<dyn ActuatorService>) -> Self {
        Self { service }
    }

    /// 开关执行器
    ///
    /// 传输失败或服务端报告失败时返回 `false`。
    pub fn set_actuator(&self, enable: bool) -> bool {
        let action = if enable { "engage" } else { "release" };
        match self.service.set_enabled(enable) {
            Ok(true) => {
                debug!("Actuator {}d", action);
                true
            },
            Ok(false) => {
                error!("Actuator {} reported failure", action);
                false
            },
            Err(e) => {
                error!("Actuator {} call failed: {}", action, e);
                false
            },
        }
    }
}
