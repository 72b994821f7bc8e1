//! Builder 模式实现
//!
//! 提供链式构造 `Orchestrator` 实例的便捷方式。

use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;
use crate::orchestrator::Orchestrator;
use picker_protocol::ControlGroupInfo;
use picker_services::{AttachmentFeedback, Services};
use std::path::Path;
use std::time::Duration;

/// Orchestrator Builder（链式构造）
///
/// # Example
///
/// ```rust,no_run
/// use picker_driver::OrchestratorBuilder;
/// use picker_services::Services;
/// use std::time::Duration;
///
/// # fn example(services: Services) -> Result<(), picker_driver::OrchestratorError> {
/// let orchestrator = OrchestratorBuilder::new()
///     .tick_period(Duration::from_millis(50))
///     .preferred_pick_angle(0.0)
///     .services(services)
///     .build()?;
/// # drop(orchestrator);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct OrchestratorBuilder {
    config: OrchestratorConfig,
    services: Option<Services>,
    /// 吸附反馈（未设置时新建一个，通过 `Orchestrator::attachment_feedback` 取得写入句柄）
    feedback: Option<AttachmentFeedback>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用完整配置（覆盖之前的单项设置）
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// 从 TOML 文件加载配置
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, OrchestratorError> {
        self.config = OrchestratorConfig::load_from_file(path)?;
        Ok(self)
    }

    pub fn rail(mut self, rail: ControlGroupInfo) -> Self {
        self.config.rail = rail;
        self
    }

    pub fn arm(mut self, arm: ControlGroupInfo) -> Self {
        self.config.arm = arm;
        self
    }

    /// 首选抓取角（rad）
    pub fn preferred_pick_angle(mut self, angle: f64) -> Self {
        self.config.preferred_pick_angle = angle;
        self
    }

    pub fn tick_period(mut self, period: Duration) -> Self {
        self.config.tick_period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn service_timeout(mut self, timeout: Duration) -> Self {
        self.config.service_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.config.settle_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn services(mut self, services: Services) -> Self {
        self.services = Some(services);
        self
    }

    pub fn attachment_feedback(mut self, feedback: AttachmentFeedback) -> Self {
        self.feedback = Some(feedback);
        self
    }

    /// 构建并启动编排器
    ///
    /// # 错误
    ///
    /// 未设置服务时返回 `OrchestratorError::Configuration`，其余同 [`Orchestrator::start`]。
    pub fn build(self) -> Result<Orchestrator, OrchestratorError> {
        let services = self
            .services
            .ok_or_else(|| OrchestratorError::Configuration("services not set".to_string()))?;
        Orchestrator::start(self.config, services, self.feedback.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picker_services::mock::MockWorld;

    #[test]
    fn test_builder_requires_services() {
        let err = OrchestratorBuilder::new().build().err().unwrap();
        assert!(matches!(err, OrchestratorError::Configuration(_)));
    }

    #[test]
    fn test_builder_applies_settings() {
        let world = MockWorld::new();
        let orchestrator = OrchestratorBuilder::new()
            .tick_period(Duration::from_millis(20))
            .service_timeout(Duration::from_millis(10))
            .settle_delay(Duration::ZERO)
            .preferred_pick_angle(0.5)
            .services(world.services())
            .attachment_feedback(world.feedback())
            .build()
            .unwrap();

        assert_eq!(orchestrator.config().tick_period_ms, 20);
        assert_eq!(orchestrator.config().preferred_pick_angle, 0.5);

        world.feedback().set(true);
        assert!(orchestrator.attachment_feedback().is_attached());
        orchestrator.shutdown();
    }

    #[test]
    fn test_builder_saturates_oversized_durations() {
        let builder = OrchestratorBuilder::new()
            .tick_period(Duration::MAX)
            .service_timeout(Duration::from_secs(u64::MAX))
            .settle_delay(Duration::from_millis(1500));
        assert_eq!(builder.config.tick_period_ms, u64::MAX);
        assert_eq!(builder.config.service_timeout_ms, u64::MAX);
        assert_eq!(builder.config.settle_delay_ms, 1500);
    }

    #[test]
    fn test_builder_validates_groups() {
        let world = MockWorld::new();
        let err = OrchestratorBuilder::new()
            .arm(ControlGroupInfo::default_rail())
            .services(world.services())
            .build()
            .err()
            .unwrap();
        assert!(err.is_startup_fatal());
    }
}
