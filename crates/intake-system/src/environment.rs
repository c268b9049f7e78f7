//! 初始化环境
//!
//! [`Environment`] 把 `IntakeSystem::init` 需要的所有协作者打包在一起：
//! 硬件后端、输入映射、遥测 sink、时钟和配置。

use crate::input::{InputMethod, SharedInput};
use intake_control::{MonotonicClock, SharedClock};
use intake_hal::HardwareProvider;
use intake_tools::{IntakeConfig, NullTelemetry, TelemetrySink};
use std::sync::Arc;

/// 初始化环境
///
/// # Example
///
/// ```
/// use intake_system::{Environment, SharedInput};
/// use intake_control::ManualClock;
/// use intake_hal::mock::MockHardware;
/// use std::sync::Arc;
///
/// let env = Environment::new(MockHardware::new())
///     .with_input(SharedInput::new())
///     .with_clock(Arc::new(ManualClock::new()));
/// assert_eq!(env.config().arm.kp, 0.3);
/// ```
pub struct Environment {
    pub(crate) hardware: Box<dyn HardwareProvider>,
    pub(crate) input: Box<dyn InputMethod>,
    pub(crate) telemetry: Box<dyn TelemetrySink>,
    pub(crate) clock: SharedClock,
    pub(crate) config: IntakeConfig,
}

impl Environment {
    /// 默认：无人操作的输入、丢弃遥测、系统单调时钟、默认配置
    pub fn new(hardware: impl HardwareProvider + 'static) -> Self {
        Self {
            hardware: Box::new(hardware),
            input: Box::new(SharedInput::new()),
            telemetry: Box::new(NullTelemetry),
            clock: Arc::new(MonotonicClock),
            config: IntakeConfig::default(),
        }
    }

    pub fn with_input(mut self, input: impl InputMethod + 'static) -> Self {
        self.input = Box::new(input);
        self
    }

    pub fn with_telemetry(mut self, telemetry: impl TelemetrySink + 'static) -> Self {
        self.telemetry = Box::new(telemetry);
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: IntakeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
