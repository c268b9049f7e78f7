//! Loop Runner - 固定频率控制循环
//!
//! 以固定周期调用 [`IntakeSystem::tick`]，使用 `spin_sleep` 实现低抖动延时。
//! dt 的测量和时间跳变处理在 `tick` 内部完成（基于注入的时钟），
//! 这里只负责节拍：按绝对截止时间休眠，某个 tick 超时则重新对齐并记录警告。
//!
//! ```rust,no_run
//! use intake_system::{Environment, IntakeSystem, LoopConfig, run_loop};
//! use intake_hal::mock::MockHardware;
//! use std::sync::atomic::AtomicBool;
//!
//! # fn main() -> Result<(), intake_system::IntakeError> {
//! let mut system = IntakeSystem::init(Environment::new(MockHardware::new()))?;
//! let config = LoopConfig {
//!     max_iterations: Some(500),
//!     ..LoopConfig::default()
//! };
//! let stop = AtomicBool::new(false);
//! run_loop(&mut system, &config, &stop)?;
//! system.destroy()?;
//! # Ok(())
//! # }
//! ```

use crate::error::IntakeError;
use crate::system::IntakeSystem;
use intake_tools::LoopSettings;
use spin_sleep::SpinSleeper;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// 控制循环配置
#[derive(Debug, Clone, PartialEq)]
pub struct LoopConfig {
    /// 控制频率（Hz）
    ///
    /// 例如：50.0 表示 50Hz（20ms 周期）
    pub frequency_hz: f64,

    /// 超时倍数
    ///
    /// 单个周期实际耗时超过标称周期的此倍数时记录警告。
    pub dt_clamp_multiplier: f64,

    /// 最大迭代次数（None 表示直到 stop 标志被置位）
    pub max_iterations: Option<usize>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        LoopConfig {
            frequency_hz: 50.0,
            dt_clamp_multiplier: 2.0,
            max_iterations: None,
        }
    }
}

impl LoopConfig {
    /// 从配置文件的 `control_loop` 段构造
    pub fn from_settings(settings: &LoopSettings) -> Self {
        LoopConfig {
            frequency_hz: 1000.0 / settings.period_ms as f64,
            dt_clamp_multiplier: settings.dt_clamp_multiplier,
            max_iterations: None,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// 标称周期
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frequency_hz)
    }

    pub fn validate(&self) -> Result<(), IntakeError> {
        if !self.frequency_hz.is_finite() || self.frequency_hz <= 0.0 {
            return Err(IntakeError::InvalidLoopConfig(format!(
                "Invalid frequency_hz: {} (must be > 0)",
                self.frequency_hz
            )));
        }
        if self.frequency_hz > 1000.0 {
            warn!(
                "Very high control frequency: {} Hz. Hardware updates may not keep up.",
                self.frequency_hz
            );
        }
        if !self.dt_clamp_multiplier.is_finite() || self.dt_clamp_multiplier <= 0.0 {
            return Err(IntakeError::InvalidLoopConfig(format!(
                "Invalid dt_clamp_multiplier: {} (must be > 0)",
                self.dt_clamp_multiplier
            )));
        }
        Ok(())
    }
}

/// 运行控制循环
///
/// 阻塞直到：
/// - `stop` 被置位（例如 Ctrl+C 处理器）
/// - 达到 `max_iterations`（如果设置）
///
/// 返回实际执行的 tick 数。
pub fn run_loop(
    system: &mut IntakeSystem,
    config: &LoopConfig,
    stop: &AtomicBool,
) -> Result<usize, IntakeError> {
    config.validate()?;

    // 设置线程优先级（可选 feature）
    #[cfg(feature = "realtime")]
    {
        use thread_priority::{ThreadPriority, set_current_thread_priority};

        match set_current_thread_priority(ThreadPriority::Max) {
            Ok(_) => tracing::info!("Control loop thread priority set to MAX (realtime)"),
            Err(e) => warn!(
                "Failed to set control loop thread priority: {:?}. \
                On Linux, you may need CAP_SYS_NICE or rtkit.",
                e
            ),
        }
    }

    let period = config.period();
    let overrun = period.mul_f64(config.dt_clamp_multiplier);
    let sleeper = SpinSleeper::default();

    let mut deadline = Instant::now() + period;
    let mut iterations = 0;

    while !stop.load(Ordering::Relaxed) {
        if let Some(max_iter) = config.max_iterations
            && iterations >= max_iter
        {
            break;
        }

        system.tick();
        iterations += 1;

        let now = Instant::now();
        if now >= deadline {
            let late = now - deadline;
            if late + period > overrun {
                warn!("Control loop overrun: tick finished {:?} late", late);
            }
            // 重新对齐，不追赶丢失的周期
            deadline = now + period;
            continue;
        }
        sleeper.sleep(deadline - now);
        deadline += period;
    }

    debug!("Control loop stopped after {} ticks", iterations);
    Ok(iterations)
}
