//! 射击周期状态机
//!
//! 拨杆没有可用的位置反馈，只有一个行程末端限位开关，因此用固定时长近似一次完整行程：
//!
//! ```text
//!            start()                 elapsed >= forward           elapsed >= forward + reverse
//!   Idle ─────────────> ForwardPulse ───────────────> ReversePulse ──────────────────────────> Idle
//!                            │  (+1.0)                     │  (-1.0)
//!                            └──────────┬──────────────────┘
//!                                       │ 限位开关闭合（任意时刻）
//!                                       v
//!                              TerminatedBySwitch ──> Idle
//! ```
//!
//! 时间从注入的 [`Clock`](crate::clock::Clock) 读取：`start()` 记录起点，每个 tick 重新采样。

use crate::clock::SharedClock;
use crate::error::ControlError;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// 正向脉冲输出
pub const FORWARD_COMMAND: f64 = 1.0;

/// 反向脉冲输出
pub const REVERSE_COMMAND: f64 = -1.0;

/// 射击周期阶段（ShootCycle）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShootPhase {
    #[default]
    Idle,
    ForwardPulse,
    ReversePulse,
    /// 只出现在 tick 的报告中；状态机本身随即回到 `Idle`
    TerminatedBySwitch,
}

impl ShootPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            ShootPhase::Idle => "idle",
            ShootPhase::ForwardPulse => "forward",
            ShootPhase::ReversePulse => "reverse",
            ShootPhase::TerminatedBySwitch => "terminated",
        }
    }
}

/// 射击计时
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShootTiming {
    forward: Duration,
    reverse: Duration,
}

impl ShootTiming {
    /// 正向时长必须大于 0
    pub fn new(forward: Duration, reverse: Duration) -> Result<Self, ControlError> {
        if forward.is_zero() {
            return Err(ControlError::InvalidTiming(
                "forward pulse must be longer than zero".to_string(),
            ));
        }
        Ok(Self { forward, reverse })
    }

    pub fn forward(&self) -> Duration {
        self.forward
    }

    pub fn reverse(&self) -> Duration {
        self.reverse
    }

    /// 完整周期时长
    pub fn total(&self) -> Duration {
        self.forward + self.reverse
    }
}

impl Default for ShootTiming {
    /// 250 ms 正向 + 233 ms 反向
    fn default() -> Self {
        Self {
            forward: Duration::from_millis(250),
            reverse: Duration::from_millis(233),
        }
    }
}

/// 单个 tick 的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShootTick {
    /// 拨杆输出
    pub command: f64,
    /// 本 tick 所处阶段
    pub phase: ShootPhase,
    /// 周期是否在本 tick 结束（计时走完或开关闭合）
    pub completed: bool,
}

impl ShootTick {
    const IDLE: ShootTick = ShootTick {
        command: 0.0,
        phase: ShootPhase::Idle,
        completed: false,
    };
}

/// 射击周期状态机
pub struct ShootSequencer {
    clock: SharedClock,
    timing: ShootTiming,
    phase: ShootPhase,
    start_time: Option<Instant>,
}

impl ShootSequencer {
    pub fn new(clock: SharedClock, timing: ShootTiming) -> Self {
        Self {
            clock,
            timing,
            phase: ShootPhase::Idle,
            start_time: None,
        }
    }

    pub fn timing(&self) -> ShootTiming {
        self.timing
    }

    /// 开始一个周期
    ///
    /// 只有在 Idle 时才会开始；返回是否真的开始了。
    pub fn start(&mut self) -> bool {
        if self.is_active() {
            return false;
        }
        let now = self.clock.now();
        self.start_time = Some(now);
        self.phase = ShootPhase::ForwardPulse;
        info!("Shoot cycle started");
        true
    }

    /// 立即回到 Idle
    pub fn cancel(&mut self) {
        if self.is_active() {
            debug!("Shoot cycle cancelled in phase {}", self.phase.as_str());
        }
        self.phase = ShootPhase::Idle;
    }

    /// 推进一步
    ///
    /// `switch_closed` 为射击限位开关状态；闭合时无论处于哪个阶段都立即结束。
    pub fn tick(&mut self, switch_closed: bool) -> ShootTick {
        if !self.is_active() {
            return ShootTick::IDLE;
        }

        if switch_closed {
            debug!(
                "Shoot cycle terminated by limit switch in phase {}",
                self.phase.as_str()
            );
            self.phase = ShootPhase::Idle;
            return ShootTick {
                command: 0.0,
                phase: ShootPhase::TerminatedBySwitch,
                completed: true,
            };
        }

        let elapsed = self.elapsed();
        let next = if elapsed < self.timing.forward {
            ShootPhase::ForwardPulse
        } else if elapsed < self.timing.total() {
            ShootPhase::ReversePulse
        } else {
            ShootPhase::Idle
        };

        if next != self.phase {
            debug!(
                "Shoot cycle {} -> {} after {:?}",
                self.phase.as_str(),
                next.as_str(),
                elapsed
            );
            self.phase = next;
        }

        match next {
            ShootPhase::ForwardPulse => ShootTick {
                command: FORWARD_COMMAND,
                phase: next,
                completed: false,
            },
            ShootPhase::ReversePulse => ShootTick {
                command: REVERSE_COMMAND,
                phase: next,
                completed: false,
            },
            _ => ShootTick {
                command: 0.0,
                phase: ShootPhase::Idle,
                completed: true,
            },
        }
    }

    /// 除 Idle 外均为活动
    pub fn is_active(&self) -> bool {
        self.phase != ShootPhase::Idle
    }

    pub fn phase(&self) -> ShootPhase {
        self.phase
    }

    /// 最近一次周期的起点
    pub fn start_time(&self) -> Option<Instant> {
        self.start_time
    }

    /// 自周期起点经过的时间（未开始过则为 0）
    pub fn elapsed(&self) -> Duration {
        match self.start_time {
            Some(start) => self.clock.now().saturating_duration_since(start),
            None => Duration::ZERO,
        }
    }
}

impl std::fmt::Debug for ShootSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShootSequencer")
            .field("timing", &self.timing)
            .field("phase", &self.phase)
            .field("start_time", &self.start_time)
            .finish()
    }
}
