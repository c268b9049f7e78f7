//! # Intake System
//!
//! intake/shooter 子系统的编排层：把操作输入、硬件句柄、手臂 PID 和射击状态机
//! 组合成一个每个 tick 调用一次的 [`IntakeSystem::tick`]。
//!
//! ## 快速开始
//!
//! ```
//! use intake_system::{Environment, IntakeSystem, SharedInput};
//! use intake_control::ManualClock;
//! use intake_hal::mock::MockHardware;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), intake_system::IntakeError> {
//! let input = SharedInput::new();
//! let env = Environment::new(MockHardware::new())
//!     .with_input(input.clone())
//!     .with_clock(Arc::new(ManualClock::new()));
//! let mut system = IntakeSystem::init(env)?;
//!
//! input.update(|s| s.intake = true);
//! let output = system.tick();
//! assert_eq!(output.roller, 1.0);
//!
//! system.destroy()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## 模块
//!
//! - `input` - 输入意图与每 tick 快照
//! - `decision` - 纯决策函数（滚轮、切换沿、拨杆仲裁、联锁）
//! - `environment` - 初始化所需的协作者
//! - `system` - `IntakeSystem` 生命周期与 tick
//! - `runner` - 固定频率循环

pub mod decision;
pub mod environment;
mod error;
pub mod input;
pub mod runner;
pub mod system;

pub use decision::{IntakeState, LeverDecision};
pub use environment::Environment;
pub use error::IntakeError;
pub use input::{InputMethod, InputSnapshot, SharedInput};
pub use runner::{LoopConfig, run_loop};
pub use system::{IntakeSystem, TickOutput};
