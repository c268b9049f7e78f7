//! # Intake Control
//!
//! intake/shooter 机构的两个控制行为：
//!
//! - [`ArmPositionController`]：编码器位置 PID（POSITION_HOLD）
//! - [`ShootSequencer`]：定时、可被限位开关提前终止的射击周期
//!
//! 两者都不接触硬件：调用方在每个 tick 传入传感器读数，拿回输出命令。

pub mod arm;
pub mod clock;
pub mod controller;
mod error;
pub mod pid;
pub mod shoot;

pub use arm::{ArmDrive, ArmMode, ArmPositionController};
pub use clock::{Clock, ManualClock, MonotonicClock, SharedClock};
pub use controller::Controller;
pub use error::ControlError;
pub use pid::{PidController, PidGains};
pub use shoot::{ShootPhase, ShootSequencer, ShootTick, ShootTiming};
