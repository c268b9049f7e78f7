//! # Intake HAL
//!
//! 硬件抽象层，为 intake/shooter 机构提供统一的设备接口。
//!
//! 控制核心只需要以下能力：
//!
//! - 电机输出：`MotorOutput::set(value)`，值域 `[-1, 1]`
//! - 数字输入（限位开关）：`DigitalInput::get()`
//! - 正交编码器：计数、速率、距离，以及可反转的计数方向
//!
//! 所有句柄都实现 [`Releasable`]，并通过 [`Owned`] 保证"恰好释放一次"。
//! 具体后端通过 [`HardwareProvider`] 获取句柄；`mock` feature 提供内存后端。

mod channel;
mod error;
mod handle;
mod motor;
mod sensor;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use channel::{DioChannel, PwmChannel};
pub use error::HalError;
pub use handle::{Owned, Releasable};
pub use motor::{Duty, Motor};
pub use sensor::{Encoder, EncoderReading, LimitSwitch};

/// 电机输出设备
///
/// 只负责把占空比写到硬件；反转、钳位由 [`Motor`] 包装处理。
pub trait MotorOutput: Releasable {
    /// 写入原始输出（调用方保证值域 `[-1, 1]`）
    fn set(&mut self, value: f64);

    /// 设备所在的 PWM 通道
    fn channel(&self) -> PwmChannel;
}

/// 数字输入设备（限位开关）
pub trait DigitalInput: Releasable {
    /// 读取当前电平，`true` 表示开关闭合
    fn get(&self) -> bool;

    /// 设备所在的 DIO 通道
    fn channel(&self) -> DioChannel;
}

/// 正交编码器
///
/// 读取永不失败：传感器异常时由后端返回上一次值或默认值。
pub trait QuadratureEncoder: Releasable {
    /// 当前计数（已应用计数方向）
    fn count(&self) -> i64;

    /// 速率（distance / s）
    fn rate(&self) -> f64;

    /// 距离（count * distance_per_pulse）
    fn distance(&self) -> f64;

    /// 设置计数方向是否反转
    fn set_reverse_direction(&mut self, reverse: bool);

    /// 设置每个脉冲对应的距离
    fn set_distance_per_pulse(&mut self, distance_per_pulse: f64);

    /// 计数清零
    fn reset(&mut self);
}

/// 硬件句柄的获取入口
///
/// 每个通道只能被获取一次；重复获取返回 [`HalError::PwmChannelInUse`] / [`HalError::DioChannelInUse`]。
pub trait HardwareProvider {
    fn motor(&mut self, channel: PwmChannel) -> Result<Box<dyn MotorOutput>, HalError>;

    fn digital_input(&mut self, channel: DioChannel) -> Result<Box<dyn DigitalInput>, HalError>;

    fn encoder(
        &mut self,
        channel_a: DioChannel,
        channel_b: DioChannel,
    ) -> Result<Box<dyn QuadratureEncoder>, HalError>;
}
