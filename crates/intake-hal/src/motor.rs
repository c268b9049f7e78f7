//! 电机输出
//!
//! [`Duty`] 是有界占空比 `[-1, 1]`，[`Motor`] 在设备之上增加钳位和反转。

use crate::{MotorOutput, Owned, PwmChannel};
use tracing::trace;

/// 电机占空比（ActuatorCommand）
///
/// 构造时钳位到 `[-1.0, 1.0]`；`NaN` 视为 0。
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Duty(f64);

impl Duty {
    pub const ZERO: Duty = Duty(0.0);
    pub const FULL_FORWARD: Duty = Duty(1.0);
    pub const FULL_REVERSE: Duty = Duty(-1.0);

    /// 创建占空比（自动钳位）
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Duty::ZERO;
        }
        Duty(value.clamp(-1.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// 取反（用于反向安装的电机）
    pub fn inverted(self) -> Self {
        Duty(-self.0)
    }
}

impl From<f64> for Duty {
    fn from(value: f64) -> Self {
        Duty::new(value)
    }
}

/// 带钳位和反转的电机
///
/// 逻辑命令保存在 `last`；反转只影响写到设备的物理值，
/// 因此两侧手臂用同一个逻辑命令即可朝同一物理方向运动。
pub struct Motor {
    device: Owned<Box<dyn MotorOutput>>,
    inverted: bool,
    last: Duty,
}

impl Motor {
    /// 接管一个已获取的电机设备
    pub fn new(device: Box<dyn MotorOutput>, label: &'static str) -> Self {
        Self {
            device: Owned::new(device, label),
            inverted: false,
            last: Duty::ZERO,
        }
    }

    /// 设置是否反转
    pub fn set_inverted(&mut self, inverted: bool) {
        self.inverted = inverted;
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// 设置逻辑输出
    ///
    /// 句柄释放后写入被丢弃。
    pub fn set(&mut self, duty: impl Into<Duty>) {
        let duty = duty.into();
        self.last = duty;
        if self.device.is_released() {
            trace!("Dropping write to released motor {}", self.device.label());
            return;
        }
        let physical = if self.inverted { duty.inverted() } else { duty };
        self.device.get_mut().set(physical.value());
    }

    /// 最近一次的逻辑输出
    pub fn get(&self) -> Duty {
        self.last
    }

    pub fn channel(&self) -> PwmChannel {
        self.device.get().channel()
    }

    pub fn label(&self) -> &'static str {
        self.device.label()
    }

    /// 释放底层设备（恰好一次）
    pub fn release(&mut self) -> Result<(), crate::HalError> {
        self.device.release()
    }
}

impl std::fmt::Debug for Motor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Motor")
            .field("label", &self.device.label())
            .field("inverted", &self.inverted)
            .field("last", &self.last)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockHardware;
    use crate::HardwareProvider;
    use proptest::prelude::*;

    #[test]
    fn test_duty_clamp() {
        assert_eq!(Duty::new(1.5).value(), 1.0);
        assert_eq!(Duty::new(-3.0).value(), -1.0);
        assert_eq!(Duty::new(0.25).value(), 0.25);
        assert_eq!(Duty::new(f64::NAN), Duty::ZERO);
    }

    #[test]
    fn test_inverted_motor_writes_negated_value() {
        let mut hw = MockHardware::new();
        let mut motor = Motor::new(hw.motor(PwmChannel(2)).unwrap(), "right_arm");
        motor.set_inverted(true);

        motor.set(0.3);

        assert_eq!(motor.get().value(), 0.3);
        assert_eq!(hw.motor_output(PwmChannel(2)), Some(-0.3));
    }

    #[test]
    fn test_write_after_release_is_dropped() {
        let mut hw = MockHardware::new();
        let mut motor = Motor::new(hw.motor(PwmChannel(0)).unwrap(), "wheels");
        motor.set(0.5);
        motor.release().unwrap();
        motor.set(1.0);

        assert_eq!(hw.motor_output(PwmChannel(0)), Some(0.5));
        assert_eq!(hw.pwm_release_count(PwmChannel(0)), 1);
    }

    proptest! {
        /// 任意输入都落在 [-1, 1]
        #[test]
        fn duty_is_bounded(v in -1e6..1e6f64) {
            let d = Duty::new(v).value();
            prop_assert!((-1.0..=1.0).contains(&d));
        }
    }
}
