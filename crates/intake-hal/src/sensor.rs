//! 传感器包装：限位开关和编码器

use crate::{DigitalInput, HalError, Owned, QuadratureEncoder};

/// 限位开关
pub struct LimitSwitch {
    input: Owned<Box<dyn DigitalInput>>,
}

impl LimitSwitch {
    pub fn new(input: Box<dyn DigitalInput>, label: &'static str) -> Self {
        Self {
            input: Owned::new(input, label),
        }
    }

    /// 开关是否闭合
    ///
    /// 句柄释放后恒为 `false`。
    pub fn is_closed(&self) -> bool {
        !self.input.is_released() && self.input.get().get()
    }

    pub fn label(&self) -> &'static str {
        self.input.label()
    }

    pub fn release(&mut self) -> Result<(), HalError> {
        self.input.release()
    }
}

/// 编码器读数快照（EncoderState）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EncoderReading {
    /// 计数（已应用计数方向）
    pub count: i64,
    /// 速率
    pub rate: f64,
    /// 距离
    pub distance: f64,
}

/// 手臂编码器
pub struct Encoder {
    device: Owned<Box<dyn QuadratureEncoder>>,
}

impl Encoder {
    pub fn new(device: Box<dyn QuadratureEncoder>, label: &'static str) -> Self {
        Self {
            device: Owned::new(device, label),
        }
    }

    /// 读取一次快照
    ///
    /// 句柄释放后返回默认值。
    pub fn read(&self) -> EncoderReading {
        if self.device.is_released() {
            return EncoderReading::default();
        }
        let device = self.device.get();
        EncoderReading {
            count: device.count(),
            rate: device.rate(),
            distance: device.distance(),
        }
    }

    pub fn count(&self) -> i64 {
        self.read().count
    }

    /// 设置计数方向（由设备保存）
    pub fn set_reverse_direction(&mut self, reverse: bool) {
        if !self.device.is_released() {
            self.device.get_mut().set_reverse_direction(reverse);
        }
    }

    pub fn set_distance_per_pulse(&mut self, distance_per_pulse: f64) {
        if !self.device.is_released() {
            self.device.get_mut().set_distance_per_pulse(distance_per_pulse);
        }
    }

    /// 计数清零
    pub fn reset(&mut self) {
        if !self.device.is_released() {
            self.device.get_mut().reset();
        }
    }

    pub fn release(&mut self) -> Result<(), HalError> {
        self.device.release()
    }
}
