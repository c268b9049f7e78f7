//! 通道号定义
//!
//! PWM 通道驱动电机控制器，DIO 通道读取限位开关和编码器。

use std::fmt;

/// 控制器上可用的通道数量（PWM 与 DIO 各 10 路）
pub const CHANNEL_COUNT: u8 = 10;

/// PWM 输出通道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct PwmChannel(pub u8);

/// 数字 IO 通道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct DioChannel(pub u8);

impl PwmChannel {
    /// 通道号是否在硬件范围内
    pub fn is_valid(self) -> bool {
        self.0 < CHANNEL_COUNT
    }
}

impl DioChannel {
    /// 通道号是否在硬件范围内
    pub fn is_valid(self) -> bool {
        self.0 < CHANNEL_COUNT
    }
}

impl fmt::Display for PwmChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PWM{}", self.0)
    }
}

impl fmt::Display for DioChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DIO{}", self.0)
    }
}
