//! 硬件层错误类型定义

use crate::{DioChannel, PwmChannel};
use thiserror::Error;

/// 硬件层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HalError {
    /// PWM 通道超出范围
    #[error("Invalid PWM channel: {0}")]
    InvalidPwmChannel(PwmChannel),

    /// DIO 通道超出范围
    #[error("Invalid DIO channel: {0}")]
    InvalidDioChannel(DioChannel),

    /// PWM 通道已被占用
    #[error("PWM channel already in use: {0}")]
    PwmChannelInUse(PwmChannel),

    /// DIO 通道已被占用
    #[error("DIO channel already in use: {0}")]
    DioChannelInUse(DioChannel),

    /// 设备故障（后端报告）
    #[error("Device error: {0}")]
    Device(String),
}
