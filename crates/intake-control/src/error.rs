//! 控制层错误类型定义

use thiserror::Error;

/// 控制层错误类型
///
/// 只在构造期出现；`tick()` 本身不会失败。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    /// PID 增益非法
    #[error("Invalid PID gain {name}: {value} (must be finite and >= 0)")]
    InvalidGain { name: &'static str, value: f64 },

    /// 限幅参数非法
    #[error("Invalid limit {name}: {value}")]
    InvalidLimit { name: &'static str, value: f64 },

    /// 射击计时非法
    #[error("Invalid shoot timing: {0}")]
    InvalidTiming(String),
}
