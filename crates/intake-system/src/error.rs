//! 系统层错误类型定义

use intake_control::ControlError;
use intake_hal::HalError;
use intake_tools::ConfigError;
use thiserror::Error;

/// 系统层错误类型
///
/// 只在初始化、拆除和循环参数校验时出现；`tick()` 本身不会失败。
#[derive(Error, Debug)]
pub enum IntakeError {
    /// 配置不合法（通道映射、增益等）
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// 控制器参数不合法
    #[error("Control error: {0}")]
    Control(#[from] ControlError),

    /// 硬件句柄获取或释放失败
    #[error("Hardware error: {0}")]
    Hal(#[from] HalError),

    /// 循环参数不合法
    #[error("Invalid loop config: {0}")]
    InvalidLoopConfig(String),
}
