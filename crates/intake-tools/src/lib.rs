//! # Intake Tools - 共享配置和遥测
//!
//! **依赖原则**: 只依赖 `intake-hal`，不依赖控制层和系统层
//!
//! ## 包含模块
//!
//! - `config` - 通道映射与可调常数（TOML）
//! - `telemetry` - 遥测 sink（非阻塞）

pub mod config;
pub mod telemetry;

// 重新导出常用类型
pub use config::{
    ARM_SPEED, ArmConfig, BACKWARDS_LEVER_TIME_MS, ChannelMap, ConfigError,
    FORWARD_LEVER_TIME_MS, IntakeConfig, LeverConfig, LoopSettings,
};
pub use telemetry::{
    ARM_DISTANCE_KEY, ARM_RATE_KEY, ChannelTelemetry, NullTelemetry, RecordingTelemetry,
    TelemetryError, TelemetrySample, TelemetrySink,
};
