//! # Intake 配置
//!
//! 通道映射（robot map）和可调常数。只在初始化时读取，运行期不可修改。
//!
//! ```toml
//! [channels]
//! wheels = 0
//! left_arm = 1
//! right_arm = 2
//! lever = 3
//!
//! [arm]
//! kp = 0.3
//! ki = 0.1
//! kd = 0.0
//! speed_multiplier = 0.3
//!
//! [lever]
//! forward_ms = 250
//! backward_ms = 233
//! ```

use intake_hal::{DioChannel, PwmChannel};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// 手动操作时手臂速度的缩放系数
pub const ARM_SPEED: f64 = 0.3;

/// 射击周期：正向脉冲时长（ms）
pub const FORWARD_LEVER_TIME_MS: u64 = 250;

/// 射击周期：反向脉冲时长（ms）
pub const BACKWARDS_LEVER_TIME_MS: u64 = 233;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// 配置值非法（初始化时致命）
    #[error("Invalid config `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// 完整配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// 通道映射
    pub channels: ChannelMap,

    /// 手臂控制参数
    pub arm: ArmConfig,

    /// 拨杆（射击）参数
    pub lever: LeverConfig,

    /// 控制循环参数
    pub control_loop: LoopSettings,
}

/// 通道映射
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMap {
    /// 滚轮电机
    pub wheels: PwmChannel,
    /// 左臂电机
    pub left_arm: PwmChannel,
    /// 右臂电机（反向安装）
    pub right_arm: PwmChannel,
    /// 拨杆电机
    pub lever: PwmChannel,
    /// 射击行程末端限位开关
    pub shooting_limit_switch: DioChannel,
    /// 左侧 intake 限位开关
    pub left_intake_limit_switch: DioChannel,
    /// 右侧 intake 限位开关
    pub right_intake_limit_switch: DioChannel,
    /// 手臂编码器 A 相
    pub encoder_a: DioChannel,
    /// 手臂编码器 B 相
    pub encoder_b: DioChannel,
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self {
            wheels: PwmChannel(0),
            left_arm: PwmChannel(1),
            right_arm: PwmChannel(2),
            lever: PwmChannel(3),
            shooting_limit_switch: DioChannel(0),
            left_intake_limit_switch: DioChannel(1),
            right_intake_limit_switch: DioChannel(2),
            encoder_a: DioChannel(3),
            encoder_b: DioChannel(4),
        }
    }
}

/// 手臂参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmConfig {
    /// 比例增益
    pub kp: f64,
    /// 积分增益
    pub ki: f64,
    /// 微分增益
    pub kd: f64,
    /// 积分项限制（防止积分饱和）
    pub integral_limit: f64,
    /// PID 输出限制，`(0, 1]`
    pub output_limit: f64,
    /// 手动速度缩放系数，`(0, 1]`
    pub speed_multiplier: f64,
    /// 编码器初始计数方向
    pub reverse_encoder: bool,
    /// 每个脉冲对应的距离
    pub distance_per_pulse: f64,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            kp: 0.3,
            ki: 0.1,
            kd: 0.0,
            integral_limit: 10.0,
            output_limit: 1.0,
            speed_multiplier: ARM_SPEED,
            reverse_encoder: false,
            distance_per_pulse: 1.0,
        }
    }
}

/// 拨杆参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeverConfig {
    /// 正向脉冲时长（ms）
    pub forward_ms: u64,
    /// 反向脉冲时长（ms）
    pub backward_ms: u64,
    /// 手动点动速度，`(0, 1]`
    pub jog_speed: f64,
}

impl Default for LeverConfig {
    fn default() -> Self {
        Self {
            forward_ms: FORWARD_LEVER_TIME_MS,
            backward_ms: BACKWARDS_LEVER_TIME_MS,
            jog_speed: 0.5,
        }
    }
}

impl LeverConfig {
    pub fn forward_time(&self) -> Duration {
        Duration::from_millis(self.forward_ms)
    }

    pub fn backward_time(&self) -> Duration {
        Duration::from_millis(self.backward_ms)
    }
}

/// 控制循环参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopSettings {
    /// 标称周期（ms）
    pub period_ms: u64,
    /// dt 钳位倍数：实际 dt 超过 `period * multiplier` 视为时间跳变
    pub dt_clamp_multiplier: f64,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            period_ms: 20,
            dt_clamp_multiplier: 2.0,
        }
    }
}

impl LoopSettings {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// 允许的最大 dt
    pub fn max_dt(&self) -> Duration {
        self.period().mul_f64(self.dt_clamp_multiplier)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.period_ms == 0 {
            return Err(ConfigError::invalid("control_loop.period_ms", "must be > 0"));
        }
        if !self.dt_clamp_multiplier.is_finite() || self.dt_clamp_multiplier < 1.0 {
            return Err(ConfigError::invalid(
                "control_loop.dt_clamp_multiplier",
                format!("must be finite and >= 1, got {}", self.dt_clamp_multiplier),
            ));
        }
        Ok(())
    }
}

impl IntakeConfig {
    /// 从 TOML 字符串解析（不做校验）
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// 序列化为 TOML 字符串
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 从文件加载并校验
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        config.validate()?;
        debug!("Loaded intake config from {}", path.display());
        Ok(config)
    }

    /// 保存到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        fs::write(path, self.to_toml_string()?)?;
        debug!("Saved intake config to {}", path.display());
        Ok(())
    }

    /// 校验配置
    ///
    /// 任何一项不合法都会使初始化失败。
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.channels.validate()?;
        self.arm.validate()?;
        self.lever.validate()?;
        self.control_loop.validate()
    }
}

impl ChannelMap {
    fn validate(&self) -> Result<(), ConfigError> {
        let pwm = [
            ("channels.wheels", self.wheels),
            ("channels.left_arm", self.left_arm),
            ("channels.right_arm", self.right_arm),
            ("channels.lever", self.lever),
        ];
        let mut seen = HashSet::new();
        for (field, channel) in pwm {
            if !channel.is_valid() {
                return Err(ConfigError::invalid(field, format!("{channel} out of range")));
            }
            if !seen.insert(channel) {
                return Err(ConfigError::invalid(field, format!("{channel} assigned twice")));
            }
        }

        let dio = [
            ("channels.shooting_limit_switch", self.shooting_limit_switch),
            ("channels.left_intake_limit_switch", self.left_intake_limit_switch),
            ("channels.right_intake_limit_switch", self.right_intake_limit_switch),
            ("channels.encoder_a", self.encoder_a),
            ("channels.encoder_b", self.encoder_b),
        ];
        let mut seen = HashSet::new();
        for (field, channel) in dio {
            if !channel.is_valid() {
                return Err(ConfigError::invalid(field, format!("{channel} out of range")));
            }
            if !seen.insert(channel) {
                return Err(ConfigError::invalid(field, format!("{channel} assigned twice")));
            }
        }
        Ok(())
    }
}

impl ArmConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, gain) in [("arm.kp", self.kp), ("arm.ki", self.ki), ("arm.kd", self.kd)] {
            if !gain.is_finite() || gain < 0.0 {
                return Err(ConfigError::invalid(
                    field,
                    format!("gain must be finite and >= 0, got {gain}"),
                ));
            }
        }
        if !self.integral_limit.is_finite() || self.integral_limit < 0.0 {
            return Err(ConfigError::invalid(
                "arm.integral_limit",
                format!("must be finite and >= 0, got {}", self.integral_limit),
            ));
        }
        if !(self.output_limit > 0.0 && self.output_limit <= 1.0) {
            return Err(ConfigError::invalid(
                "arm.output_limit",
                format!("must be in (0, 1], got {}", self.output_limit),
            ));
        }
        if !(self.speed_multiplier > 0.0 && self.speed_multiplier <= 1.0) {
            return Err(ConfigError::invalid(
                "arm.speed_multiplier",
                format!("must be in (0, 1], got {}", self.speed_multiplier),
            ));
        }
        if !self.distance_per_pulse.is_finite() || self.distance_per_pulse == 0.0 {
            return Err(ConfigError::invalid(
                "arm.distance_per_pulse",
                format!("must be finite and non-zero, got {}", self.distance_per_pulse),
            ));
        }
        Ok(())
    }
}

impl LeverConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.forward_ms == 0 {
            return Err(ConfigError::invalid("lever.forward_ms", "must be > 0"));
        }
        if !(self.jog_speed > 0.0 && self.jog_speed <= 1.0) {
            return Err(ConfigError::invalid(
                "lever.jog_speed",
                format!("must be in (0, 1], got {}", self.jog_speed),
            ));
        }
        Ok(())
    }
}
