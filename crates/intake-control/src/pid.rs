//! PID Controller - 比例-积分-微分控制器
//!
//! 手臂位置闭环使用的标量 PID。
//!
//! # 算法
//!
//! ```text
//! output = Kp * e + Ki * ∫e dt + Kd * de/dt
//! ```
//!
//! 其中：
//! - `e` = 目标计数 - 当前计数（误差）
//! - `∫e dt` = 累积误差（积分项）
//! - `de/dt` = 误差变化率（微分项）
//!
//! # 特性
//!
//! - **积分饱和保护**: 限制积分项累积，防止积分饱和（Integral Windup）
//! - **时间跳变处理**: `on_time_jump` 只重置微分项，保留积分项
//! - **输出钳位**: 输出限制在 `[-output_limit, output_limit]`
//!
//! # 示例
//!
//! ```rust
//! use intake_control::{Controller, PidController, PidGains};
//! use std::time::Duration;
//!
//! let gains = PidGains::new(0.3, 0.1, 0.0).unwrap();
//! let mut pid = PidController::new(120.0).with_gains(gains).with_output_limit(1.0);
//!
//! let output = pid.tick(100.0, Duration::from_millis(20));
//! assert!(output <= 1.0);
//! ```

use crate::controller::Controller;
use crate::error::ControlError;
use std::time::Duration;

/// PID 增益
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl PidGains {
    /// 创建并校验增益
    ///
    /// 增益必须是有限的非负数。
    pub fn new(kp: f64, ki: f64, kd: f64) -> Result<Self, ControlError> {
        for (name, value) in [("kp", kp), ("ki", ki), ("kd", kd)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ControlError::InvalidGain { name, value });
            }
        }
        Ok(Self { kp, ki, kd })
    }
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
        }
    }
}

/// PID 控制器
#[derive(Debug, Clone)]
pub struct PidController {
    /// 目标值
    setpoint: f64,

    gains: PidGains,

    /// 积分项累积值
    integral: f64,

    /// 上一次的误差（用于计算微分）
    last_error: f64,

    /// 积分项限制（防止积分饱和）
    integral_limit: f64,

    /// 输出限制
    output_limit: f64,
}

impl PidController {
    /// 创建新的 PID 控制器
    ///
    /// # 默认参数
    ///
    /// - Kp = 0.0, Ki = 0.0, Kd = 0.0（需要手动设置）
    /// - 积分限制 = 10.0
    /// - 输出限制 = 1.0
    pub fn new(setpoint: f64) -> Self {
        PidController {
            setpoint,
            gains: PidGains::default(),
            integral: 0.0,
            last_error: 0.0,
            integral_limit: 10.0,
            output_limit: 1.0,
        }
    }

    /// 设置 PID 增益
    pub fn with_gains(mut self, gains: PidGains) -> Self {
        self.gains = gains;
        self
    }

    /// 设置积分项限制
    pub fn with_integral_limit(mut self, limit: f64) -> Self {
        self.integral_limit = limit;
        self
    }

    /// 设置输出限制
    pub fn with_output_limit(mut self, limit: f64) -> Self {
        self.output_limit = limit;
        self
    }

    /// 更新目标值
    pub fn set_setpoint(&mut self, setpoint: f64) {
        self.setpoint = setpoint;
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    /// 当前积分项（用于调试和监控）
    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// 只清零积分项
    pub fn reset_integral(&mut self) {
        self.integral = 0.0;
    }
}

impl Controller for PidController {
    fn tick(&mut self, measurement: f64, dt: Duration) -> f64 {
        let dt_sec = dt.as_secs_f64();

        // 防止除零
        if dt_sec <= 0.0 {
            tracing::warn!(
                "PID controller received zero dt: {:?}, returning zero output",
                dt
            );
            return 0.0;
        }

        // 1. 误差
        let error = self.setpoint - measurement;

        // 2. 比例项（P）
        let p_term = self.gains.kp * error;

        // 3. 积分项（I）+ 饱和保护
        self.integral =
            (self.integral + error * dt_sec).clamp(-self.integral_limit, self.integral_limit);
        let i_term = self.gains.ki * self.integral;

        // 4. 微分项（D）
        let d_term = self.gains.kd * (error - self.last_error) / dt_sec;

        self.last_error = error;

        // 5. 钳位输出
        (p_term + i_term + d_term).clamp(-self.output_limit, self.output_limit)
    }

    fn on_time_jump(&mut self, dt: Duration) {
        tracing::warn!(
            "PID controller detected time jump: {:?}, resetting derivative term only",
            dt
        );
        self.last_error = 0.0;
    }

    fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gains(kp: f64, ki: f64, kd: f64) -> PidGains {
        PidGains::new(kp, ki, kd).unwrap()
    }

    #[test]
    fn test_pid_new() {
        let pid = PidController::new(1.0);
        assert_eq!(pid.gains(), PidGains::default());
        assert_eq!(pid.integral_limit, 10.0);
        assert_eq!(pid.output_limit, 1.0);
    }

    #[test]
    fn test_gains_validation() {
        assert!(PidGains::new(0.3, 0.1, 0.0).is_ok());
        assert_eq!(
            PidGains::new(-0.3, 0.1, 0.0),
            Err(ControlError::InvalidGain {
                name: "kp",
                value: -0.3
            })
        );
        assert!(PidGains::new(0.3, f64::INFINITY, 0.0).is_err());
        assert!(PidGains::new(0.3, 0.1, f64::NAN).is_err());
    }

    #[test]
    fn test_pid_proportional_only() {
        let mut pid = PidController::new(1.0)
            .with_gains(gains(10.0, 0.0, 0.0))
            .with_output_limit(100.0);

        let output = pid.tick(0.5, Duration::from_millis(10));

        // 误差 = 0.5, 输出 = 10.0 * 0.5 = 5.0
        assert!((output - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_pid_integral_accumulation() {
        let mut pid = PidController::new(1.0).with_gains(gains(0.0, 1.0, 0.0));
        let dt = Duration::from_millis(100);

        // 误差 = 0.5, 积分 = 0.05
        let output1 = pid.tick(0.5, dt);
        assert!((output1 - 0.05).abs() < 1e-10);

        // 积分 = 0.1
        let output2 = pid.tick(0.5, dt);
        assert!((output2 - 0.1).abs() < 1e-10);
    }

    #[test]
    fn test_pid_integral_saturation() {
        let mut pid = PidController::new(1.0)
            .with_gains(gains(0.0, 1.0, 0.0))
            .with_integral_limit(0.5);

        for _ in 0..10 {
            pid.tick(0.0, Duration::from_secs(1));
        }

        assert!((pid.integral() - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_pid_derivative_term() {
        let mut pid = PidController::new(1.0)
            .with_gains(gains(0.0, 0.0, 1.0))
            .with_output_limit(100.0);
        let dt = Duration::from_millis(100);

        // 误差从 0 变为 0.5, 变化率 = 5.0
        let output1 = pid.tick(0.5, dt);
        assert!((output1 - 5.0).abs() < 1e-10);

        // 误差不变, 输出 = 0
        let output2 = pid.tick(0.5, dt);
        assert!(output2.abs() < 1e-10);
    }

    #[test]
    fn test_pid_output_clamping() {
        let mut pid = PidController::new(100.0).with_gains(gains(0.3, 0.0, 0.0));

        // 理论输出 = 30.0，被钳位到 1.0
        assert_eq!(pid.tick(0.0, Duration::from_millis(20)), 1.0);
        assert_eq!(pid.tick(200.0, Duration::from_millis(20)), -1.0);
    }

    #[test]
    fn test_pid_on_time_jump_preserves_integral() {
        let mut pid = PidController::new(1.0).with_gains(gains(0.0, 1.0, 1.0));
        pid.tick(0.5, Duration::from_secs(1));
        let integral_before = pid.integral();
        assert!(integral_before > 0.0);

        pid.on_time_jump(Duration::from_secs(10));

        assert_eq!(pid.integral(), integral_before);
        assert_eq!(pid.last_error, 0.0);
    }

    #[test]
    fn test_pid_reset() {
        let mut pid = PidController::new(1.0).with_gains(gains(1.0, 1.0, 1.0));
        pid.tick(0.5, Duration::from_secs(1));
        assert!(pid.integral() != 0.0);

        pid.reset();

        assert_eq!(pid.integral(), 0.0);
        assert_eq!(pid.last_error, 0.0);
    }

    #[test]
    fn test_pid_zero_dt() {
        let mut pid = PidController::new(1.0).with_gains(gains(10.0, 1.0, 1.0));
        assert_eq!(pid.tick(0.5, Duration::ZERO), 0.0);
    }
}
