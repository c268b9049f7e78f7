//! 手臂位置控制器
//!
//! 在编码器计数上包一层 PID，负责 POSITION_HOLD 的启用/停用和目标值。
//!
//! # 模式
//!
//! 每个 tick 恰好由一种模式决定手臂输出：
//!
//! - [`ArmMode::Manual`]：速度来自操作输入
//! - [`ArmMode::Hold`]：速度由 PID 朝目标计数计算
//!
//! 调用方每个 tick 通过 [`ArmPositionController::drive`] 得到一个 [`ArmDrive`]，
//! 再交给 [`ArmPositionController::compute_output`]。`ArmDrive` 总是由控制器
//! 自身的模式生成，不存在"布尔标志与 PID 实际状态不一致"的情况。
//!
//! # 积分复位
//!
//! 当编码器计数恰好等于目标计数时清空积分项，避免多次停靠之间积分累积。
//! 到达目标后控制器不会自动停用，由调用方决定何时 `disable()`。
//!
//! # 方向
//!
//! 目标和"是否到位"始终按原始编码器计数比较；方向只改变误差的符号，
//! 即输出朝哪个方向驱动电机。

use crate::controller::Controller;
use crate::error::ControlError;
use crate::pid::{PidController, PidGains};
use std::time::Duration;
use tracing::{debug, info};

/// 手臂控制模式（ArmControlMode）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArmMode {
    /// 手动：速度由输入决定
    #[default]
    Manual,

    /// 位置保持：PID 朝目标计数计算速度
    Hold { target: i64 },
}

/// 单个 tick 的手臂驱动请求
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArmDrive {
    /// 直接使用给定速度
    Manual(f64),

    /// 由 PID 朝目标计数计算
    Hold(i64),
}

/// 手臂位置控制器
#[derive(Debug, Clone)]
pub struct ArmPositionController {
    pid: PidController,
    mode: ArmMode,
    reversed: bool,
}

impl ArmPositionController {
    /// 创建控制器（初始为 Manual）
    ///
    /// `output_limit` 必须在 `(0, 1]`，`integral_limit` 必须非负。
    pub fn new(
        gains: PidGains,
        integral_limit: f64,
        output_limit: f64,
    ) -> Result<Self, ControlError> {
        if !(output_limit > 0.0 && output_limit <= 1.0) {
            return Err(ControlError::InvalidLimit {
                name: "output_limit",
                value: output_limit,
            });
        }
        if !integral_limit.is_finite() || integral_limit < 0.0 {
            return Err(ControlError::InvalidLimit {
                name: "integral_limit",
                value: integral_limit,
            });
        }

        let pid = PidController::new(0.0)
            .with_gains(gains)
            .with_integral_limit(integral_limit)
            .with_output_limit(output_limit);

        Ok(Self {
            pid,
            mode: ArmMode::Manual,
            reversed: false,
        })
    }

    /// 启用 POSITION_HOLD 并记录目标
    ///
    /// 从 Manual 进入或目标改变时清空 PID 状态；目标不变时为空操作。
    pub fn enable(&mut self, target: i64) {
        if self.mode == (ArmMode::Hold { target }) {
            return;
        }
        info!("Arm position hold enabled, target count {}", target);
        self.pid.reset();
        self.mode = ArmMode::Hold { target };
        self.sync_setpoint();
    }

    /// 启用 POSITION_HOLD，当前计数已在目标上时清空积分项
    ///
    /// 目标不变时同样生效。
    pub fn enable_at(&mut self, target: i64, count: i64) {
        self.enable(target);
        if count == target {
            self.pid.reset();
        }
    }

    /// 停用 POSITION_HOLD，控制权交还 Manual
    pub fn disable(&mut self) {
        if let ArmMode::Hold { target } = self.mode {
            info!("Arm position hold disabled (target was {})", target);
            self.pid.reset();
            self.mode = ArmMode::Manual;
        }
    }

    /// 设置编码器运动到位置误差的映射方向
    ///
    /// `reverse = true` 时误差取反（"朝机器人方向移动"）。方向改变时清空积分项。
    pub fn set_direction(&mut self, reverse: bool) {
        if self.reversed != reverse {
            debug!("Arm direction reversed: {}", reverse);
            self.reversed = reverse;
            self.pid.reset_integral();
            self.sync_setpoint();
        }
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.mode, ArmMode::Hold { .. })
    }

    pub fn mode(&self) -> ArmMode {
        self.mode
    }

    /// 当前目标计数（Manual 时为 `None`）
    pub fn target(&self) -> Option<i64> {
        match self.mode {
            ArmMode::Hold { target } => Some(target),
            ArmMode::Manual => None,
        }
    }

    /// 当前积分项
    pub fn integral(&self) -> f64 {
        self.pid.integral()
    }

    // PID 内部坐标：setpoint 和测量值同时取反，误差 = ±(target - count)
    fn signed(&self, count: i64) -> f64 {
        if self.reversed { -(count as f64) } else { count as f64 }
    }

    fn sync_setpoint(&mut self) {
        if let ArmMode::Hold { target } = self.mode {
            self.pid.set_setpoint(self.signed(target));
        }
    }

    /// 编码器计数是否已在目标上
    pub fn at_target(&self, count: i64) -> bool {
        self.target() == Some(count)
    }

    /// 清空积分项
    pub fn reset_integrator(&mut self) {
        self.pid.reset();
    }

    /// 计算一步 PID 输出
    ///
    /// Manual 模式下返回 0.0。
    pub fn tick(&mut self, count: i64, dt: Duration) -> f64 {
        let ArmMode::Hold { target } = self.mode else {
            return 0.0;
        };
        if count == target {
            self.pid.reset();
        }
        self.pid.tick(self.signed(count), dt)
    }

    /// 根据当前模式生成本 tick 的驱动请求
    pub fn drive(&self, manual_speed: f64) -> ArmDrive {
        match self.mode {
            ArmMode::Manual => ArmDrive::Manual(manual_speed),
            ArmMode::Hold { target } => ArmDrive::Hold(target),
        }
    }

    /// 计算手臂输出（每个 tick 调用一次）
    pub fn compute_output(&mut self, drive: ArmDrive, count: i64, dt: Duration) -> f64 {
        match drive {
            ArmDrive::Manual(speed) => speed,
            ArmDrive::Hold(target) => {
                self.enable(target);
                self.tick(count, dt)
            },
        }
    }

    /// 转发时间跳变（只重置微分项）
    pub fn on_time_jump(&mut self, dt: Duration) {
        self.pid.on_time_jump(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DT: Duration = Duration::from_millis(20);

    fn controller() -> ArmPositionController {
        ArmPositionController::new(PidGains::new(0.3, 0.1, 0.0).unwrap(), 10.0, 1.0).unwrap()
    }

    #[test]
    fn test_starts_in_manual() {
        let mut arm = controller();
        assert_eq!(arm.mode(), ArmMode::Manual);
        assert!(!arm.is_enabled());
        assert_eq!(arm.target(), None);
        assert_eq!(arm.tick(100, DT), 0.0);
    }

    #[test]
    fn test_invalid_limits_rejected() {
        let gains = PidGains::new(0.3, 0.1, 0.0).unwrap();
        assert!(ArmPositionController::new(gains, 10.0, 0.0).is_err());
        assert!(ArmPositionController::new(gains, 10.0, 1.5).is_err());
        assert!(ArmPositionController::new(gains, -1.0, 1.0).is_err());
    }

    #[test]
    fn test_enable_and_disable() {
        let mut arm = controller();
        arm.enable(50);
        assert_eq!(arm.mode(), ArmMode::Hold { target: 50 });

        arm.disable();
        assert_eq!(arm.mode(), ArmMode::Manual);
        assert_eq!(arm.integral(), 0.0);
    }

    #[test]
    fn test_hold_drives_toward_target() {
        let mut arm = controller();
        arm.enable(10);

        // 误差 = 2, P = 0.6, I = 0.1 * 0.04 = 0.004
        let output = arm.tick(8, DT);
        assert!((output - 0.604).abs() < 1e-9);

        // 超过目标后反向
        arm.reset_integrator();
        assert!(arm.tick(12, DT) < 0.0);
    }

    #[test]
    fn test_output_is_clamped() {
        let mut arm = controller();
        arm.enable(1000);
        assert_eq!(arm.tick(0, DT), 1.0);
        assert_eq!(arm.tick(5000, DT), -1.0);
    }

    #[test]
    fn test_reaching_target_resets_integrator() {
        let mut arm = controller();
        arm.enable(10);
        for _ in 0..5 {
            arm.tick(5, DT);
        }
        assert!(arm.integral() > 0.0);

        let output = arm.tick(10, DT);
        assert_eq!(output, 0.0);
        assert_eq!(arm.integral(), 0.0);
        // 到达目标不会自动停用
        assert!(arm.is_enabled());
    }

    #[test]
    fn test_reverse_direction_flips_error_sign() {
        let mut arm = controller();
        arm.set_direction(true);
        arm.enable(10);
        assert!(arm.is_reversed());

        assert!(arm.at_target(10));
        assert!(!arm.at_target(-10));
        assert_eq!(arm.tick(10, DT), 0.0);
        // 目标 10，计数 8：正向时输出为正，反向时为负
        assert!(arm.tick(8, DT) < 0.0);

        arm.set_direction(false);
        assert!(arm.tick(8, DT) > 0.0);
    }

    #[test]
    fn test_direction_change_while_holding_keeps_target() {
        let mut arm = controller();
        arm.enable(120);
        arm.set_direction(true);
        assert_eq!(arm.target(), Some(120));
        assert_eq!(arm.tick(120, DT), 0.0);
    }

    #[test]
    fn test_enable_at_resets_integrator_on_same_target() {
        let mut arm = controller();
        arm.enable(10);
        arm.tick(0, DT);
        assert!(arm.integral() > 0.0);

        // 目标不变但已在目标位置
        arm.enable_at(10, 10);
        assert_eq!(arm.integral(), 0.0);
        assert_eq!(arm.mode(), ArmMode::Hold { target: 10 });

        // 不在目标位置时目标不变则保持状态
        arm.tick(0, DT);
        let integral = arm.integral();
        arm.enable_at(10, 0);
        assert_eq!(arm.integral(), integral);
    }

    #[test]
    fn test_direction_change_clears_integral() {
        let mut arm = controller();
        arm.enable(10);
        arm.tick(0, DT);
        assert!(arm.integral() > 0.0);

        arm.set_direction(false);
        assert!(arm.integral() > 0.0);

        arm.set_direction(true);
        assert_eq!(arm.integral(), 0.0);
    }

    #[test]
    fn test_reenable_same_target_keeps_state() {
        let mut arm = controller();
        arm.enable(10);
        arm.tick(0, DT);
        let integral = arm.integral();

        arm.enable(10);
        assert_eq!(arm.integral(), integral);

        arm.enable(20);
        assert_eq!(arm.integral(), 0.0);
    }

    #[test]
    fn test_drive_follows_mode() {
        let mut arm = controller();
        assert_eq!(arm.drive(0.25), ArmDrive::Manual(0.25));
        assert_eq!(arm.compute_output(ArmDrive::Manual(0.25), 0, DT), 0.25);

        arm.enable(3);
        assert_eq!(arm.drive(0.25), ArmDrive::Hold(3));
        assert_eq!(arm.compute_output(ArmDrive::Hold(3), 3, DT), 0.0);
    }

    proptest! {
        /// 在当前位置启用保持，下一次 tick 输出为 0
        #[test]
        fn enable_at_current_position_holds_still(count in -100_000i64..100_000, reversed in any::<bool>()) {
            let mut arm = controller();
            arm.set_direction(reversed);
            // 先制造一些积分
            arm.enable(count + 37);
            arm.tick(count, DT);

            arm.enable(count);
            prop_assert_eq!(arm.tick(count, DT), 0.0);
            prop_assert_eq!(arm.integral(), 0.0);
        }

        /// 输出永远在 [-1, 1]
        #[test]
        fn output_is_bounded(target in -10_000i64..10_000, count in -10_000i64..10_000) {
            let mut arm = controller();
            arm.enable(target);
            for _ in 0..3 {
                let output = arm.tick(count, DT);
                prop_assert!((-1.0..=1.0).contains(&output));
            }
        }
    }
}
