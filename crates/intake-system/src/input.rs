//! 操作输入
//!
//! [`InputMethod`] 是输入映射层（手柄/摇杆 -> 逻辑意图）暴露给核心的能力集合。
//! 每个 tick 开始时用 [`InputSnapshot::sample`] 采样一次，之后的所有决策都基于同一份快照，
//! 同一 tick 内不会读到前后不一致的按键状态。

use std::sync::{Arc, Mutex, PoisonError};

/// 输入意图
pub trait InputMethod {
    /// 滚轮吸入
    fn intake(&self) -> bool;

    /// 滚轮吐出
    fn outake(&self) -> bool;

    /// 自动射击
    fn shoot(&self) -> bool;

    /// 手动正向点动拨杆
    fn turn_lever_forward(&self) -> bool;

    /// 手动反向点动拨杆
    fn turn_lever_reverse(&self) -> bool;

    /// 切换手臂速度缩放（按下沿触发）
    fn toggle_speed(&self) -> bool;

    /// 忽略 intake 限位开关联锁
    fn ignore_intake_limit_switch(&self) -> bool;

    /// 手臂速度，`[-1, 1]`
    fn move_intake(&self) -> f64;

    /// 中止进行中的射击周期
    fn abort_shoot(&self) -> bool {
        false
    }
}

/// 单个 tick 的输入快照
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputSnapshot {
    pub intake: bool,
    pub outake: bool,
    pub shoot: bool,
    pub lever_forward: bool,
    pub lever_reverse: bool,
    pub toggle_speed: bool,
    pub ignore_limit_switch: bool,
    pub move_intake: f64,
    pub abort_shoot: bool,
}

impl InputSnapshot {
    /// 采样一次输入
    ///
    /// `move_intake` 钳位到 `[-1, 1]`，`NaN` 视为 0。
    pub fn sample(input: &dyn InputMethod) -> Self {
        let move_intake = input.move_intake();
        Self {
            intake: input.intake(),
            outake: input.outake(),
            shoot: input.shoot(),
            lever_forward: input.turn_lever_forward(),
            lever_reverse: input.turn_lever_reverse(),
            toggle_speed: input.toggle_speed(),
            ignore_limit_switch: input.ignore_intake_limit_switch(),
            move_intake: if move_intake.is_nan() {
                0.0
            } else {
                move_intake.clamp(-1.0, 1.0)
            },
            abort_shoot: input.abort_shoot(),
        }
    }
}

impl InputMethod for InputSnapshot {
    fn intake(&self) -> bool {
        self.intake
    }

    fn outake(&self) -> bool {
        self.outake
    }

    fn shoot(&self) -> bool {
        self.shoot
    }

    fn turn_lever_forward(&self) -> bool {
        self.lever_forward
    }

    fn turn_lever_reverse(&self) -> bool {
        self.lever_reverse
    }

    fn toggle_speed(&self) -> bool {
        self.toggle_speed
    }

    fn ignore_intake_limit_switch(&self) -> bool {
        self.ignore_limit_switch
    }

    fn move_intake(&self) -> f64 {
        self.move_intake
    }

    fn abort_shoot(&self) -> bool {
        self.abort_shoot
    }
}

/// 可从外部修改的输入
///
/// 克隆共享同一份快照：一份交给 `IntakeSystem`，另一份留在测试或脚本执行器里改写。
#[derive(Debug, Clone, Default)]
pub struct SharedInput {
    inner: Arc<Mutex<InputSnapshot>>,
}

impl SharedInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// 整体替换
    pub fn set(&self, snapshot: InputSnapshot) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    /// 原地修改
    pub fn update(&self, f: impl FnOnce(&mut InputSnapshot)) {
        f(&mut self.inner.lock().unwrap_or_else(PoisonError::into_inner));
    }

    pub fn get(&self) -> InputSnapshot {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl InputMethod for SharedInput {
    fn intake(&self) -> bool {
        self.get().intake
    }

    fn outake(&self) -> bool {
        self.get().outake
    }

    fn shoot(&self) -> bool {
        self.get().shoot
    }

    fn turn_lever_forward(&self) -> bool {
        self.get().lever_forward
    }

    fn turn_lever_reverse(&self) -> bool {
        self.get().lever_reverse
    }

    fn toggle_speed(&self) -> bool {
        self.get().toggle_speed
    }

    fn ignore_intake_limit_switch(&self) -> bool {
        self.get().ignore_limit_switch
    }

    fn move_intake(&self) -> f64 {
        self.get().move_intake
    }

    fn abort_shoot(&self) -> bool {
        self.get().abort_shoot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct WildStick;

    impl InputMethod for WildStick {
        fn intake(&self) -> bool {
            true
        }
        fn outake(&self) -> bool {
            false
        }
        fn shoot(&self) -> bool {
            false
        }
        fn turn_lever_forward(&self) -> bool {
            false
        }
        fn turn_lever_reverse(&self) -> bool {
            true
        }
        fn toggle_speed(&self) -> bool {
            false
        }
        fn ignore_intake_limit_switch(&self) -> bool {
            false
        }
        fn move_intake(&self) -> f64 {
            3.0
        }
    }

    #[test]
    fn test_sample_clamps_axis_and_defaults_abort() {
        let snapshot = InputSnapshot::sample(&WildStick);
        assert!(snapshot.intake);
        assert!(snapshot.lever_reverse);
        assert_eq!(snapshot.move_intake, 1.0);
        assert!(!snapshot.abort_shoot);
    }

    #[test]
    fn test_sample_nan_axis() {
        let snapshot = InputSnapshot {
            move_intake: f64::NAN,
            ..Default::default()
        };
        assert_eq!(InputSnapshot::sample(&snapshot).move_intake, 0.0);
    }

    #[test]
    fn test_shared_input_clones_see_updates() {
        let input = SharedInput::new();
        let handle = input.clone();

        handle.update(|s| {
            s.shoot = true;
            s.move_intake = -0.5;
        });

        assert!(input.shoot());
        assert_eq!(input.move_intake(), -0.5);

        handle.set(InputSnapshot::default());
        assert!(!input.shoot());
    }
}
