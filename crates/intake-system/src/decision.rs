//! 每个 tick 的纯决策函数
//!
//! 这里的函数不接触硬件，也不读时钟：输入一份 [`InputSnapshot`]（以及必要的传感器值），
//! 返回命令。`IntakeSystem::tick` 按固定顺序调用它们，因此每一步都可以单独测试。

use crate::input::InputSnapshot;
use tracing::debug;

/// 滚轮吸入方向输出
pub const ROLLER_INTAKE: f64 = 1.0;

/// 滚轮吐出方向输出
pub const ROLLER_OUTAKE: f64 = -1.0;

/// 滚轮仲裁
///
/// 只有 intake 与 outake 恰好一个为真时输出非零；同时按下视为冲突，输出 0。
pub fn roller_command(input: &InputSnapshot) -> f64 {
    match (input.intake, input.outake) {
        (true, false) => ROLLER_INTAKE,
        (false, true) => ROLLER_OUTAKE,
        _ => 0.0,
    }
}

/// 跨 tick 保留的操作状态（OrchestratorState）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntakeState {
    /// 是否关闭手臂速度缩放
    pub speed_multiplier_disabled: bool,
    /// 上一个 tick 的切换按键电平
    pub prev_speed_toggle: bool,
}

impl IntakeState {
    /// 用本 tick 的切换按键电平推进状态
    ///
    /// 只在上升沿（本 tick 为真、上 tick 为假）翻转，按住不放只翻转一次。
    /// 返回本 tick 是否发生了翻转。
    pub fn advance(&mut self, toggle: bool) -> bool {
        let rising = toggle && !self.prev_speed_toggle;
        self.prev_speed_toggle = toggle;
        if rising {
            self.speed_multiplier_disabled = !self.speed_multiplier_disabled;
            debug!(
                "Arm speed multiplier {}",
                if self.speed_multiplier_disabled {
                    "disabled"
                } else {
                    "enabled"
                }
            );
        }
        rising
    }
}

/// 手臂速度请求
///
/// 缩放未关闭时乘以 `multiplier`（默认 ARM_SPEED = 0.3）。
pub fn scale_arm_speed(raw: f64, multiplier_disabled: bool, multiplier: f64) -> f64 {
    if multiplier_disabled {
        raw
    } else {
        raw * multiplier
    }
}

/// 拨杆仲裁结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LeverDecision {
    /// 开始一个自动射击周期
    StartShoot,
    /// 手动点动（输出给定速度，同时关闭自动射击）
    Jog(f64),
    /// 无自动射击时输出 0
    Stop,
    /// 不改变任何东西（自动射击进行中，由射击状态机决定输出）
    Continue,
}

/// 射击/点动仲裁
///
/// 按输入优先级互斥：
///
/// 1. 射击意图、无点动意图、且当前没有射击周期 -> [`LeverDecision::StartShoot`]
/// 2. 只有正向点动且无射击意图 -> `Jog(+jog_speed)`
/// 3. 只有反向点动且无射击意图 -> `Jog(-jog_speed)`
/// 4. 没有射击周期 -> [`LeverDecision::Stop`]
/// 5. 否则 -> [`LeverDecision::Continue`]
pub fn arbitrate_lever(input: &InputSnapshot, shooting: bool, jog_speed: f64) -> LeverDecision {
    let jogging = input.lever_forward || input.lever_reverse;
    if input.shoot && !jogging && !shooting {
        LeverDecision::StartShoot
    } else if input.lever_forward && !input.lever_reverse && !input.shoot {
        LeverDecision::Jog(jog_speed)
    } else if input.lever_reverse && !input.lever_forward && !input.shoot {
        LeverDecision::Jog(-jog_speed)
    } else if !shooting {
        LeverDecision::Stop
    } else {
        LeverDecision::Continue
    }
}

/// 安全联锁
///
/// 任一 intake 限位开关闭合、请求速度为负、且未被覆盖时，速度钳为 0。
/// 非负速度永远不受影响。
pub fn apply_interlock(speed: f64, switch_closed: bool, override_interlock: bool) -> f64 {
    if switch_closed && speed < 0.0 && !override_interlock {
        0.0
    } else {
        speed
    }
}
