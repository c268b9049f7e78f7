//! IntakeSystem：每个 tick 的编排入口
//!
//! # 生命周期
//!
//! ```text
//! init(env) ──> tick() ──> tick() ──> ... ──> destroy()
//! ```
//!
//! - `init` 先校验配置，再按固定顺序获取全部硬件句柄；任一步失败时，
//!   已获取的句柄随局部变量 drop 而释放，不存在"半初始化"的实例。
//! - `tick` 不会失败，也不会阻塞。
//! - `destroy` 停止所有电机，每个句柄恰好释放一次。
//!
//! # Tick 顺序
//!
//! 1. 滚轮仲裁
//! 2. 速度缩放切换（上升沿）
//! 3. 手臂速度请求
//! 4. 射击/点动仲裁，射击状态机推进
//! 5. 手臂输出（PID 覆盖）+ 安全联锁
//! 6. 驱动手臂电机
//! 7. 发布遥测（失败只记日志）

use crate::decision::{
    IntakeState, LeverDecision, apply_interlock, arbitrate_lever, roller_command, scale_arm_speed,
};
use crate::environment::Environment;
use crate::error::IntakeError;
use crate::input::{InputMethod, InputSnapshot};
use intake_control::{
    ArmMode, ArmPositionController, PidGains, SharedClock, ShootPhase, ShootSequencer, ShootTiming,
};
use intake_hal::{Encoder, EncoderReading, LimitSwitch, Motor};
use intake_tools::{ARM_DISTANCE_KEY, ARM_RATE_KEY, IntakeConfig, TelemetrySink};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// 单个 tick 的输出
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutput {
    /// 滚轮命令
    pub roller: f64,
    /// 手臂命令（逻辑值，右臂的物理反转由电机处理）
    pub arm: f64,
    /// 拨杆命令
    pub lever: f64,
    /// 手臂模式
    pub arm_mode: ArmMode,
    /// 射击阶段（`TerminatedBySwitch` 只在结束的那个 tick 出现）
    pub shoot_phase: ShootPhase,
    /// 本 tick 结束时速度缩放是否关闭
    pub speed_multiplier_disabled: bool,
}

/// intake/shooter 子系统
pub struct IntakeSystem {
    wheels: Motor,
    left_arm: Motor,
    right_arm: Motor,
    lever: Motor,
    shooting_switch: LimitSwitch,
    left_switch: LimitSwitch,
    right_switch: LimitSwitch,
    encoder: Encoder,

    arm: ArmPositionController,
    shooter: ShootSequencer,
    state: IntakeState,
    interlock_engaged: bool,

    input: Box<dyn InputMethod>,
    telemetry: Box<dyn TelemetrySink>,
    clock: SharedClock,
    config: IntakeConfig,

    period: Duration,
    max_dt: Duration,
    last_tick: Option<Instant>,
    ticks: u64,
}

impl IntakeSystem {
    /// 初始化子系统
    ///
    /// 配置不合法或任一句柄获取失败时返回错误，已获取的句柄全部释放。
    pub fn init(env: Environment) -> Result<Self, IntakeError> {
        let Environment {
            mut hardware,
            input,
            telemetry,
            clock,
            config,
        } = env;

        config.validate()?;

        let gains = PidGains::new(config.arm.kp, config.arm.ki, config.arm.kd)?;
        let arm = ArmPositionController::new(
            gains,
            config.arm.integral_limit,
            config.arm.output_limit,
        )?;
        let timing = ShootTiming::new(config.lever.forward_time(), config.lever.backward_time())?;

        let channels = &config.channels;
        let wheels = Motor::new(hardware.motor(channels.wheels)?, "wheels");
        let left_arm = Motor::new(hardware.motor(channels.left_arm)?, "left_arm");
        let mut right_arm = Motor::new(hardware.motor(channels.right_arm)?, "right_arm");
        right_arm.set_inverted(true);
        let lever = Motor::new(hardware.motor(channels.lever)?, "lever");

        let shooting_switch = LimitSwitch::new(
            hardware.digital_input(channels.shooting_limit_switch)?,
            "shooting_limit_switch",
        );
        let left_switch = LimitSwitch::new(
            hardware.digital_input(channels.left_intake_limit_switch)?,
            "left_intake_limit_switch",
        );
        let right_switch = LimitSwitch::new(
            hardware.digital_input(channels.right_intake_limit_switch)?,
            "right_intake_limit_switch",
        );

        let mut encoder = Encoder::new(
            hardware.encoder(channels.encoder_a, channels.encoder_b)?,
            "arm_encoder",
        );
        encoder.set_reverse_direction(config.arm.reverse_encoder);
        encoder.set_distance_per_pulse(config.arm.distance_per_pulse);

        info!(
            "Intake subsystem initialized (wheels {}, arms {}/{}, lever {}, encoder {}/{})",
            channels.wheels,
            channels.left_arm,
            channels.right_arm,
            channels.lever,
            channels.encoder_a,
            channels.encoder_b
        );

        let period = config.control_loop.period();
        let max_dt = config.control_loop.max_dt();

        Ok(Self {
            wheels,
            left_arm,
            right_arm,
            lever,
            shooting_switch,
            left_switch,
            right_switch,
            encoder,
            arm,
            shooter: ShootSequencer::new(clock.clone(), timing),
            state: IntakeState::default(),
            interlock_engaged: false,
            input,
            telemetry,
            clock,
            config,
            period,
            max_dt,
            last_tick: None,
            ticks: 0,
        })
    }

    /// 运行一个控制周期
    pub fn tick(&mut self) -> TickOutput {
        let input = InputSnapshot::sample(self.input.as_ref());
        let dt = self.measure_dt();

        // 1. 滚轮
        let roller = roller_command(&input);
        self.spin_wheels(roller);

        // 2. 速度缩放切换
        self.state.advance(input.toggle_speed);

        // 3. 手臂速度请求
        let arm_request = scale_arm_speed(
            input.move_intake,
            self.state.speed_multiplier_disabled,
            self.config.arm.speed_multiplier,
        );

        // 4. 射击/点动
        if input.abort_shoot && self.shooter.is_active() {
            info!("Shoot cycle aborted by operator");
            self.shooter.cancel();
        }
        let decision = arbitrate_lever(
            &input,
            self.shooter.is_active(),
            self.config.lever.jog_speed,
        );
        let mut lever = match decision {
            // 按住 abort 时不开始新周期
            LeverDecision::StartShoot if input.abort_shoot => 0.0,
            LeverDecision::StartShoot => {
                self.shooter.start();
                0.0
            },
            LeverDecision::Jog(speed) => {
                self.shooter.cancel();
                speed
            },
            LeverDecision::Stop | LeverDecision::Continue => 0.0,
        };
        let mut shoot_phase = ShootPhase::Idle;
        if self.shooter.is_active() {
            let shot = self.shooter.tick(self.shooting_switch.is_closed());
            lever = shot.command;
            shoot_phase = shot.phase;
        }
        self.spin_lever(lever);

        // 5. PID 覆盖 + 联锁
        let count = self.encoder.count();
        let drive = self.arm.drive(arm_request);
        let requested = self.arm.compute_output(drive, count, dt);
        let arm = apply_interlock(requested, self.is_switch_closed(), input.ignore_limit_switch);
        let engaged = arm != requested;
        if engaged != self.interlock_engaged {
            debug!(
                "Intake limit interlock {}",
                if engaged { "engaged" } else { "released" }
            );
            self.interlock_engaged = engaged;
        }

        // 6. 手臂电机
        self.move_arms(arm);

        // 7. 遥测
        self.publish_telemetry();

        self.ticks += 1;
        TickOutput {
            roller,
            arm,
            lever,
            arm_mode: self.arm.mode(),
            shoot_phase,
            speed_multiplier_disabled: self.state.speed_multiplier_disabled,
        }
    }

    /// 从注入的时钟计算本 tick 的 dt
    ///
    /// 第一个 tick 和零间隔 tick 使用标称周期；超过 `max_dt` 视为时间跳变并钳位。
    fn measure_dt(&mut self) -> Duration {
        let now = self.clock.now();
        let real_dt = match self.last_tick.replace(now) {
            Some(last) => now.saturating_duration_since(last),
            None => self.period,
        };
        if real_dt.is_zero() {
            return self.period;
        }
        if real_dt > self.max_dt {
            warn!(
                "Time jump detected: dt {:?} exceeds {:?}, clamping",
                real_dt, self.max_dt
            );
            self.arm.on_time_jump(real_dt);
            return self.max_dt;
        }
        real_dt
    }

    /// 滚轮输出
    pub fn spin_wheels(&mut self, speed: f64) {
        self.wheels.set(speed);
    }

    /// 两侧手臂输出（右臂反转由电机处理）
    pub fn move_arms(&mut self, speed: f64) {
        self.left_arm.set(speed);
        self.right_arm.set(speed);
    }

    /// 拨杆输出
    pub fn spin_lever(&mut self, speed: f64) {
        self.lever.set(speed);
    }

    pub fn is_left_switch_closed(&self) -> bool {
        self.left_switch.is_closed()
    }

    pub fn is_right_switch_closed(&self) -> bool {
        self.right_switch.is_closed()
    }

    /// 任一 intake 限位开关闭合
    pub fn is_switch_closed(&self) -> bool {
        self.is_left_switch_closed() || self.is_right_switch_closed()
    }

    pub fn is_shooting_switch_closed(&self) -> bool {
        self.shooting_switch.is_closed()
    }

    /// 请求手臂转到 `count`
    ///
    /// `move_toward_robot` 决定位置误差的方向，每次调用都会生效。
    /// 已处于 POSITION_HOLD 时保留原目标；编码器已在目标位置时清空积分项。
    pub fn rotate_to(&mut self, count: i64, move_toward_robot: bool) {
        self.arm.set_direction(move_toward_robot);
        if !self.arm.is_enabled() {
            self.arm.enable(count);
        }
        if self.arm.at_target(self.encoder.count()) {
            self.arm.reset_integrator();
        }
    }

    /// 启用 POSITION_HOLD（无论当前模式都切换到新目标）
    pub fn enable_arm_hold(&mut self, count: i64) {
        self.arm.enable_at(count, self.encoder.count());
    }

    /// 停用 POSITION_HOLD，回到手动
    pub fn disable_arm_hold(&mut self) {
        self.arm.disable();
    }

    pub fn arm_mode(&self) -> ArmMode {
        self.arm.mode()
    }

    /// 编码器计数
    pub fn encoder_count(&self) -> i64 {
        self.encoder.count()
    }

    pub fn encoder_reading(&self) -> EncoderReading {
        self.encoder.read()
    }

    /// 编码器计数清零
    pub fn reset_encoder(&mut self) {
        self.encoder.reset();
    }

    /// 是否处于射击周期中
    pub fn is_shooting(&self) -> bool {
        self.shooter.is_active()
    }

    /// `true` 立即开始一个射击周期（已在进行中则忽略），`false` 取消当前周期
    pub fn set_shooting(&mut self, shooting: bool) {
        if shooting {
            self.shooter.start();
        } else {
            self.shooter.cancel();
        }
    }

    /// 最近一次射击周期的起点
    pub fn shoot_start_time(&self) -> Option<Instant> {
        self.shooter.start_time()
    }

    pub fn shoot_phase(&self) -> ShootPhase {
        self.shooter.phase()
    }

    pub fn speed_multiplier_disabled(&self) -> bool {
        self.state.speed_multiplier_disabled
    }

    /// 替换输入映射
    pub fn set_input(&mut self, input: impl InputMethod + 'static) {
        self.input = Box::new(input);
    }

    /// 发布编码器速率和距离
    ///
    /// sink 报错时只记录 trace 日志。
    pub fn publish_telemetry(&self) {
        let reading = self.encoder.read();
        for (key, value) in [
            (ARM_RATE_KEY, reading.rate),
            (ARM_DISTANCE_KEY, reading.distance),
        ] {
            if let Err(e) = self.telemetry.publish(key, value) {
                trace!("Dropped telemetry {}: {}", key, e);
            }
        }
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    /// 标称周期
    pub fn period(&self) -> Duration {
        self.period
    }

    /// 已执行的 tick 数
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// 拆除子系统
    ///
    /// 先把所有电机置零，再逐个释放句柄。单个句柄释放失败不会中断其余句柄，
    /// 返回遇到的第一个错误。
    pub fn destroy(mut self) -> Result<(), IntakeError> {
        self.shooter.cancel();
        self.spin_wheels(0.0);
        self.move_arms(0.0);
        self.spin_lever(0.0);

        let results = [
            ("wheels", self.wheels.release()),
            ("left_arm", self.left_arm.release()),
            ("right_arm", self.right_arm.release()),
            ("lever", self.lever.release()),
            ("shooting_limit_switch", self.shooting_switch.release()),
            ("left_intake_limit_switch", self.left_switch.release()),
            ("right_intake_limit_switch", self.right_switch.release()),
            ("arm_encoder", self.encoder.release()),
        ];

        let mut first_error = None;
        for (label, result) in results {
            if let Err(e) = result {
                warn!("Failed to release {}: {}", label, e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        info!("Intake subsystem destroyed after {} ticks", self.ticks);
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for IntakeSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntakeSystem")
            .field("arm", &self.arm)
            .field("shooter", &self.shooter)
            .field("state", &self.state)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::SharedInput;
    use intake_control::ManualClock;
    use intake_hal::mock::MockHardware;
    use intake_hal::{DioChannel, PwmChannel};
    use std::sync::Arc;

    fn system() -> (IntakeSystem, MockHardware, SharedInput, ManualClock) {
        let hw = MockHardware::new();
        let input = SharedInput::new();
        let clock = ManualClock::new();
        let env = Environment::new(hw.clone())
            .with_input(input.clone())
            .with_clock(Arc::new(clock.clone()));
        (IntakeSystem::init(env).unwrap(), hw, input, clock)
    }

    #[test]
    fn test_init_defaults() {
        let (system, hw, _input, _clock) = system();
        assert!(!system.speed_multiplier_disabled());
        assert_eq!(system.arm_mode(), ArmMode::Manual);
        assert!(!system.is_shooting());
        assert!(hw.is_pwm_acquired(PwmChannel(0)));
        assert!(hw.is_dio_acquired(DioChannel(4)));
    }

    #[test]
    fn test_right_arm_is_inverted() {
        let (mut system, hw, _input, _clock) = system();
        system.move_arms(0.4);
        assert_eq!(hw.motor_output(PwmChannel(1)), Some(0.4));
        assert_eq!(hw.motor_output(PwmChannel(2)), Some(-0.4));
    }

    #[test]
    fn test_first_tick_uses_nominal_period() {
        let (mut system, _hw, _input, _clock) = system();
        assert_eq!(system.measure_dt(), Duration::from_millis(20));
        // 时钟未前进
        assert_eq!(system.measure_dt(), Duration::from_millis(20));
    }

    #[test]
    fn test_time_jump_is_clamped() {
        let (mut system, _hw, _input, clock) = system();
        system.measure_dt();
        clock.advance_ms(15);
        assert_eq!(system.measure_dt(), Duration::from_millis(15));
        clock.advance_ms(500);
        assert_eq!(system.measure_dt(), Duration::from_millis(40));
    }

    #[test]
    fn test_rotate_to_at_current_position() {
        let (mut system, hw, _input, _clock) = system();
        hw.set_encoder_raw_count(120);

        system.rotate_to(120, false);
        assert_eq!(system.arm_mode(), ArmMode::Hold { target: 120 });
        let output = system.tick();
        assert_eq!(output.arm, 0.0);
    }

    #[test]
    fn test_set_shooting() {
        let (mut system, _hw, _input, clock) = system();
        system.set_shooting(true);
        assert!(system.is_shooting());
        assert!(system.shoot_start_time().is_some());

        clock.advance_ms(20);
        assert_eq!(system.tick().lever, 1.0);

        system.set_shooting(false);
        assert!(!system.is_shooting());
        assert_eq!(system.tick().lever, 0.0);
    }

    #[test]
    fn test_destroy_releases_once() {
        let (system, hw, _input, _clock) = system();
        system.destroy().unwrap();
        for ch in 0..4 {
            assert_eq!(hw.pwm_release_count(PwmChannel(ch)), 1);
        }
        for ch in 0..3 {
            assert_eq!(hw.dio_release_count(DioChannel(ch)), 1);
        }
        assert_eq!(hw.encoder_release_count(), 1);
    }
}
