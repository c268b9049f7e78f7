//! Mock 硬件后端
//!
//! 内存中的电机、限位开关和编码器，用于单元测试和 CLI 仿真。
//! [`MockHardware`] 可克隆，所有克隆共享同一份状态，
//! 测试代码一边驱动 `IntakeSystem`，一边修改传感器、读取电机输出。

use crate::{
    DigitalInput, DioChannel, HalError, HardwareProvider, MotorOutput, PwmChannel,
    QuadratureEncoder, Releasable,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// 可注入失败的获取点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Acquisition {
    Pwm(PwmChannel),
    Dio(DioChannel),
}

#[derive(Debug, Default)]
struct MockEncoderState {
    raw_count: i64,
    offset: i64,
    raw_rate: f64,
    reverse: bool,
    distance_per_pulse: f64,
    channels: Option<(DioChannel, DioChannel)>,
    releases: u32,
}

impl MockEncoderState {
    fn sign(&self) -> i64 {
        if self.reverse { -1 } else { 1 }
    }

    fn count(&self) -> i64 {
        (self.raw_count - self.offset) * self.sign()
    }
}

#[derive(Debug, Default)]
struct MockState {
    motor_outputs: HashMap<PwmChannel, f64>,
    motor_writes: HashMap<PwmChannel, u64>,
    digital_values: HashMap<DioChannel, bool>,
    acquired_pwm: HashSet<PwmChannel>,
    acquired_dio: HashSet<DioChannel>,
    pwm_releases: HashMap<PwmChannel, u32>,
    dio_releases: HashMap<DioChannel, u32>,
    encoder: MockEncoderState,
    failures: HashSet<Acquisition>,
}

/// 共享状态的 Mock 硬件
#[derive(Debug, Clone, Default)]
pub struct MockHardware {
    state: Arc<Mutex<MockState>>,
}

impl MockHardware {
    pub fn new() -> Self {
        let hw = Self::default();
        hw.lock().encoder.distance_per_pulse = 1.0;
        hw
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 设置数字输入电平
    pub fn set_digital(&self, channel: DioChannel, value: bool) {
        self.lock().digital_values.insert(channel, value);
    }

    /// 设置编码器原始计数（未应用方向）
    pub fn set_encoder_raw_count(&self, count: i64) {
        self.lock().encoder.raw_count = count;
    }

    /// 设置编码器原始速率（counts/s，未应用方向）
    pub fn set_encoder_raw_rate(&self, rate: f64) {
        self.lock().encoder.raw_rate = rate;
    }

    /// 编码器当前是否反向计数
    pub fn encoder_reversed(&self) -> bool {
        self.lock().encoder.reverse
    }

    /// 某个 PWM 通道上最近一次写入的物理值
    pub fn motor_output(&self, channel: PwmChannel) -> Option<f64> {
        self.lock().motor_outputs.get(&channel).copied()
    }

    /// 某个 PWM 通道累计写入次数
    pub fn motor_write_count(&self, channel: PwmChannel) -> u64 {
        self.lock().motor_writes.get(&channel).copied().unwrap_or(0)
    }

    pub fn pwm_release_count(&self, channel: PwmChannel) -> u32 {
        self.lock().pwm_releases.get(&channel).copied().unwrap_or(0)
    }

    pub fn dio_release_count(&self, channel: DioChannel) -> u32 {
        self.lock().dio_releases.get(&channel).copied().unwrap_or(0)
    }

    pub fn encoder_release_count(&self) -> u32 {
        self.lock().encoder.releases
    }

    pub fn is_pwm_acquired(&self, channel: PwmChannel) -> bool {
        self.lock().acquired_pwm.contains(&channel)
    }

    pub fn is_dio_acquired(&self, channel: DioChannel) -> bool {
        self.lock().acquired_dio.contains(&channel)
    }

    /// 让下一次对该通道的获取失败
    pub fn fail_acquisition(&self, point: Acquisition) {
        self.lock().failures.insert(point);
    }

    fn check_failure(state: &mut MockState, point: Acquisition) -> Result<(), HalError> {
        if state.failures.remove(&point) {
            return Err(HalError::Device(format!("injected failure at {point:?}")));
        }
        Ok(())
    }

    fn claim_dio(state: &mut MockState, channel: DioChannel) -> Result<(), HalError> {
        if !channel.is_valid() {
            return Err(HalError::InvalidDioChannel(channel));
        }
        Self::check_failure(state, Acquisition::Dio(channel))?;
        if !state.acquired_dio.insert(channel) {
            return Err(HalError::DioChannelInUse(channel));
        }
        Ok(())
    }
}

impl HardwareProvider for MockHardware {
    fn motor(&mut self, channel: PwmChannel) -> Result<Box<dyn MotorOutput>, HalError> {
        let mut state = self.lock();
        if !channel.is_valid() {
            return Err(HalError::InvalidPwmChannel(channel));
        }
        Self::check_failure(&mut state, Acquisition::Pwm(channel))?;
        if !state.acquired_pwm.insert(channel) {
            return Err(HalError::PwmChannelInUse(channel));
        }
        state.motor_outputs.insert(channel, 0.0);
        Ok(Box::new(MockMotor {
            channel,
            hw: self.clone(),
        }))
    }

    fn digital_input(&mut self, channel: DioChannel) -> Result<Box<dyn DigitalInput>, HalError> {
        let mut state = self.lock();
        Self::claim_dio(&mut state, channel)?;
        Ok(Box::new(MockDigitalInput {
            channel,
            hw: self.clone(),
        }))
    }

    fn encoder(
        &mut self,
        channel_a: DioChannel,
        channel_b: DioChannel,
    ) -> Result<Box<dyn QuadratureEncoder>, HalError> {
        let mut state = self.lock();
        Self::claim_dio(&mut state, channel_a)?;
        if let Err(e) = Self::claim_dio(&mut state, channel_b) {
            state.acquired_dio.remove(&channel_a);
            return Err(e);
        }
        state.encoder.channels = Some((channel_a, channel_b));
        Ok(Box::new(MockEncoder { hw: self.clone() }))
    }
}

struct MockMotor {
    channel: PwmChannel,
    hw: MockHardware,
}

impl MotorOutput for MockMotor {
    fn set(&mut self, value: f64) {
        let mut state = self.hw.lock();
        state.motor_outputs.insert(self.channel, value);
        *state.motor_writes.entry(self.channel).or_insert(0) += 1;
    }

    fn channel(&self) -> PwmChannel {
        self.channel
    }
}

impl Releasable for MockMotor {
    fn release(&mut self) -> Result<(), HalError> {
        let mut state = self.hw.lock();
        state.acquired_pwm.remove(&self.channel);
        *state.pwm_releases.entry(self.channel).or_insert(0) += 1;
        Ok(())
    }
}

struct MockDigitalInput {
    channel: DioChannel,
    hw: MockHardware,
}

impl DigitalInput for MockDigitalInput {
    fn get(&self) -> bool {
        self.hw
            .lock()
            .digital_values
            .get(&self.channel)
            .copied()
            .unwrap_or(false)
    }

    fn channel(&self) -> DioChannel {
        self.channel
    }
}

impl Releasable for MockDigitalInput {
    fn release(&mut self) -> Result<(), HalError> {
        let mut state = self.hw.lock();
        state.acquired_dio.remove(&self.channel);
        *state.dio_releases.entry(self.channel).or_insert(0) += 1;
        Ok(())
    }
}

struct MockEncoder {
    hw: MockHardware,
}

impl QuadratureEncoder for MockEncoder {
    fn count(&self) -> i64 {
        self.hw.lock().encoder.count()
    }

    fn rate(&self) -> f64 {
        let state = self.hw.lock();
        let encoder = &state.encoder;
        encoder.raw_rate * encoder.sign() as f64 * encoder.distance_per_pulse
    }

    fn distance(&self) -> f64 {
        let state = self.hw.lock();
        state.encoder.count() as f64 * state.encoder.distance_per_pulse
    }

    fn set_reverse_direction(&mut self, reverse: bool) {
        self.hw.lock().encoder.reverse = reverse;
    }

    fn set_distance_per_pulse(&mut self, distance_per_pulse: f64) {
        self.hw.lock().encoder.distance_per_pulse = distance_per_pulse;
    }

    fn reset(&mut self) {
        let mut state = self.hw.lock();
        state.encoder.offset = state.encoder.raw_count;
    }
}

impl Releasable for MockEncoder {
    fn release(&mut self) -> Result<(), HalError> {
        let mut state = self.hw.lock();
        if let Some((a, b)) = state.encoder.channels.take() {
            state.acquired_dio.remove(&a);
            state.acquired_dio.remove(&b);
        }
        state.encoder.releases += 1;
        Ok(())
    }
}
