//! 初始化与拆除测试
//!
//! 句柄必须恰好释放一次：无论是 `destroy()`、drop，还是初始化中途失败。

use intake_control::ManualClock;
use intake_hal::mock::{Acquisition, MockHardware};
use intake_hal::{DioChannel, HalError, HardwareProvider, PwmChannel};
use intake_system::{Environment, IntakeError, IntakeSystem, SharedInput};
use intake_tools::IntakeConfig;
use std::sync::Arc;

fn env(hw: &MockHardware) -> Environment {
    Environment::new(hw.clone()).with_clock(Arc::new(ManualClock::new()))
}

fn assert_nothing_acquired(hw: &MockHardware) {
    for ch in 0..10 {
        assert!(!hw.is_pwm_acquired(PwmChannel(ch)), "PWM{ch} still acquired");
        assert!(!hw.is_dio_acquired(DioChannel(ch)), "DIO{ch} still acquired");
    }
}

#[test]
fn test_invalid_config_is_fatal_before_acquisition() {
    let hw = MockHardware::new();
    let mut config = IntakeConfig::default();
    config.channels.lever = config.channels.wheels;

    let err = IntakeSystem::init(env(&hw).with_config(config)).unwrap_err();
    assert!(matches!(err, IntakeError::Config(_)), "{err}");
    assert_nothing_acquired(&hw);
    assert_eq!(hw.pwm_release_count(PwmChannel(0)), 0);
}

#[test]
fn test_negative_gain_is_fatal() {
    let hw = MockHardware::new();
    let mut config = IntakeConfig::default();
    config.arm.ki = -0.1;

    assert!(IntakeSystem::init(env(&hw).with_config(config)).is_err());
    assert_nothing_acquired(&hw);
}

#[test]
fn test_partial_init_releases_acquired_handles() {
    let hw = MockHardware::new();
    hw.fail_acquisition(Acquisition::Dio(DioChannel(2)));

    let err = IntakeSystem::init(env(&hw)).unwrap_err();
    assert!(matches!(err, IntakeError::Hal(HalError::Device(_))), "{err}");

    for ch in 0..4 {
        assert_eq!(hw.pwm_release_count(PwmChannel(ch)), 1, "PWM{ch}");
    }
    assert_eq!(hw.dio_release_count(DioChannel(0)), 1);
    assert_eq!(hw.dio_release_count(DioChannel(1)), 1);
    // 从未获取的句柄不会被释放
    assert_eq!(hw.dio_release_count(DioChannel(2)), 0);
    assert_eq!(hw.encoder_release_count(), 0);
    assert_nothing_acquired(&hw);
}

#[test]
fn test_channel_in_use_fails_init() {
    let hw = MockHardware::new();
    let mut other_owner = hw.clone();
    let _held = other_owner.motor(PwmChannel(3)).unwrap();

    let err = IntakeSystem::init(env(&hw)).unwrap_err();
    assert!(
        matches!(err, IntakeError::Hal(HalError::PwmChannelInUse(PwmChannel(3)))),
        "{err}"
    );
    assert_eq!(hw.pwm_release_count(PwmChannel(0)), 1);
    assert!(hw.is_pwm_acquired(PwmChannel(3)));
}

#[test]
fn test_destroy_stops_motors_and_releases_once() {
    let hw = MockHardware::new();
    let input = SharedInput::new();
    let mut system = IntakeSystem::init(env(&hw).with_input(input.clone())).unwrap();

    input.update(|s| {
        s.intake = true;
        s.move_intake = 1.0;
    });
    system.tick();
    assert_eq!(hw.motor_output(PwmChannel(0)), Some(1.0));

    system.destroy().unwrap();

    for ch in 0..4 {
        assert_eq!(hw.motor_output(PwmChannel(ch)), Some(0.0), "PWM{ch}");
        assert_eq!(hw.pwm_release_count(PwmChannel(ch)), 1, "PWM{ch}");
    }
    for ch in 0..3 {
        assert_eq!(hw.dio_release_count(DioChannel(ch)), 1, "DIO{ch}");
    }
    assert_eq!(hw.encoder_release_count(), 1);
    assert_nothing_acquired(&hw);
}

#[test]
fn test_drop_without_destroy_releases_once() {
    let hw = MockHardware::new();
    {
        let _system = IntakeSystem::init(env(&hw)).unwrap();
    }
    for ch in 0..4 {
        assert_eq!(hw.pwm_release_count(PwmChannel(ch)), 1);
    }
    assert_eq!(hw.encoder_release_count(), 1);
    assert_nothing_acquired(&hw);
}

#[test]
fn test_reinit_after_destroy() {
    let hw = MockHardware::new();
    IntakeSystem::init(env(&hw)).unwrap().destroy().unwrap();

    let system = IntakeSystem::init(env(&hw)).unwrap();
    assert!(hw.is_pwm_acquired(PwmChannel(0)));
    system.destroy().unwrap();
    assert_eq!(hw.pwm_release_count(PwmChannel(0)), 2);
}
