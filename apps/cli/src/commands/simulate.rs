//! 仿真命令
//!
//! 在 mock 硬件上按脚本驱动 `IntakeSystem`。默认使用手动时钟（每个 tick 前进一个周期，
//! 不真正等待）；`--realtime` 使用系统时钟和固定频率循环，Ctrl+C 提前结束。

use crate::commands::config::load_config;
use crate::script::{Frame, Script};
use anyhow::{Context, Result};
use clap::Args;
use intake_control::{ArmMode, ManualClock, MonotonicClock};
use intake_hal::mock::MockHardware;
use intake_system::{
    Environment, IntakeSystem, LoopConfig, SharedInput, TickOutput, run_loop,
};
use intake_tools::{IntakeConfig, RecordingTelemetry};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// 仿真参数
#[derive(Args, Debug)]
pub struct SimulateCommand {
    /// 脚本文件（JSON）
    #[arg(short, long)]
    pub script: PathBuf,

    /// 配置文件（默认为用户配置目录下的 intake/config.toml）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 最多运行的 tick 数（默认运行完整脚本）
    #[arg(short, long)]
    pub ticks: Option<u64>,

    /// 使用系统时钟，按配置的周期实时运行
    #[arg(long)]
    pub realtime: bool,
}

impl SimulateCommand {
    pub fn execute(self) -> Result<()> {
        let script = Script::load(&self.script)?;
        let config = load_config(self.config.as_deref())?;

        println!("📜 Script: {}", display_name(&script));
        if !script.description.is_empty() {
            println!("📝 {}", script.description);
        }

        let budget = self
            .ticks
            .unwrap_or_else(|| script.total_ticks())
            .min(script.total_ticks());

        let mut sim = Simulation::new(config, self.realtime)?;
        let executed = if self.realtime {
            sim.run_realtime(&script, budget)?
        } else {
            sim.run_stepped(&script, budget)
        };

        sim.finish(executed)
    }
}

fn display_name(script: &Script) -> &str {
    if script.name.is_empty() {
        "(unnamed)"
    } else {
        &script.name
    }
}

fn format_mode(mode: ArmMode) -> String {
    match mode {
        ArmMode::Manual => "manual".to_string(),
        ArmMode::Hold { target } => format!("hold({target})"),
    }
}

fn print_tick(index: u64, output: &TickOutput) {
    println!(
        "{:>5}  roller {:+.2}  arm {:+.3}  lever {:+.2}  phase {:<10}  mode {}{}",
        index,
        output.roller,
        output.arm,
        output.lever,
        output.shoot_phase.as_str(),
        format_mode(output.arm_mode),
        if output.speed_multiplier_disabled {
            "  (full speed)"
        } else {
            ""
        }
    );
}

/// 一次仿真运行
struct Simulation {
    system: IntakeSystem,
    hw: MockHardware,
    input: SharedInput,
    clock: Option<ManualClock>,
    telemetry: RecordingTelemetry,
    config: IntakeConfig,
}

impl Simulation {
    fn new(config: IntakeConfig, realtime: bool) -> Result<Self> {
        let hw = MockHardware::new();
        let input = SharedInput::new();
        let telemetry = RecordingTelemetry::new();

        let mut env = Environment::new(hw.clone())
            .with_input(input.clone())
            .with_telemetry(telemetry.clone())
            .with_config(config.clone());

        let clock = if realtime {
            env = env.with_clock(Arc::new(MonotonicClock));
            None
        } else {
            let clock = ManualClock::new();
            env = env.with_clock(Arc::new(clock.clone()));
            Some(clock)
        };

        let system = IntakeSystem::init(env).context("Failed to initialize intake subsystem")?;
        Ok(Self {
            system,
            hw,
            input,
            clock,
            telemetry,
            config,
        })
    }

    fn apply(&self, frame: &Frame) {
        self.input.set(frame.input());
        frame.apply_sensors(&self.hw, &self.config.channels);
    }

    /// 手动时钟：逐 tick 打印
    fn run_stepped(&mut self, script: &Script, budget: u64) -> u64 {
        let period = self.config.control_loop.period();
        let mut executed = 0;

        'frames: for frame in &script.frames {
            self.apply(frame);
            for _ in 0..frame.ticks {
                if executed >= budget {
                    break 'frames;
                }
                if executed > 0
                    && let Some(clock) = &self.clock
                {
                    clock.advance(period);
                }
                let output = self.system.tick();
                print_tick(executed, &output);
                executed += 1;
            }
        }
        executed
    }

    /// 系统时钟：每帧跑一次固定频率循环，帧结束时打印状态
    fn run_realtime(&mut self, script: &Script, budget: u64) -> Result<u64> {
        let stop = Arc::new(AtomicBool::new(false));
        let handler_stop = stop.clone();
        ctrlc::set_handler(move || {
            handler_stop.store(true, Ordering::SeqCst);
        })
        .context("Failed to install Ctrl+C handler")?;

        let base = LoopConfig::from_settings(&self.config.control_loop);
        let mut executed = 0u64;

        for frame in &script.frames {
            if executed >= budget || stop.load(Ordering::SeqCst) {
                break;
            }
            self.apply(frame);
            let ticks = u64::from(frame.ticks).min(budget - executed);
            let loop_config = base.clone().with_max_iterations(ticks as usize);
            executed += run_loop(&mut self.system, &loop_config, &stop)? as u64;

            println!(
                "{:>5}  arm {:+.3}  encoder {:>6}  shooting {}  mode {}",
                executed,
                self.hw.motor_output(self.config.channels.left_arm).unwrap_or(0.0),
                self.system.encoder_count(),
                self.system.is_shooting(),
                format_mode(self.system.arm_mode()),
            );
        }

        if stop.load(Ordering::SeqCst) {
            info!("Simulation interrupted after {} ticks", executed);
        }
        Ok(executed)
    }

    fn finish(self, executed: u64) -> Result<()> {
        println!();
        println!("Ticks: {executed}");
        println!("Telemetry:");
        for (key, value) in self.telemetry.snapshot() {
            println!("  {key} = {value:.3}");
        }
        self.system
            .destroy()
            .context("Failed to release intake hardware")?;
        Ok(())
    }
}
