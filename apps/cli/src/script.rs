//! 仿真脚本
//!
//! JSON 脚本由若干帧组成，每帧在给定的 tick 数内保持同一组操作输入和传感器状态：
//!
//! ```json
//! {
//!   "name": "intake then shoot",
//!   "frames": [
//!     { "ticks": 10, "intake": true, "move_intake": 1.0 },
//!     { "ticks": 30, "shoot": true, "encoder": 120 }
//!   ]
//! }
//! ```
//!
//! 除 `ticks` 外所有字段可省略。输入字段缺省为未按下；传感器字段缺省时保持上一帧的值。

use anyhow::{Context, Result, ensure};
use intake_hal::mock::MockHardware;
use intake_system::InputSnapshot;
use intake_tools::ChannelMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 仿真脚本
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    /// 脚本名称
    #[serde(default)]
    pub name: String,

    /// 脚本描述
    #[serde(default)]
    pub description: String,

    /// 帧序列
    pub frames: Vec<Frame>,
}

/// 一帧：持续 `ticks` 个周期的输入和传感器状态
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Frame {
    pub ticks: u32,

    // 操作输入
    pub intake: bool,
    pub outake: bool,
    pub shoot: bool,
    pub lever_forward: bool,
    pub lever_reverse: bool,
    pub toggle_speed: bool,
    pub ignore_limit_switch: bool,
    pub move_intake: f64,
    pub abort_shoot: bool,

    // 传感器（None = 保持）
    pub shooting_switch: Option<bool>,
    pub left_switch: Option<bool>,
    pub right_switch: Option<bool>,
    pub encoder: Option<i64>,
}

impl Frame {
    /// 本帧的操作输入
    pub fn input(&self) -> InputSnapshot {
        InputSnapshot {
            intake: self.intake,
            outake: self.outake,
            shoot: self.shoot,
            lever_forward: self.lever_forward,
            lever_reverse: self.lever_reverse,
            toggle_speed: self.toggle_speed,
            ignore_limit_switch: self.ignore_limit_switch,
            move_intake: self.move_intake,
            abort_shoot: self.abort_shoot,
        }
    }

    /// 把本帧的传感器状态写入 mock 硬件
    pub fn apply_sensors(&self, hw: &MockHardware, channels: &ChannelMap) {
        if let Some(closed) = self.shooting_switch {
            hw.set_digital(channels.shooting_limit_switch, closed);
        }
        if let Some(closed) = self.left_switch {
            hw.set_digital(channels.left_intake_limit_switch, closed);
        }
        if let Some(closed) = self.right_switch {
            hw.set_digital(channels.right_intake_limit_switch, closed);
        }
        if let Some(count) = self.encoder {
            hw.set_encoder_raw_count(count);
        }
    }
}

impl Script {
    /// 加载脚本文件
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        Self::parse(&content)
    }

    /// 解析并校验脚本
    pub fn parse(content: &str) -> Result<Self> {
        let script: Script = serde_json::from_str(content).context("Failed to parse script JSON")?;
        ensure!(!script.frames.is_empty(), "Script has no frames");
        for (i, frame) in script.frames.iter().enumerate() {
            ensure!(frame.ticks > 0, "Frame {i}: ticks must be > 0");
            ensure!(
                frame.move_intake.is_finite(),
                "Frame {i}: move_intake must be finite"
            );
        }
        Ok(script)
    }

    /// 脚本总 tick 数
    pub fn total_ticks(&self) -> u64 {
        self.frames.iter().map(|f| u64::from(f.ticks)).sum()
    }
}
