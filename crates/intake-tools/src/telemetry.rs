//! # 遥测输出
//!
//! 每个 tick 发布若干命名数值。发布失败绝不能影响控制决策：
//! 调用方只记录日志，不向上传播。
//!
//! | Sink | 行为 |
//! |------|------|
//! | [`NullTelemetry`] | 丢弃 |
//! | [`RecordingTelemetry`] | 内存中保存每个 key 的最新值 |
//! | [`ChannelTelemetry`] | `try_send` 到有界通道，满了直接报错 |

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// 手臂编码器速率
pub const ARM_RATE_KEY: &str = "Intake Arm Rate";

/// 手臂编码器距离
pub const ARM_DISTANCE_KEY: &str = "Intake Arm Distance";

/// 遥测错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    /// 接收端已关闭
    #[error("Telemetry sink closed")]
    Closed,

    /// 缓冲区已满
    #[error("Telemetry sink full")]
    Full,
}

/// 遥测 sink
///
/// 实现必须是非阻塞的。
pub trait TelemetrySink {
    fn publish(&self, key: &str, value: f64) -> Result<(), TelemetryError>;
}

/// 丢弃所有数据
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    fn publish(&self, _key: &str, _value: f64) -> Result<(), TelemetryError> {
        Ok(())
    }
}

/// 保存每个 key 的最新值
///
/// 可克隆；克隆共享同一张表。
#[derive(Debug, Clone, Default)]
pub struct RecordingTelemetry {
    values: Arc<Mutex<BTreeMap<String, f64>>>,
    published: Arc<Mutex<u64>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 某个 key 的最新值
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
    }

    /// 全部 key 的快照（按 key 排序）
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// 累计发布次数
    pub fn published_count(&self) -> u64 {
        *self.published.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn publish(&self, key: &str, value: f64) -> Result<(), TelemetryError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        *self.published.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}

/// 一条遥测样本
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySample {
    pub key: String,
    pub value: f64,
}

/// 通过有界通道转发（用于把遥测交给其他线程）
#[derive(Debug, Clone)]
pub struct ChannelTelemetry {
    sender: Sender<TelemetrySample>,
}

impl ChannelTelemetry {
    /// 创建 sink 和对应的接收端
    pub fn new(capacity: usize) -> (Self, Receiver<TelemetrySample>) {
        let (sender, receiver) = bounded(capacity);
        (Self { sender }, receiver)
    }
}

impl TelemetrySink for ChannelTelemetry {
    fn publish(&self, key: &str, value: f64) -> Result<(), TelemetryError> {
        let sample = TelemetrySample {
            key: key.to_string(),
            value,
        };
        self.sender.try_send(sample).map_err(|e| match e {
            TrySendError::Full(_) => TelemetryError::Full,
            TrySendError::Disconnected(_) => TelemetryError::Closed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sink_accepts_everything() {
        assert!(NullTelemetry.publish(ARM_RATE_KEY, 1.0).is_ok());
    }

    #[test]
    fn test_recording_sink_keeps_latest_value() {
        let sink = RecordingTelemetry::new();
        let view = sink.clone();

        sink.publish(ARM_DISTANCE_KEY, 1.0).unwrap();
        sink.publish(ARM_DISTANCE_KEY, 2.5).unwrap();
        sink.publish(ARM_RATE_KEY, -0.5).unwrap();

        assert_eq!(view.get(ARM_DISTANCE_KEY), Some(2.5));
        assert_eq!(view.get(ARM_RATE_KEY), Some(-0.5));
        assert_eq!(view.get("missing"), None);
        assert_eq!(view.published_count(), 3);
        assert_eq!(view.snapshot().len(), 2);
    }

    #[test]
    fn test_channel_sink_reports_full() {
        let (sink, rx) = ChannelTelemetry::new(1);
        assert!(sink.publish(ARM_RATE_KEY, 1.0).is_ok());
        assert_eq!(sink.publish(ARM_RATE_KEY, 2.0), Err(TelemetryError::Full));

        let sample = rx.try_recv().unwrap();
        assert_eq!(sample.key, ARM_RATE_KEY);
        assert_eq!(sample.value, 1.0);
    }

    #[test]
    fn test_channel_sink_reports_closed() {
        let (sink, rx) = ChannelTelemetry::new(4);
        drop(rx);
        assert_eq!(sink.publish(ARM_RATE_KEY, 1.0), Err(TelemetryError::Closed));
    }
}
