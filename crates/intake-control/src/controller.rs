//! Controller trait - 控制器通用接口
//!
//! # 设计理念
//!
//! - **Tick 模式**: 调用方驱动循环，控制器只负责计算
//! - **时间感知**: 显式传入 `dt`，便于单元测试
//!
//! # 时间跳变处理
//!
//! 当检测到异常的 `dt` 时（如系统卡顿、调度延迟），`on_time_jump()` 会被调用。
//!
//! - ✅ **必须重置**: 微分项（D term），防止计算出巨大的导数
//! - ❌ **不要清零**: 积分项（I term）

use std::time::Duration;

/// 单输入单输出控制器
pub trait Controller {
    /// 计算一步控制输出
    ///
    /// # 参数
    ///
    /// - `measurement`: 当前测量值
    /// - `dt`: 自上次 `tick` 以来的时间步长
    fn tick(&mut self, measurement: f64, dt: Duration) -> f64;

    /// 处理时间跳变
    ///
    /// 默认实现不做任何事情。
    fn on_time_jump(&mut self, _dt: Duration) {}

    /// 重置控制器到初始状态
    fn reset(&mut self) {}
}
