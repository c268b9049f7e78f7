//! 句柄生命周期管理
//!
//! 每个硬件句柄都实现 [`Releasable`]，teardown 对所有句柄一视同仁。
//! [`Owned`] 负责"恰好释放一次"：
//!
//! - 显式调用 [`Owned::release`]（teardown 路径）
//! - 或在 `Drop` 时自动释放（初始化中途失败的路径）
//!
//! 重复释放是空操作，不会报错。

use crate::HalError;
use tracing::warn;

/// 可释放的硬件资源
pub trait Releasable {
    /// 释放底层资源
    ///
    /// 由 [`Owned`] 保证对同一资源只调用一次。
    fn release(&mut self) -> Result<(), HalError>;
}

impl<T: Releasable + ?Sized> Releasable for Box<T> {
    fn release(&mut self) -> Result<(), HalError> {
        (**self).release()
    }
}

/// 独占持有的硬件句柄
///
/// # 示例
///
/// ```rust
/// use intake_hal::{HalError, Owned, Releasable};
///
/// struct Port(u32);
///
/// impl Releasable for Port {
///     fn release(&mut self) -> Result<(), HalError> {
///         self.0 += 1;
///         Ok(())
///     }
/// }
///
/// let mut port = Owned::new(Port(0), "port");
/// port.release().unwrap();
/// port.release().unwrap(); // 空操作
/// assert_eq!(port.get().0, 1);
/// ```
pub struct Owned<T: Releasable> {
    inner: T,
    label: &'static str,
    released: bool,
}

impl<T: Releasable> Owned<T> {
    /// 接管一个已获取的句柄
    pub fn new(inner: T, label: &'static str) -> Self {
        Self {
            inner,
            label,
            released: false,
        }
    }

    /// 句柄名称（用于日志）
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// 是否已释放
    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn get(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// 释放句柄
    ///
    /// 第一次调用转发到底层 `release()`；之后的调用直接返回 `Ok(())`。
    /// 即使底层释放失败，句柄也被视为已释放，不会重试。
    pub fn release(&mut self) -> Result<(), HalError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.inner.release()
    }
}

impl<T: Releasable> Drop for Owned<T> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Failed to release {} on drop: {}", self.label, e);
        }
    }
}

impl<T: Releasable + std::fmt::Debug> std::fmt::Debug for Owned<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Owned")
            .field("label", &self.label)
            .field("released", &self.released)
            .field("inner", &self.inner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counted {
        releases: Rc<Cell<u32>>,
        fail: bool,
    }

    impl Releasable for Counted {
        fn release(&mut self) -> Result<(), HalError> {
            self.releases.set(self.releases.get() + 1);
            if self.fail {
                Err(HalError::Device("release failed".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn counted(fail: bool) -> (Owned<Counted>, Rc<Cell<u32>>) {
        let releases = Rc::new(Cell::new(0));
        let handle = Owned::new(
            Counted {
                releases: releases.clone(),
                fail,
            },
            "counted",
        );
        (handle, releases)
    }

    #[test]
    fn test_explicit_release_is_idempotent() {
        let (mut handle, releases) = counted(false);
        handle.release().unwrap();
        handle.release().unwrap();
        assert!(handle.is_released());
        drop(handle);
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_drop_releases_once() {
        let (handle, releases) = counted(false);
        drop(handle);
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_failed_release_is_not_retried() {
        let (mut handle, releases) = counted(true);
        assert!(handle.release().is_err());
        assert!(handle.release().is_ok());
        drop(handle);
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_boxed_trait_object_release() {
        let releases = Rc::new(Cell::new(0));
        let boxed: Box<dyn Releasable> = Box::new(Counted {
            releases: releases.clone(),
            fail: false,
        });
        let mut handle = Owned::new(boxed, "boxed");
        handle.release().unwrap();
        assert_eq!(releases.get(), 1);
        assert_eq!(handle.label(), "boxed");
    }
}
