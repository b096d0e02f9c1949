//! 自旋锁模块
//! 自旋锁将数据包裹在自身内部以保护这些数据。

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut, Drop};
use core::sync::atomic::{fence, AtomicBool, Ordering};

use crate::process::{pop_off, push_off};

/// 自旋锁，通过忙等待实现互斥。
///
/// 持有锁期间中断保持关闭（`push_off`），避免中断处理程序
/// 试图获取同一把锁而在单个硬件线程上死锁。
/// 该锁不可重入：同一执行流重复获取会永远自旋。
///
/// # 字段说明
/// - `lock`: 锁状态（`false`=未锁定，`true`=已锁定）；
/// - `name`: 锁的名称，用于调试输出；
/// - `data`: 被保护的数据。
#[derive(Debug)]
pub struct SpinLock<T: ?Sized> {
    lock: AtomicBool,
    name: &'static str,
    data: UnsafeCell<T>,
}

// 为SpinLock实现Sync trait，允许跨线程共享（要求T是Send）
unsafe impl<T: ?Sized + Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    /// 创建一个新的自旋锁，`name` 仅用于调试。
    pub const fn new(data: T, name: &'static str) -> Self {
        Self {
            lock: AtomicBool::new(false),
            name,
            data: UnsafeCell::new(data),
        }
    }
}

impl<T: ?Sized> SpinLock<T> {
    /// 获取自旋锁并返回守卫对象，守卫离开作用域时自动释放锁。
    ///
    /// # 示例
    /// ```ignore
    /// let lock = SpinLock::new(0, "test");
    /// {
    ///     let mut guard = lock.lock();
    ///     *guard = 42;
    /// }
    /// ```
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        self.acquire();
        SpinLockGuard {
            lock: self,
            data: unsafe { &mut *self.data.get() },
        }
    }

    /// 锁的名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 锁当前是否被持有（任何执行流）
    pub fn is_locked(&self) -> bool {
        self.lock.load(Ordering::Relaxed)
    }

    fn acquire(&self) {
        push_off();
        while self
            .lock
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            core::hint::spin_loop();
        }
        fence(Ordering::SeqCst);
    }

    fn release(&self) {
        if !self.lock.load(Ordering::Relaxed) {
            panic!("spinlock {} release", self.name);
        }
        fence(Ordering::SeqCst);
        self.lock.store(false, Ordering::Release);
        pop_off();
    }
}

/// 自旋锁守卫对象，存在期间表示锁已被持有。
pub struct SpinLockGuard<'a, T: ?Sized> {
    lock: &'a SpinLock<T>,
    data: &'a mut T,
}

impl<'a, T: ?Sized> Deref for SpinLockGuard<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &*self.data
    }
}

impl<'a, T: ?Sized> DerefMut for SpinLockGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut *self.data
    }
}

impl<'a, T: ?Sized> Drop for SpinLockGuard<'a, T> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn smoke() {
        let m = SpinLock::new((), "smoke");
        drop(m.lock());
        drop(m.lock());
        assert!(!m.is_locked());
    }

    #[test]
    fn guard_holds_lock() {
        let m = SpinLock::new(1usize, "guard");
        let mut g = m.lock();
        *g += 1;
        assert!(m.is_locked());
        drop(g);
        assert_eq!(*m.lock(), 2);
    }

    #[test]
    fn excludes_concurrent_increments() {
        let m = SpinLock::new(0usize, "counter");
        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..1000 {
                        *m.lock() += 1;
                    }
                });
            }
        });
        assert_eq!(*m.lock(), 4000);
    }
}
