//! 进程相关的契约
//!
//! 调度器、进程表与进程生命周期在本 crate 之外实现，
//! 陷阱处理与缓冲区缓存只通过这里的 trait 使用它们。

use crate::spinlock::SpinLockGuard;

pub use cpu::{pop_off, push_off, register_intr_ops, intr_get, IntrOps};
pub use trapframe::{KernelReturn, TrapFrame};

mod cpu;
mod trapframe;

#[cfg(test)]
pub(crate) mod mock;

/// 睡眠/唤醒原语
///
/// 等待通道是一个地址形式的标识，通常取被等待对象的地址。
pub trait Sched {
    /// # 功能说明
    /// 原子地释放 `guard`，并让当前执行流在 `channel` 上睡眠，直到被唤醒。
    /// 被唤醒后不会重新获取 `guard` 对应的锁，调用者需自行重新加锁，
    /// 并重新检查等待条件。
    ///
    /// # 可能的错误
    /// - 释放 `guard` 与进入睡眠之间不能有唤醒丢失，实现者负责保证。
    fn sleep<T: ?Sized>(&self, channel: usize, guard: SpinLockGuard<'_, T>);

    /// 唤醒所有在 `channel` 上睡眠的执行流
    fn wakeup(&self, channel: usize);
}

impl<S: Sched + ?Sized> Sched for &S {
    fn sleep<T: ?Sized>(&self, channel: usize, guard: SpinLockGuard<'_, T>) {
        (**self).sleep(channel, guard)
    }

    fn wakeup(&self, channel: usize) {
        (**self).wakeup(channel)
    }
}

/// 陷阱处理看到的当前进程
pub trait Task {
    /// 进程的陷阱帧
    fn trapframe(&mut self) -> &mut TrapFrame;

    /// 若进程已被标记为终止，返回记录的退出状态
    fn killed(&self) -> Option<i32>;

    /// 标记进程终止，`status` 为之后退出时使用的状态。
    /// 已经标记过的进程保留第一次记录的状态。
    fn set_killed(&mut self, status: i32);

    /// 以 `status` 退出。真实内核中不会返回；
    /// 返回时陷阱处理不再触碰该进程。
    fn exit(&mut self, status: i32);

    /// 主动让出 CPU
    fn yielding(&mut self);

    /// 投递挂起的信号
    fn deliver_signals(&mut self);

    /// 用户页表的 satp 值
    fn user_satp(&self) -> usize;

    /// 进程内核栈的栈顶
    fn kstack_top(&self) -> usize;
}

/// 系统调用分发
pub trait SyscallTable {
    /// 按陷阱帧中的调用号执行系统调用，并把结果写回陷阱帧。
    /// 调用时中断已经开启。
    fn syscall(&self, task: &mut dyn Task);
}
