//! 宿主机测试共用的调度器替身

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::vec::Vec;

use super::{Sched, Task, TrapFrame};
use crate::spinlock::SpinLockGuard;

/// 以条件变量实现的睡眠/唤醒，任何唤醒都会叫醒所有睡眠者
pub struct CondSched {
    generation: Mutex<u64>,
    cv: Condvar,
    sleeps: AtomicUsize,
    wakeups: AtomicUsize,
}

impl CondSched {
    pub fn new() -> Self {
        Self {
            generation: Mutex::new(0),
            cv: Condvar::new(),
            sleeps: AtomicUsize::new(0),
            wakeups: AtomicUsize::new(0),
        }
    }

    pub fn sleeps(&self) -> usize {
        self.sleeps.load(Ordering::SeqCst)
    }

    pub fn wakeups(&self) -> usize {
        self.wakeups.load(Ordering::SeqCst)
    }
}

impl Sched for CondSched {
    fn sleep<T: ?Sized>(&self, _channel: usize, guard: SpinLockGuard<'_, T>) {
        // 先拿到 generation 再放开自旋锁，唤醒不会丢失
        let mut g = self.generation.lock().unwrap();
        let start = *g;
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        drop(guard);
        while *g == start {
            g = self.cv.wait(g).unwrap();
        }
    }

    fn wakeup(&self, _channel: usize) {
        self.wakeups.fetch_add(1, Ordering::SeqCst);
        *self.generation.lock().unwrap() += 1;
        self.cv.notify_all();
    }
}

/// 进程上发生过的生命周期事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    Exit(i32),
    Yield,
    Signals,
}

/// 记录生命周期事件的进程替身
pub struct MockTask {
    pub tf: TrapFrame,
    pub killed: Option<i32>,
    pub events: Vec<TaskEvent>,
    pub satp: usize,
    pub kstack: usize,
}

impl MockTask {
    pub fn new() -> Self {
        Self {
            tf: TrapFrame::default(),
            killed: None,
            events: Vec::new(),
            satp: 0x8000_0000_0008_7f00,
            kstack: 0x3f_ffff_d000,
        }
    }

    pub fn exited(&self) -> Option<i32> {
        self.events.iter().find_map(|e| match e {
            TaskEvent::Exit(status) => Some(*status),
            _ => None,
        })
    }
}

impl Task for MockTask {
    fn trapframe(&mut self) -> &mut TrapFrame {
        &mut self.tf
    }

    fn killed(&self) -> Option<i32> {
        self.killed
    }

    fn set_killed(&mut self, status: i32) {
        if self.killed.is_none() {
            self.killed = Some(status);
        }
    }

    fn exit(&mut self, status: i32) {
        self.events.push(TaskEvent::Exit(status));
    }

    fn yielding(&mut self) {
        self.events.push(TaskEvent::Yield);
    }

    fn deliver_signals(&mut self) {
        self.events.push(TaskEvent::Signals);
    }

    fn user_satp(&self) -> usize {
        self.satp
    }

    fn kstack_top(&self) -> usize {
        self.kstack
    }
}
