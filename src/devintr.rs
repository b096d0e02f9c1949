//! 设备中断的识别与分发，以及时钟计数

use core::num::Wrapping;

use crate::consts::{TIMER_INTERVAL, UART0_IRQ, VIRTIO0_IRQ};
use crate::driver::IntrHandler;
use crate::platform::Platform;
use crate::process::{Sched, Task};
use crate::register::scause::ScauseType;
use crate::spinlock::SpinLock;

/// 中断识别的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevIntr {
    /// 时钟中断，调用者应当让出 CPU
    Timer,
    /// 已识别并处理的外部设备中断
    Device,
    /// 外部中断，但中断号无人认领
    Unrecognized,
}

/// 启动以来的时钟中断次数
pub struct Clock {
    ticks: SpinLock<Wrapping<usize>>,
}

impl Clock {
    pub const fn new() -> Self {
        Self {
            ticks: SpinLock::new(Wrapping(0), "time"),
        }
    }

    /// 等待时钟的进程睡眠在这个通道上
    #[inline]
    pub fn channel(&self) -> usize {
        &self.ticks as *const _ as usize
    }

    /// 计数加一并唤醒所有等待时钟的进程
    pub fn tick<S: Sched>(&self, sched: &S) {
        let mut guard = self.ticks.lock();
        *guard += Wrapping(1);
        sched.wakeup(self.channel());
        drop(guard);
    }

    /// # 功能说明
    /// 让 `task` 睡眠 `count` 个时钟周期。
    ///
    /// # 返回值
    /// - `Ok(())`: 已经过 `count` 个周期；
    /// - `Err(())`: 等待期间进程被标记终止。
    pub fn sleep<S: Sched>(&self, sched: &S, task: &dyn Task, count: usize) -> Result<(), ()> {
        let mut guard = self.ticks.lock();
        let start = *guard;

        while (*guard - start) < Wrapping(count) {
            if task.killed().is_some() {
                return Err(());
            }
            sched.sleep(self.channel(), guard);
            guard = self.ticks.lock();
        }
        Ok(())
    }

    pub fn read(&self) -> usize {
        self.ticks.lock().0
    }
}

/// 把中断交给对应的处理者
pub struct IntrRouter<'a> {
    uart: &'a dyn IntrHandler,
    disk: Option<&'a dyn IntrHandler>,
    clock: &'a Clock,
}

impl<'a> IntrRouter<'a> {
    /// 没有磁盘驱动时 `disk` 为 `None`，磁盘中断只被认领并完成
    pub fn new(uart: &'a dyn IntrHandler, disk: Option<&'a dyn IntrHandler>, clock: &'a Clock) -> Self {
        Self { uart, disk, clock }
    }

    /// # 功能说明
    /// 若 `cause` 是设备中断则处理它。
    ///
    /// # 返回值
    /// 不是设备中断（异常或未知原因）时返回 `None`，由调用者决定如何处理。
    pub fn devintr<P: Platform, S: Sched>(&self, platform: &P, sched: &S, cause: ScauseType) -> Option<DevIntr> {
        match cause {
            ScauseType::IntSExt => Some(self.external(platform)),
            ScauseType::IntSTimer => Some(self.timer(platform, sched)),
            _ => None,
        }
    }

    /// 从中断控制器认领外部中断并分发。
    /// 认领到的中断号无论是否识别都会被完成，否则该中断源不会再次触发。
    pub fn external<P: Platform>(&self, platform: &P) -> DevIntr {
        let irq = platform.plic_claim();

        let ret = match irq as usize {
            // 已被其他 hart 认领，或是伪中断
            0 => {
                #[cfg(feature = "kernel_warning")]
                println!("devintr: spurious external interrupt");
                DevIntr::Device
            }
            UART0_IRQ => {
                self.uart.intr();
                DevIntr::Device
            }
            VIRTIO0_IRQ => {
                if let Some(disk) = self.disk {
                    disk.intr();
                }
                DevIntr::Device
            }
            _ => {
                println!("unexpected interrupt irq={}", irq);
                DevIntr::Unrecognized
            }
        };

        if irq > 0 {
            platform.plic_complete(irq);
        }
        ret
    }

    /// 时钟中断：计数并安排下一次
    pub fn timer<P: Platform, S: Sched>(&self, platform: &P, sched: &S) -> DevIntr {
        self.clock.tick(sched);
        platform.timer_ack_and_rearm(platform.timer_now() + TIMER_INTERVAL);
        DevIntr::Timer
    }
}
