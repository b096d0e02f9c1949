//! 平台抽象层
//!
//! 陷阱处理只通过 [`Platform`] 接触硬件：控制寄存器、中断控制器、
//! 定时器以及跳板页。裸机 RISC-V 上的实现见 `riscv` 子模块，
//! 宿主机测试使用记录每一步操作的模拟实现。

use crate::register::sstatus::{self, Sstatus};

#[cfg(all(target_arch = "riscv64", target_os = "none"))]
pub mod riscv;

#[cfg(test)]
pub(crate) mod mock;

/// 陷阱处理需要的硬件操作
pub trait Platform {
    fn read_sstatus(&self) -> usize;
    fn write_sstatus(&self, x: usize);

    /// 陷阱原因
    fn read_scause(&self) -> usize;

    /// 缺页时为出错的虚拟地址
    fn read_stval(&self) -> usize;

    fn read_sepc(&self) -> usize;
    fn write_sepc(&self, x: usize);

    /// 设置陷阱向量
    fn write_stvec(&self, x: usize);

    /// 当前（内核）页表
    fn read_satp(&self) -> usize;

    fn hart_id(&self) -> usize;

    /// 认领一个待处理的外部中断，0 表示没有
    fn plic_claim(&self) -> u32;

    /// 通知中断控制器 `irq` 已处理完，设备可以再次中断
    fn plic_complete(&self, irq: u32);

    /// 当前时间（定时器周期数）
    fn timer_now(&self) -> u64;

    /// 确认本次时钟中断，并在 `deadline` 安排下一次
    fn timer_ack_and_rearm(&self, deadline: u64);

    /// 内核态陷阱向量（kernelvec）的地址
    fn kernelvec(&self) -> usize;

    /// 跳板页中 uservec 的虚拟地址
    fn uservec(&self) -> usize;

    /// 跳板页进入内核后跳转的处理函数地址（user_trap）
    fn usertrap(&self) -> usize;

    /// 通过跳板页中的 userret 切换到用户页表并返回用户空间。
    /// 真实硬件上不会返回。
    fn userret(&self, trapframe: usize, satp: usize);

    /// 中断是否开启
    fn intr_get(&self) -> bool {
        sstatus::intr_enabled(self.read_sstatus())
    }

    fn intr_on(&self) {
        self.write_sstatus(self.read_sstatus() | Sstatus::SIE.bits());
    }

    fn intr_off(&self) {
        self.write_sstatus(self.read_sstatus() & !Sstatus::SIE.bits());
    }
}
