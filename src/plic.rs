//! RISC-V PLIC（平台级中断控制器）
//!
//! 只在裸机 riscv64 上编译。中断号的认领与完成通过
//! [`crate::platform::Platform`] 交给陷阱处理使用。

use core::ptr;

use crate::consts::{UART0_IRQ, VIRTIO0_IRQ};

/// qemu 将可编程中断控制器放置在这里
pub const PLIC: usize = 0x0c00_0000;

const SENABLE: usize = 0x2080;
const SENABLE_HART: usize = 0x100;
const SPRIORITY: usize = 0x201000;
const SPRIORITY_HART: usize = 0x2000;
const SCLAIM: usize = 0x201004;
const SCLAIM_HART: usize = 0x2000;

/// 设置串口与磁盘中断的优先级（非零即启用），启动时调用一次
///
/// # 安全性
/// 直接写内存映射寄存器，PLIC 必须已经映射在 [`PLIC`]。
pub unsafe fn init() {
    write(UART0_IRQ * 4, 1);
    write(VIRTIO0_IRQ * 4, 1);
}

/// 为 `hart` 的监督模式启用串口与磁盘中断，优先级阈值设为 0
///
/// # 安全性
/// 同 [`init`]，每个 hart 启动时调用。
pub unsafe fn init_hart(hart: usize) {
    write(SENABLE + SENABLE_HART * hart, (1 << UART0_IRQ) | (1 << VIRTIO0_IRQ));
    write(SPRIORITY + SPRIORITY_HART * hart, 0);
}

/// 认领 `hart` 上待处理的最高优先级中断，0 表示没有
pub fn claim(hart: usize) -> u32 {
    read(SCLAIM + SCLAIM_HART * hart)
}

/// 通知 PLIC 中断 `irq` 已处理完成
pub fn complete(hart: usize, irq: u32) {
    write(SCLAIM + SCLAIM_HART * hart, irq);
}

#[inline]
fn read(offset: usize) -> u32 {
    unsafe { ptr::read_volatile((PLIC + offset) as *const u32) }
}

#[inline]
fn write(offset: usize, value: u32) {
    unsafe { ptr::write_volatile((PLIC + offset) as *mut u32, value) }
}
