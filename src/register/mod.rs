//! 定义陷阱处理所需的 RISC-V 寄存器接口
//!
//! `sstatus` 与 `scause` 只解析寄存器的值，在任何目标上都可用；
//! 直接读写 CSR 的汇编只在 riscv64 上编译。

pub mod scause;
pub mod sstatus;

/// 监督状态寄存器 (sstatus) 读写
#[cfg(target_arch = "riscv64")]
pub mod sstatus_csr {
    #[inline]
    pub fn read() -> usize {
        let ret: usize;
        unsafe { core::arch::asm!("csrr {}, sstatus", out(reg) ret) };
        ret
    }

    #[inline]
    pub fn write(x: usize) {
        unsafe { core::arch::asm!("csrw sstatus, {}", in(reg) x) };
    }
}

/// 监督陷阱原因寄存器 (scause) 读取
#[cfg(target_arch = "riscv64")]
pub mod scause_csr {
    #[inline]
    pub fn read() -> usize {
        let ret: usize;
        unsafe { core::arch::asm!("csrr {}, scause", out(reg) ret) };
        ret
    }
}

/// 监督陷阱向量基址寄存器 (stvec)
#[cfg(target_arch = "riscv64")]
pub mod stvec {
    /// 设置陷阱处理程序入口地址
    #[inline]
    pub fn write(stvec: usize) {
        unsafe { core::arch::asm!("csrw stvec, {}", in(reg) stvec) };
    }
}

/// 监督异常程序计数器 (sepc)
#[cfg(target_arch = "riscv64")]
pub mod sepc {
    #[inline]
    pub fn read() -> usize {
        let ret: usize;
        unsafe { core::arch::asm!("csrr {}, sepc", out(reg) ret) };
        ret
    }

    #[inline]
    pub fn write(sepc: usize) {
        unsafe { core::arch::asm!("csrw sepc, {}", in(reg) sepc) };
    }
}

/// 监督陷阱值寄存器 (stval)：缺页时为出错的虚拟地址
#[cfg(target_arch = "riscv64")]
pub mod stval {
    #[inline]
    pub fn read() -> usize {
        let ret: usize;
        unsafe { core::arch::asm!("csrr {}, stval", out(reg) ret) };
        ret
    }
}

/// 监督地址转换与保护寄存器 (satp)
#[cfg(target_arch = "riscv64")]
pub mod satp {
    #[inline]
    pub fn read() -> usize {
        let ret: usize;
        unsafe { core::arch::asm!("csrr {}, satp", out(reg) ret) };
        ret
    }
}

/// 监督中断挂起寄存器 (sip)
#[cfg(target_arch = "riscv64")]
pub mod sip {
    const SSIP: usize = 1 << 1;

    /// 清除软件中断挂起位，确认机器模式转发来的时钟中断
    #[inline]
    pub fn clear_ssip() {
        unsafe { core::arch::asm!("csrc sip, {}", in(reg) SSIP) };
    }
}

/// 线程指针寄存器 (tp)，启动时存放硬件线程号
#[cfg(target_arch = "riscv64")]
pub mod tp {
    #[inline]
    pub fn read() -> usize {
        let ret: usize;
        unsafe { core::arch::asm!("mv {}, tp", out(reg) ret) };
        ret
    }
}

/// 实时计数器 (time)
#[cfg(target_arch = "riscv64")]
pub mod time {
    #[inline]
    pub fn read() -> u64 {
        let ret: u64;
        unsafe { core::arch::asm!("csrr {}, time", out(reg) ret) };
        ret
    }
}
