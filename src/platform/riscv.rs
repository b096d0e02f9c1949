//! qemu virt 机器（RISC-V Sv39）上的平台实现

use crate::consts::TRAMPOLINE;
use crate::plic;
use crate::process::IntrOps;
use crate::register::{satp, scause_csr, sepc, sip, sstatus, sstatus_csr, stval, stvec, time, tp};

use super::Platform;

/// 启动代码与跳板页中的入口地址，由链接脚本中的符号给出
#[derive(Debug, Clone, Copy)]
pub struct TrapVectors {
    /// kernelvec 的地址
    pub kernelvec: usize,
    /// 跳板页的链接地址（trampoline 符号）
    pub trampoline: usize,
    /// uservec 的链接地址
    pub uservec: usize,
    /// userret 的链接地址
    pub userret: usize,
    /// user_trap 入口的地址
    pub usertrap: usize,
}

pub struct Riscv {
    vectors: TrapVectors,
}

impl Riscv {
    pub const fn new(vectors: TrapVectors) -> Self {
        Self { vectors }
    }

    /// 启动时由第一个 hart 调用一次，设置设备中断优先级
    ///
    /// # 安全性
    /// PLIC 必须已经映射。
    pub unsafe fn init(&self) {
        plic::init();
    }

    /// 每个 hart 启动时调用，打开本 hart 在 PLIC 上的设备中断
    ///
    /// # 安全性
    /// PLIC 必须已经映射，且 `plic::init` 已经执行过。
    pub unsafe fn init_hart(&self) {
        plic::init_hart(self.hart_id());
    }

    /// 链接地址换算成跳板页在虚拟地址空间高处的地址
    #[inline]
    fn in_trampoline(&self, sym: usize) -> usize {
        TRAMPOLINE + (sym - self.vectors.trampoline)
    }
}

impl Platform for Riscv {
    fn read_sstatus(&self) -> usize {
        sstatus_csr::read()
    }

    fn write_sstatus(&self, x: usize) {
        sstatus_csr::write(x)
    }

    fn read_scause(&self) -> usize {
        scause_csr::read()
    }

    fn read_stval(&self) -> usize {
        stval::read()
    }

    fn read_sepc(&self) -> usize {
        sepc::read()
    }

    fn write_sepc(&self, x: usize) {
        sepc::write(x)
    }

    fn write_stvec(&self, x: usize) {
        stvec::write(x)
    }

    fn read_satp(&self) -> usize {
        satp::read()
    }

    fn hart_id(&self) -> usize {
        tp::read()
    }

    fn plic_claim(&self) -> u32 {
        plic::claim(self.hart_id())
    }

    fn plic_complete(&self, irq: u32) {
        plic::complete(self.hart_id(), irq)
    }

    fn timer_now(&self) -> u64 {
        time::read()
    }

    /// 机器模式的 timervec 已经重设了 mtimecmp，并以软件中断转发到这里，
    /// 所以只需清除 SSIP。
    fn timer_ack_and_rearm(&self, _deadline: u64) {
        sip::clear_ssip();
    }

    fn kernelvec(&self) -> usize {
        self.vectors.kernelvec
    }

    fn uservec(&self) -> usize {
        self.in_trampoline(self.vectors.uservec)
    }

    fn usertrap(&self) -> usize {
        self.vectors.usertrap
    }

    fn userret(&self, trapframe: usize, satp: usize) {
        let userret: extern "C" fn(usize, usize) -> ! =
            unsafe { core::mem::transmute(self.in_trampoline(self.vectors.userret)) };
        userret(trapframe, satp);
    }
}

fn intr_get() -> bool {
    sstatus::intr_enabled(sstatus_csr::read())
}

fn intr_on() {
    sstatus_csr::write(sstatus_csr::read() | sstatus::Sstatus::SIE.bits());
}

fn intr_off() {
    sstatus_csr::write(sstatus_csr::read() & !sstatus::Sstatus::SIE.bits());
}

/// 供 [`crate::process::register_intr_ops`] 注册的中断开关
pub static INTR_OPS: IntrOps = IntrOps {
    get: intr_get,
    on: intr_on,
    off: intr_off,
};
