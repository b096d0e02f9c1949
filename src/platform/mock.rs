//! 记录每一次硬件操作的平台替身

use std::cell::{Cell, RefCell};
use std::vec::Vec;

use super::Platform;
use crate::consts::TRAMPOLINE;
use crate::register::scause;
use crate::register::sstatus::Sstatus;

pub const KERNELVEC: usize = 0x8000_5000;
pub const USERTRAP: usize = 0x8000_6000;
pub const KERNEL_SATP: usize = 0x8000_0000_0008_0000;
pub const HART: usize = 0;

/// 有副作用的硬件操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwEvent {
    Sstatus(usize),
    Sepc(usize),
    Stvec(usize),
    Claim(u32),
    Complete(u32),
    Rearm(u64),
    UserRet { trapframe: usize, satp: usize },
}

pub struct MockPlatform {
    pub sstatus: Cell<usize>,
    pub scause: Cell<usize>,
    pub stval: Cell<usize>,
    pub sepc: Cell<usize>,
    pub irq: Cell<u32>,
    pub now: Cell<u64>,
    pub events: RefCell<Vec<HwEvent>>,
}

impl MockPlatform {
    /// 来自用户态、中断关闭的陷阱
    pub fn from_user(interrupt: bool, code: usize) -> Self {
        Self::with_sstatus(Sstatus::SPIE.bits(), interrupt, code)
    }

    /// 来自内核态、中断关闭的陷阱
    pub fn from_kernel(interrupt: bool, code: usize) -> Self {
        Self::with_sstatus((Sstatus::SPP | Sstatus::SPIE).bits(), interrupt, code)
    }

    pub fn with_sstatus(sstatus: usize, interrupt: bool, code: usize) -> Self {
        Self {
            sstatus: Cell::new(sstatus),
            scause: Cell::new(scause::encode(interrupt, code)),
            stval: Cell::new(0),
            sepc: Cell::new(0x1000),
            irq: Cell::new(0),
            now: Cell::new(5_000),
            events: RefCell::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<HwEvent> {
        self.events.borrow().clone()
    }

    pub fn completed(&self) -> Vec<u32> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                HwEvent::Complete(irq) => Some(*irq),
                _ => None,
            })
            .collect()
    }

    pub fn user_ret(&self) -> Option<(usize, usize)> {
        self.events.borrow().iter().find_map(|e| match e {
            HwEvent::UserRet { trapframe, satp } => Some((*trapframe, *satp)),
            _ => None,
        })
    }

    fn record(&self, e: HwEvent) {
        self.events.borrow_mut().push(e);
    }
}

impl Platform for MockPlatform {
    fn read_sstatus(&self) -> usize {
        self.sstatus.get()
    }

    fn write_sstatus(&self, x: usize) {
        self.sstatus.set(x);
        self.record(HwEvent::Sstatus(x));
    }

    fn read_scause(&self) -> usize {
        self.scause.get()
    }

    fn read_stval(&self) -> usize {
        self.stval.get()
    }

    fn read_sepc(&self) -> usize {
        self.sepc.get()
    }

    fn write_sepc(&self, x: usize) {
        self.sepc.set(x);
        self.record(HwEvent::Sepc(x));
    }

    fn write_stvec(&self, x: usize) {
        self.record(HwEvent::Stvec(x));
    }

    fn read_satp(&self) -> usize {
        KERNEL_SATP
    }

    fn hart_id(&self) -> usize {
        HART
    }

    fn plic_claim(&self) -> u32 {
        let irq = self.irq.replace(0);
        self.record(HwEvent::Claim(irq));
        irq
    }

    fn plic_complete(&self, irq: u32) {
        self.record(HwEvent::Complete(irq));
    }

    fn timer_now(&self) -> u64 {
        self.now.get()
    }

    fn timer_ack_and_rearm(&self, deadline: u64) {
        self.record(HwEvent::Rearm(deadline));
    }

    fn kernelvec(&self) -> usize {
        KERNELVEC
    }

    fn uservec(&self) -> usize {
        TRAMPOLINE
    }

    fn usertrap(&self) -> usize {
        USERTRAP
    }

    fn userret(&self, trapframe: usize, satp: usize) {
        self.record(HwEvent::UserRet { trapframe, satp });
    }
}
