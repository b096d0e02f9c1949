//! 监督模式陷阱原因寄存器 (scause) 的解析

use bit_field::BitField;

/// 最高位为 1 表示中断，否则为异常
const INTERRUPT_BIT: usize = usize::BITS as usize - 1;

const INTERRUPT_SUPERVISOR_SOFTWARE: usize = 1;
const INTERRUPT_SUPERVISOR_TIMER: usize = 5;
const INTERRUPT_SUPERVISOR_EXTERNAL: usize = 9;
const EXCEPTION_ECALL_USER: usize = 8;
const EXCEPTION_LOAD_PAGE_FAULT: usize = 13;
const EXCEPTION_STORE_PAGE_FAULT: usize = 15;

/// 陷阱原因
///
/// 由 scause 推导而来，不单独保存。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScauseType {
    /// 用户模式的 ecall
    ExcUEcall,
    /// 读取时缺页
    ExcLoadPageFault,
    /// 写入（含 AMO）时缺页
    ExcStorePageFault,
    /// 监督模式外部中断（经 PLIC）
    IntSExt,
    /// 时钟中断：机器模式转发的软件中断或监督模式定时器中断
    IntSTimer,
    Unknown,
}

/// 解析 scause 的原始值
///
/// # 注意
/// 机器模式的时钟中断处理程序通过置位 SSIP 把时钟转发到监督模式，
/// 所以监督模式软件中断与监督模式定时器中断都视为时钟中断。
pub fn decode(scause: usize) -> ScauseType {
    let code = scause.get_bits(0..INTERRUPT_BIT);
    if scause.get_bit(INTERRUPT_BIT) {
        match code {
            INTERRUPT_SUPERVISOR_SOFTWARE | INTERRUPT_SUPERVISOR_TIMER => ScauseType::IntSTimer,
            INTERRUPT_SUPERVISOR_EXTERNAL => ScauseType::IntSExt,
            _ => ScauseType::Unknown,
        }
    } else {
        match code {
            EXCEPTION_ECALL_USER => ScauseType::ExcUEcall,
            EXCEPTION_LOAD_PAGE_FAULT => ScauseType::ExcLoadPageFault,
            EXCEPTION_STORE_PAGE_FAULT => ScauseType::ExcStorePageFault,
            _ => ScauseType::Unknown,
        }
    }
}

/// 由中断号或异常号构造 scause 的原始值
pub fn encode(interrupt: bool, code: usize) -> usize {
    let mut x = 0usize;
    x.set_bits(0..INTERRUPT_BIT, code);
    x.set_bit(INTERRUPT_BIT, interrupt);
    x
}
