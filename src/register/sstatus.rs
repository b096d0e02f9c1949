//! 监督状态寄存器 (sstatus) 的位定义与解析
//!
//! 这里只处理寄存器的值，真正的读写由 [`Platform`](crate::platform::Platform) 完成。

bitflags! {
    /// 陷阱处理关心的 sstatus 位
    pub struct Sstatus: usize {
        /// supervisor interrupt enable
        const SIE = 1 << 1;
        /// supervisor previous interrupt enable
        const SPIE = 1 << 5;
        /// previous mode, is from supervisor?
        const SPP = 1 << 8;
    }
}

/// 中断是否开启 (SIE = 1)
#[inline]
pub fn intr_enabled(x: usize) -> bool {
    Sstatus::from_bits_truncate(x).contains(Sstatus::SIE)
}

/// 陷阱发生前是否处于监督模式 (SPP = 1)
#[inline]
pub fn is_from_supervisor(x: usize) -> bool {
    Sstatus::from_bits_truncate(x).contains(Sstatus::SPP)
}

/// 陷阱发生前是否处于用户模式 (SPP = 0)
#[inline]
pub fn is_from_user(x: usize) -> bool {
    !is_from_supervisor(x)
}

/// 计算返回用户空间时应写入的 sstatus
///
/// # 流程解释
/// - 清除 SPP 位：`sret` 之后进入用户模式；
/// - 设置 SPIE 位：`sret` 把 SPIE 复制到 SIE，用户态下中断开启。
///
/// 其他位原样保留。
#[inline]
pub fn user_ret_prepare(x: usize) -> usize {
    (x & !Sstatus::SPP.bits()) | Sstatus::SPIE.bits()
}
