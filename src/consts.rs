//! 内核常量

/// 页大小（字节）
pub const PGSIZE: usize = 4096;

/// Sv39 下可用的最大虚拟地址（再加一）。
/// 比 Sv39 允许的最大值少一位，避免对高位虚拟地址做符号扩展。
pub const MAXVA: usize = 1 << (9 + 9 + 9 + 12 - 1);

/// 跳板页映射在用户与内核地址空间的最高处
pub const TRAMPOLINE: usize = MAXVA - PGSIZE;

/// 陷阱帧紧挨着跳板页下方
pub const TRAPFRAME: usize = TRAMPOLINE - PGSIZE;

/// qemu virt 机器上串口的中断号
pub const UART0_IRQ: usize = 10;

/// qemu virt 机器上 virtio 磁盘的中断号
pub const VIRTIO0_IRQ: usize = 1;

/// 时钟中断间隔（周期数），在 qemu 上约 1/10 秒
pub const TIMER_INTERVAL: u64 = 1_000_000;

/// 被杀死的进程默认的退出状态
pub const KILLED_STATUS: i32 = -1;

pub mod fs {
    /// 缓冲区缓存中缓冲块的数量
    pub const NBUF: usize = 30;

    /// 块大小（字节）
    pub const BSIZE: usize = 1024;

    /// 尚未绑定到任何设备的缓冲块使用的设备号
    pub const NODEV: u32 = u32::MAX;
}
