//! 设备驱动接口
//!
//! 串口、磁盘等驱动本身不在本 crate 中，这里只定义缓冲区缓存
//! 与中断分发所使用的窄接口。

use crate::fs::BufData;

/// 块设备读写（缓冲区缓存的设备 I/O 层）
pub trait BlockDevice {
    /// # 功能说明
    /// 同步地在 `data` 与设备 `dev` 上的绝对块号 `blockno` 之间传输一整块。
    /// 调用返回时传输已经完成。
    ///
    /// # 参数
    /// - `dev`: 设备号；
    /// - `blockno`: 设备内的绝对块号（已加上分区起始块）；
    /// - `data`: 块数据，调用者持有该缓冲块的 Busy；
    /// - `writing`: `true` 为写入设备，`false` 为读出。
    fn rw(&self, dev: u32, blockno: u32, data: &mut BufData, writing: bool);

    /// 设备 `dev` 的分区在整个磁盘上的起始块号
    fn block_base(&self, _dev: u32) -> u32 {
        0
    }
}

impl<D: BlockDevice + ?Sized> BlockDevice for &D {
    fn rw(&self, dev: u32, blockno: u32, data: &mut BufData, writing: bool) {
        (**self).rw(dev, blockno, data, writing)
    }

    fn block_base(&self, dev: u32) -> u32 {
        (**self).block_base(dev)
    }
}

/// 设备中断处理函数
pub trait IntrHandler {
    /// 在外部中断被认领之后、完成之前调用
    fn intr(&self);
}
