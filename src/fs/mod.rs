//! 文件系统的块缓存层
//!
//! 日志、inode 等上层在本 crate 之外，通过 [`Bcache`] 访问磁盘块。

mod bio;

pub use bio::{Bcache, Buf, BufData, BufFlags};
