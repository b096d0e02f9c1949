//! 缓存层

use array_macro::array;

use alloc::boxed::Box;
use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};

use crate::consts::fs::{BSIZE, NBUF, NODEV};
use crate::driver::BlockDevice;
use crate::process::Sched;
use crate::spinlock::SpinLock;

bitflags! {
    /// 缓冲块的状态位，只在持有 `Bcache::ctrl` 时修改
    pub struct BufFlags: u8 {
        /// 已被某个持有者独占
        const BUSY = 1 << 0;
        /// 数据已与磁盘一致（读入过或写回过）
        const VALID = 1 << 1;
        /// 写回过，不允许被回收给其他块
        const DIRTY = 1 << 2;
    }
}

/// 链表中表示“没有节点”的索引
const NIL: usize = usize::MAX;

/// 缓冲区缓存（Buffer Cache），块设备与文件系统之间的缓冲层。
///
/// `Bcache` 持有固定数量的缓冲块，每块缓存设备上的一个块。
/// 所有缓冲块按最近使用顺序串成一个双向链表（以数组下标链接），
/// 链表结构、块身份、状态位与引用计数由一把自旋锁保护；
/// 块数据本身不受该锁保护，由 Busy 约定保证独占：
/// 只有持有某块 Busy 的执行流才会访问它的数据。
///
/// 由存储子系统在初始化时构造，并以引用的形式传给文件系统等使用者。
pub struct Bcache<D, S> {
    /// 控制链表与元信息的自旋锁。
    ctrl: SpinLock<BufLru>,

    /// 缓冲块的数据部分，下标与 `BufLru::inner` 一一对应。
    bufs: [BufInner; NBUF],

    /// 实际执行块传输的设备。
    disk: D,

    /// 等待 Busy 缓冲块时使用的睡眠/唤醒原语。
    sched: S,
}

// 缓冲块数据只被持有 Busy 的执行流访问
unsafe impl<D: Sync, S: Sync> Sync for Bcache<D, S> {}

impl<D: BlockDevice, S: Sched> Bcache<D, S> {
    /// 创建使用全部 `NBUF` 个缓冲块的缓存
    pub fn new(disk: D, sched: S) -> Self {
        Self::with_capacity(disk, sched, NBUF)
    }

    /// 创建只把前 `nbuf` 个缓冲块链入链表的缓存，`nbuf` 取值 1..=NBUF。
    pub fn with_capacity(disk: D, sched: S, nbuf: usize) -> Self {
        if nbuf == 0 || nbuf > NBUF {
            panic!("binit: bad capacity {}", nbuf);
        }
        let bcache = Self {
            ctrl: SpinLock::new(BufLru::new(), "BufLru"),
            bufs: array![_ => BufInner::new(); NBUF],
            disk,
            sched,
        };
        bcache.binit(nbuf);
        bcache
    }

    /// 初始化链表：下标 0 为最近使用端（头），下标 `nbuf-1` 为最久未使用端（尾）。
    /// 所有缓冲块都处于未绑定、非 Busy、非 Valid 的状态。
    fn binit(&self, nbuf: usize) {
        let mut ctrl = self.ctrl.lock();
        ctrl.head = 0;
        ctrl.tail = nbuf - 1;
        for i in 0..nbuf {
            let b = &mut ctrl.inner[i];
            b.prev = if i == 0 { NIL } else { i - 1 };
            b.next = if i + 1 == nbuf { NIL } else { i + 1 };
        }
        drop(ctrl);

        #[cfg(feature = "verbose_init_info")]
        println!("bcache: {} buffers of {} bytes", nbuf, BSIZE);
    }

    /// 缓冲块 `index` 的等待通道
    #[inline]
    fn channel(&self, index: usize) -> usize {
        &self.bufs[index] as *const BufInner as usize
    }

    /// 获取指定设备与块号对应的缓冲块，返回时调用者持有其 Busy。
    ///
    /// # 功能说明
    /// 不做任何磁盘读写，调用者可通过 [`Buf::is_valid`] 判断数据是否已经加载，
    /// 或直接使用 [`Bcache::bread`]。
    ///
    /// # 流程解释
    /// - 先加上分区起始块，得到绝对块号；
    /// - 持有 `ctrl` 锁，从头到尾扫描整个链表查找 `(dev, blockno)`：
    ///   - 命中且空闲：置 Busy，引用计数加一，返回；
    ///   - 命中但 Busy：释放 `ctrl` 锁并在该缓冲块的通道上睡眠，
    ///     醒来后重新加锁并从头重新扫描，等待者之间没有公平性保证；
    /// - 未命中：从最久未使用端开始找一个既非 Busy 也非 Dirty 的缓冲块，
    ///   改绑为新的身份，置 Busy、引用计数设为 1；
    /// - 第一次使用该缓冲块时为它分配数据页，之后一直保留。
    ///
    /// # 可能的错误
    /// - 分区起始块加块号超出 `u32`：panic（`"bget: block out of range"`）。
    /// - 所有缓冲块都是 Busy 或 Dirty：打印每个缓冲块的状态后 panic（`"bget: no buffers"`）。
    ///   没有等待空闲缓冲块的机制，Dirty 一旦置位就不会被清除。
    pub fn bget(&self, dev: u32, blockno: u32) -> Buf<'_, D, S> {
        let blockno = match self.disk.block_base(dev).checked_add(blockno) {
            Some(blockno) => blockno,
            None => panic!("bget: block out of range"),
        };
        let mut ctrl = self.ctrl.lock();

        let index = loop {
            match ctrl.find_cached(dev, blockno) {
                Some(index) if ctrl.inner[index].flags.contains(BufFlags::BUSY) => {
                    self.sched.sleep(self.channel(index), ctrl);
                    ctrl = self.ctrl.lock();
                }
                Some(index) => {
                    let b = &mut ctrl.inner[index];
                    b.flags.insert(BufFlags::BUSY);
                    b.refcnt += 1;
                    break index;
                }
                None => match ctrl.recycle(dev, blockno) {
                    Some(index) => break index,
                    None => {
                        ctrl.dump();
                        panic!("bget: no buffers");
                    }
                },
            }
        };
        drop(ctrl);

        // 已持有 Busy，其他执行流不会访问该数据页
        unsafe { self.bufs[index].bind() };
        Buf {
            cache: self,
            index,
            dev,
            blockno,
        }
    }

    /// 读取指定块，返回时调用者持有其 Busy。
    ///
    /// # 流程解释
    /// - 调用 `bget` 获取缓冲块；
    /// - 若不是 Valid，调用设备读入整块，然后置 Valid；
    /// - 已经 Valid 的缓冲块直接返回，不访问设备。
    ///
    /// # 可能的错误
    /// - 与 `bget` 相同，缓冲块耗尽时 panic。
    pub fn bread(&self, dev: u32, blockno: u32) -> Buf<'_, D, S> {
        let mut b = self.bget(dev, blockno);
        if !b.is_valid() {
            self.disk.rw(b.dev, b.blockno, b.data_mut(), false);
            self.ctrl.lock().inner[b.index].flags.insert(BufFlags::VALID);
        }
        b
    }

    /// 把缓冲块写回设备。
    ///
    /// 先置 Dirty 与 Valid，然后同步调用设备写入；返回时数据已经落盘。
    /// Dirty 不推迟写入，只阻止该缓冲块被回收。
    ///
    /// # 可能的错误
    /// - 调用者没有持有 Busy：panic（`"bwrite: not busy"`），属于内核编程错误。
    fn bwrite(&self, b: &mut Buf<'_, D, S>) {
        {
            let mut ctrl = self.ctrl.lock();
            let c = &mut ctrl.inner[b.index];
            if !c.flags.contains(BufFlags::BUSY) {
                panic!("bwrite: not busy");
            }
            c.flags.insert(BufFlags::DIRTY | BufFlags::VALID);
        }
        self.disk.rw(b.dev, b.blockno, b.data_mut(), true);
    }

    /// 释放缓冲块的 Busy。
    ///
    /// # 流程解释
    /// 持有 `ctrl` 锁：
    /// - 把缓冲块从链表中摘下，重新插入到最久未使用端；
    /// - 引用计数减一，清除 Busy；
    /// - 唤醒在该缓冲块通道上等待的执行流。
    ///
    /// # 可能的错误
    /// - 缓冲块不是 Busy：panic（`"brelse: not busy"`）。
    fn brelse(&self, index: usize) {
        let mut ctrl = self.ctrl.lock();
        if !ctrl.inner[index].flags.contains(BufFlags::BUSY) {
            panic!("brelse: not busy");
        }
        ctrl.move_to_tail(index);
        let b = &mut ctrl.inner[index];
        b.refcnt -= 1;
        b.flags.remove(BufFlags::BUSY);
        self.sched.wakeup(self.channel(index));
        drop(ctrl);
    }

    /// 缓冲块 `index` 当前的状态位
    fn flags(&self, index: usize) -> BufFlags {
        self.ctrl.lock().inner[index].flags
    }

    /// 按链表顺序打印每个缓冲块的状态
    pub fn dump(&self) {
        self.ctrl.lock().dump();
    }
}

/// 已持有 Busy 的缓冲块。
///
/// 由 `bget`/`bread` 创建，离开作用域时自动释放 Busy
/// 并把缓冲块放回链表的最久未使用端。
pub struct Buf<'a, D: BlockDevice, S: Sched> {
    cache: &'a Bcache<D, S>,

    /// 缓冲块在 `Bcache` 数组中的下标。
    index: usize,

    dev: u32,

    /// 绝对块号，已加上分区起始块。
    blockno: u32,
}

impl<'a, D: BlockDevice, S: Sched> Buf<'a, D, S> {
    pub fn dev(&self) -> u32 {
        self.dev
    }

    pub fn blockno(&self) -> u32 {
        self.blockno
    }

    /// 数据是否已与磁盘一致
    pub fn is_valid(&self) -> bool {
        self.cache.flags(self.index).contains(BufFlags::VALID)
    }

    /// 同步写回设备
    pub fn bwrite(&mut self) {
        let cache = self.cache;
        cache.bwrite(self);
    }

    /// 显式释放，与离开作用域等价
    pub fn release(self) {
        drop(self);
    }

    pub fn data(&self) -> &BufData {
        match unsafe { &*self.cache.bufs[self.index].data.get() } {
            Some(page) => &**page,
            None => unreachable!("buf {}: data page not bound", self.index),
        }
    }

    pub fn data_mut(&mut self) -> &mut BufData {
        match unsafe { &mut *self.cache.bufs[self.index].data.get() } {
            Some(page) => &mut **page,
            None => unreachable!("buf {}: data page not bound", self.index),
        }
    }
}

impl<'a, D: BlockDevice, S: Sched> Drop for Buf<'a, D, S> {
    fn drop(&mut self) {
        self.cache.brelse(self.index);
    }
}

/// 缓冲区缓存的最近使用链表与全部元信息。
///
/// 头部是最近使用端，尾部是最久未使用端。
/// 回收从尾部向头部查找，释放的缓冲块总是重新插入尾部，
/// 因此刚释放的缓冲块最先成为回收候选。
struct BufLru {
    inner: [BufCtrl; NBUF],
    head: usize,
    tail: usize,
}

impl BufLru {
    fn new() -> Self {
        Self {
            inner: array![_ => BufCtrl::new(); NBUF],
            head: NIL,
            tail: NIL,
        }
    }

    /// 从头部开始的链表下标迭代器
    fn iter(&self) -> LruIter<'_> {
        LruIter {
            lru: self,
            cur: self.head,
        }
    }

    /// 扫描整个链表，查找绑定到 `(dev, blockno)` 的缓冲块，不修改任何状态。
    fn find_cached(&self, dev: u32, blockno: u32) -> Option<usize> {
        self.iter().find(|&i| {
            let b = &self.inner[i];
            b.dev == dev && b.blockno == blockno
        })
    }

    /// 从尾部向头部查找既非 Busy 也非 Dirty 的缓冲块，并改绑到 `(dev, blockno)`。
    ///
    /// # 流程解释
    /// - 找到后设置新的设备号与块号；
    /// - 状态位只保留 Busy（旧数据不再 Valid），引用计数设为 1；
    /// - 找不到时返回 `None`。
    fn recycle(&mut self, dev: u32, blockno: u32) -> Option<usize> {
        let mut i = self.tail;
        while i != NIL {
            let b = &mut self.inner[i];
            if !b.flags.intersects(BufFlags::BUSY | BufFlags::DIRTY) {
                b.dev = dev;
                b.blockno = blockno;
                b.flags = BufFlags::BUSY;
                b.refcnt = 1;
                return Some(i);
            }
            i = b.prev;
        }
        None
    }

    /// 把 `index` 从当前位置摘下并插入尾部。
    fn move_to_tail(&mut self, index: usize) {
        if self.tail == index {
            return;
        }

        // 分离
        let (prev, next) = (self.inner[index].prev, self.inner[index].next);
        if prev != NIL {
            self.inner[prev].next = next;
        } else {
            self.head = next;
        }
        // index 不是尾部，next 必然存在
        self.inner[next].prev = prev;

        // 附加
        self.inner[index].prev = self.tail;
        self.inner[index].next = NIL;
        let old_tail = self.tail;
        self.inner[old_tail].next = index;
        self.tail = index;
    }

    fn dump(&self) {
        println!("bcache: buf dev blockno flags refcnt");
        for i in self.iter() {
            let b = &self.inner[i];
            if b.dev == NODEV {
                println!("bcache: {:>3} unbound {:?} {}", i, b.flags, b.refcnt);
            } else {
                println!("bcache: {:>3} {} {} {:?} {}", i, b.dev, b.blockno, b.flags, b.refcnt);
            }
        }
    }
}

struct LruIter<'a> {
    lru: &'a BufLru,
    cur: usize,
}

impl<'a> Iterator for LruIter<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.cur == NIL {
            return None;
        }
        let i = self.cur;
        self.cur = self.lru.inner[i].next;
        Some(i)
    }
}

/// 缓冲块的元信息。
struct BufCtrl {
    /// 所属设备号，未绑定时为 `NODEV`。
    dev: u32,
    /// 绝对块号。
    blockno: u32,
    flags: BufFlags,
    /// 当前持有该缓冲块的次数。
    refcnt: usize,
    /// 链表前驱下标，头部为 `NIL`。
    prev: usize,
    /// 链表后继下标，尾部为 `NIL`。
    next: usize,
}

impl BufCtrl {
    fn new() -> Self {
        Self {
            dev: NODEV,
            blockno: 0,
            flags: BufFlags::empty(),
            refcnt: 0,
            prev: NIL,
            next: NIL,
        }
    }
}

/// 缓冲块的数据页，第一次使用时分配，之后随缓存一直存在。
struct BufInner {
    data: UnsafeCell<Option<Box<BufData>>>,
}

impl BufInner {
    const fn new() -> Self {
        Self {
            data: UnsafeCell::new(None),
        }
    }

    /// 若还没有数据页则分配一个。
    ///
    /// # 安全性
    /// 调用者必须持有该缓冲块的 Busy，且没有其他对数据页的引用。
    unsafe fn bind(&self) {
        let slot = &mut *self.data.get();
        if slot.is_none() {
            *slot = Some(Box::new(BufData::new()));
        }
    }
}

/// BufData 的对齐方式应足以满足可能由此结构体转换而来的其他结构体的需求。
#[repr(C, align(8))]
pub struct BufData([u8; BSIZE]);

impl BufData {
    pub const fn new() -> Self {
        Self([0; BSIZE])
    }
}

impl Deref for BufData {
    type Target = [u8; BSIZE];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for BufData {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
