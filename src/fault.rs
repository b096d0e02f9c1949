//! 用户缺页的处理
//!
//! 写时复制与按需映射（mmap 区域的懒加载）由内存子系统实现，
//! 这里只决定按什么顺序尝试它们。

use crate::consts::MAXVA;
use crate::process::Task;

/// 缺页种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFault {
    Load,
    Store,
}

/// 写时复制的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CowFault {
    /// 已复制出私有页，重新执行出错指令即可
    Resolved,
    /// 出错地址不是写时复制页
    NotApplicable,
    /// 是写时复制页，但复制失败（例如内存不足）
    Failed,
}

/// 内存子系统提供的缺页修复
pub trait FaultResolver {
    /// 尝试在页表 `satp` 中为 `va` 完成写时复制
    fn resolve_cow(&self, satp: usize, va: usize) -> CowFault;

    /// 若 `va` 落在进程的某个映射区域内，为其分配并装入页面
    fn resolve_mmap(&self, task: &mut dyn Task, va: usize, cause: PageFault) -> Result<(), ()>;
}

/// # 功能说明
/// 修复用户进程在 `va` 处的缺页。
/// 写缺页先尝试写时复制，地址不是写时复制页时再尝试按需映射；
/// 读缺页只尝试按需映射。
///
/// # 返回值
/// - `Ok(())`: 已修复，返回用户空间后重新执行出错指令；
/// - `Err(())`: 无法修复，调用者应当终止进程。
pub fn handle_page_fault(
    resolver: &dyn FaultResolver,
    task: &mut dyn Task,
    va: usize,
    cause: PageFault,
) -> Result<(), ()> {
    if va >= MAXVA {
        return Err(());
    }

    match cause {
        PageFault::Load => resolver.resolve_mmap(task, va, cause),
        PageFault::Store => match resolver.resolve_cow(task.user_satp(), va) {
            CowFault::Resolved => Ok(()),
            CowFault::Failed => Err(()),
            CowFault::NotApplicable => resolver.resolve_mmap(task, va, cause),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::mock::MockTask;
    use std::cell::{Cell, RefCell};
    use std::vec::Vec;

    struct Scripted {
        cow: CowFault,
        mmap: Result<(), ()>,
        calls: RefCell<Vec<(&'static str, usize)>>,
        satp: Cell<usize>,
    }

    impl Scripted {
        fn new(cow: CowFault, mmap: Result<(), ()>) -> Self {
            Self { cow, mmap, calls: RefCell::new(Vec::new()), satp: Cell::new(0) }
        }
    }

    impl FaultResolver for Scripted {
        fn resolve_cow(&self, satp: usize, va: usize) -> CowFault {
            self.satp.set(satp);
            self.calls.borrow_mut().push(("cow", va));
            self.cow
        }

        fn resolve_mmap(&self, _task: &mut dyn Task, va: usize, _cause: PageFault) -> Result<(), ()> {
            self.calls.borrow_mut().push(("mmap", va));
            self.mmap
        }
    }

    #[test]
    fn load_fault_only_tries_mmap() {
        let r = Scripted::new(CowFault::Resolved, Ok(()));
        let mut task = MockTask::new();
        assert_eq!(handle_page_fault(&r, &mut task, 0x4000, PageFault::Load), Ok(()));
        assert_eq!(*r.calls.borrow(), [("mmap", 0x4000)]);
    }

    #[test]
    fn store_fault_prefers_cow() {
        let r = Scripted::new(CowFault::Resolved, Err(()));
        let mut task = MockTask::new();
        assert_eq!(handle_page_fault(&r, &mut task, 0x5000, PageFault::Store), Ok(()));
        assert_eq!(*r.calls.borrow(), [("cow", 0x5000)]);
        assert_eq!(r.satp.get(), task.user_satp());
    }

    #[test]
    fn store_fault_falls_back_to_mmap() {
        let r = Scripted::new(CowFault::NotApplicable, Ok(()));
        let mut task = MockTask::new();
        assert_eq!(handle_page_fault(&r, &mut task, 0x6000, PageFault::Store), Ok(()));
        assert_eq!(*r.calls.borrow(), [("cow", 0x6000), ("mmap", 0x6000)]);
    }

    #[test]
    fn failed_cow_is_fatal() {
        let r = Scripted::new(CowFault::Failed, Ok(()));
        let mut task = MockTask::new();
        assert_eq!(handle_page_fault(&r, &mut task, 0x6000, PageFault::Store), Err(()));
        assert_eq!(r.calls.borrow().len(), 1);
    }

    #[test]
    fn address_above_maxva_is_rejected() {
        let r = Scripted::new(CowFault::Resolved, Ok(()));
        let mut task = MockTask::new();
        assert_eq!(handle_page_fault(&r, &mut task, MAXVA, PageFault::Load), Err(()));
        assert_eq!(handle_page_fault(&r, &mut task, usize::MAX, PageFault::Store), Err(()));
        assert!(r.calls.borrow().is_empty());
    }
}
