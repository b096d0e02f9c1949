//! 处理器中断开关的嵌套管理
//!
//! 本内核只运行在单个硬件线程上，因此中断关闭的嵌套计数只有一份。
//! 具体如何读写中断使能位由平台在启动时通过 [`register_intr_ops`] 注册，
//! 注册之前（以及宿主机测试中）所有操作都是空操作。

use core::sync::atomic::{AtomicBool, AtomicPtr, AtomicUsize, Ordering};

/// 平台提供的中断使能位操作
pub struct IntrOps {
    /// 读取当前中断是否开启
    pub get: fn() -> bool,
    /// 开启中断
    pub on: fn(),
    /// 关闭中断
    pub off: fn(),
}

fn nop_get() -> bool {
    false
}

fn nop() {}

static NOP_OPS: IntrOps = IntrOps {
    get: nop_get,
    on: nop,
    off: nop,
};

static INTR_OPS: AtomicPtr<IntrOps> = AtomicPtr::new(&NOP_OPS as *const IntrOps as *mut IntrOps);

/// 中断关闭的嵌套状态
struct IntrNest {
    /// `push_off` 的嵌套深度
    noff: AtomicUsize,
    /// 第一次 `push_off` 之前中断是否开启
    intena: AtomicBool,
}

static NEST: IntrNest = IntrNest::new();

/// 注册平台的中断使能位操作。
///
/// 必须在启动早期、第一次获取自旋锁之前调用。
pub fn register_intr_ops(ops: &'static IntrOps) {
    INTR_OPS.store(ops as *const IntrOps as *mut IntrOps, Ordering::Release);
}

#[inline]
fn ops() -> &'static IntrOps {
    // SAFETY: 指针只来自 `NOP_OPS` 或 `register_intr_ops` 的 `&'static` 引用
    unsafe { &*INTR_OPS.load(Ordering::Acquire) }
}

/// 当前中断是否开启
#[inline]
pub fn intr_get() -> bool {
    (ops().get)()
}

/// # 功能说明
/// 关闭中断，并记录嵌套次数。
/// 与直接关中断不同，`push_off` 需要与 `pop_off` 成对使用：
/// 调用两次 `push_off` 之后需要两次 `pop_off` 才会恢复中断；
/// 如果一开始中断就是关闭的，那么配对结束后中断仍保持关闭。
pub fn push_off() {
    NEST.push_off(ops());
}

/// # 功能说明
/// 撤销一次 `push_off`，当嵌套计数归零且最外层 `push_off`
/// 之前中断是开启的，则重新开启中断。
///
/// # 可能的错误
/// - 调用时中断处于开启状态：panic，说明有人绕过 `push_off` 打开了中断；
/// - 调用次数多于 `push_off`：panic。
pub fn pop_off() {
    NEST.pop_off(ops());
}

impl IntrNest {
    const fn new() -> Self {
        Self {
            noff: AtomicUsize::new(0),
            intena: AtomicBool::new(false),
        }
    }

    /// # 流程解释
    /// 1. 读取当前中断使能状态 `old`，然后关闭中断。
    /// 2. 若嵌套计数为 0，把 `old` 保存下来供最外层 `pop_off` 恢复。
    /// 3. 嵌套计数加一。
    fn push_off(&self, ops: &IntrOps) {
        let old = (ops.get)();
        (ops.off)();
        if self.noff.fetch_add(1, Ordering::AcqRel) == 0 {
            self.intena.store(old, Ordering::Release);
        }
    }

    fn pop_off(&self, ops: &IntrOps) {
        if (ops.get)() {
            panic!("pop_off: interruptible");
        }
        let prev = self
            .noff
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .unwrap_or_else(|_| panic!("pop_off: unbalanced"));
        if prev == 1 && self.intena.load(Ordering::Acquire) {
            (ops.on)();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// 模拟的中断使能位，各测试共用，由 `SERIAL` 串行化
    static SIE: AtomicBool = AtomicBool::new(false);
    static SERIAL: Mutex<()> = Mutex::new(());

    fn sie_get() -> bool {
        SIE.load(Ordering::SeqCst)
    }

    fn sie_on() {
        SIE.store(true, Ordering::SeqCst);
    }

    fn sie_off() {
        SIE.store(false, Ordering::SeqCst);
    }

    static SIE_OPS: IntrOps = IntrOps {
        get: sie_get,
        on: sie_on,
        off: sie_off,
    };

    /// 串行化并设置初始中断状态；之前的测试 panic 过也照常使用
    fn start(enabled: bool) -> std::sync::MutexGuard<'static, ()> {
        let guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        SIE.store(enabled, Ordering::SeqCst);
        guard
    }

    #[test]
    fn nested_restores_only_at_outermost() {
        let _serial = start(true);
        let nest = IntrNest::new();

        nest.push_off(&SIE_OPS);
        assert!(!sie_get());
        nest.push_off(&SIE_OPS);
        nest.pop_off(&SIE_OPS);
        assert!(!sie_get());
        nest.pop_off(&SIE_OPS);
        assert!(sie_get());
    }

    #[test]
    fn stays_off_when_started_off() {
        let _serial = start(false);
        let nest = IntrNest::new();

        nest.push_off(&SIE_OPS);
        nest.push_off(&SIE_OPS);
        nest.pop_off(&SIE_OPS);
        nest.pop_off(&SIE_OPS);
        assert!(!sie_get());
    }

    #[test]
    #[should_panic(expected = "pop_off: unbalanced")]
    fn extra_pop_off_panics() {
        let _serial = start(true);
        let nest = IntrNest::new();

        nest.push_off(&SIE_OPS);
        nest.pop_off(&SIE_OPS);
        nest.pop_off(&SIE_OPS);
    }

    #[test]
    #[should_panic(expected = "pop_off: interruptible")]
    fn pop_off_with_interrupts_on_panics() {
        let _serial = start(false);
        let nest = IntrNest::new();

        nest.push_off(&SIE_OPS);
        sie_on();
        nest.pop_off(&SIE_OPS);
    }

    #[test]
    fn global_nesting_with_default_ops() {
        // 未注册平台操作时全局的 push_off/pop_off 成对使用不会 panic
        push_off();
        push_off();
        pop_off();
        pop_off();
        assert!(!intr_get());
    }
}
