//! 定义系统内核的输出方法

use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicPtr, Ordering};

use crate::spinlock::SpinLock;

/// 用于表示是否已经有执行流触发了 panic。
pub(crate) static PANICKED: AtomicBool = AtomicBool::new(false);

/// 控制台输出单个字节的函数，启动时由平台注册
static CONSOLE: AtomicPtr<()> = AtomicPtr::new(default_putc as fn(u8) as *mut ());

#[cfg(not(test))]
fn default_putc(_c: u8) {}

#[cfg(test)]
fn default_putc(c: u8) {
    use std::io::Write;
    let _ = std::io::stdout().write_all(&[c]);
}

/// 注册控制台输出函数，之后的 `print!`/`println!` 都经由它输出。
pub fn register_console(putc: fn(u8)) {
    CONSOLE.store(putc as *mut (), Ordering::Release);
}

/// 零大小类型（ZST）的打印结构体
struct Print;

impl Print {
    fn print(&self, c: u8) {
        let ptr = CONSOLE.load(Ordering::Acquire);
        // SAFETY: 指针只来自 `default_putc` 或 `register_console` 传入的 `fn(u8)`
        let putc: fn(u8) = unsafe { core::mem::transmute(ptr) };
        putc(c);
    }
}

impl fmt::Write for Print {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.print(byte);
        }
        Ok(())
    }
}

/// 核心打印函数（被宏调用）
///
/// # 功能说明
/// 根据系统状态决定是否加锁输出：
/// - 当系统处于panic状态时，直接输出（不加锁），
///   避免 panic 发生在持有打印锁期间时再次获取而卡死；
/// - 正常状态下使用自旋锁使每次输出完整不被交错。
pub fn _print(args: fmt::Arguments<'_>) {
    use fmt::Write;
    static PRINT: SpinLock<()> = SpinLock::new((), "print");

    if PANICKED.load(Ordering::Relaxed) {
        let _ = Print.write_fmt(args);
    } else {
        let guard = PRINT.lock();
        let _ = Print.write_fmt(args);
        drop(guard);
    }
}

/// 在终端输出一串字符
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {
        $crate::printf::_print(format_args!($($arg)*));
    };
}

/// 在终端输出一行字符
#[macro_export]
macro_rules! println {
    () => {$crate::print!("\n")};
    ($fmt:expr) => {$crate::print!(concat!($fmt, "\n"))};
    ($fmt:expr, $($arg:tt)*) => {
        $crate::print!(concat!($fmt, "\n"), $($arg)*)
    };
}

/// 全局panic处理函数，仅在裸机构建中存在
///
/// 打印 panic 信息，设置全局 panic 标志，然后挂起本硬件线程。
#[cfg(all(target_os = "none", not(test)))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo<'_>) -> ! {
    crate::println!("{}", info);
    PANICKED.store(true, Ordering::Relaxed);
    loop {
        core::hint::spin_loop();
    }
}
