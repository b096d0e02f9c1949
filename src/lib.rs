//! 类 xv6 内核的陷阱分发与块缓冲区缓存
//!
//! 进程、页表与设备驱动由使用本 crate 的内核提供，
//! 通过 [`process`]、[`fault`]、[`driver`] 与 [`platform`] 中的 trait 接入。

#![cfg_attr(not(test), no_std)]
#![warn(rust_2018_idioms)]

#[macro_use]
extern crate bitflags;

extern crate alloc;

#[macro_use]
mod printf;

pub mod consts;
pub mod devintr;
pub mod driver;
pub mod fault;
pub mod fs;
pub mod platform;
#[cfg(all(target_arch = "riscv64", target_os = "none"))]
mod plic;
pub mod process;
pub mod register;
pub mod spinlock;
pub mod trap;

pub use printf::register_console;
