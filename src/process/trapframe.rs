//! 用户进程的陷阱帧（Trap Frame）
//!
//! 跳板页中的汇编在进入内核时把用户寄存器保存到这里，
//! 返回用户空间时再从这里恢复。前五个字段是跳板页下一次
//! 进入内核时需要的信息，由 `user_trap_ret` 在返回前填好。
//! 字段偏移被跳板页汇编直接使用，不能调整顺序。

#[repr(C)]
#[derive(Debug, Default, Clone)]
pub struct TrapFrame {
    /*   0 */ pub kernel_satp: usize,   // 内核页表
    /*   8 */ pub kernel_sp: usize,     // 进程内核栈的栈顶
    /*  16 */ pub kernel_trap: usize,   // user_trap() 的地址
    /*  24 */ pub epc: usize,           // 保存的用户程序计数器
    /*  32 */ pub kernel_hartid: usize, // 保存的内核 tp
    /*  40 */ pub ra: usize,
    /*  48 */ pub sp: usize,
    /*  56 */ pub gp: usize,
    /*  64 */ pub tp: usize,
    /*  72 */ pub t0: usize,
    /*  80 */ pub t1: usize,
    /*  88 */ pub t2: usize,
    /*  96 */ pub s0: usize,
    /* 104 */ pub s1: usize,
    /* 112 */ pub a0: usize,
    /* 120 */ pub a1: usize,
    /* 128 */ pub a2: usize,
    /* 136 */ pub a3: usize,
    /* 144 */ pub a4: usize,
    /* 152 */ pub a5: usize,
    /* 160 */ pub a6: usize,
    /* 168 */ pub a7: usize,
    /* 176 */ pub s2: usize,
    /* 184 */ pub s3: usize,
    /* 192 */ pub s4: usize,
    /* 200 */ pub s5: usize,
    /* 208 */ pub s6: usize,
    /* 216 */ pub s7: usize,
    /* 224 */ pub s8: usize,
    /* 232 */ pub s9: usize,
    /* 240 */ pub s10: usize,
    /* 248 */ pub s11: usize,
    /* 256 */ pub t3: usize,
    /* 264 */ pub t4: usize,
    /* 272 */ pub t5: usize,
    /* 280 */ pub t6: usize,
}

const _: () = assert!(core::mem::size_of::<TrapFrame>() == 288);

/// 跳板页在下一次陷阱时需要的内核信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelReturn {
    pub satp: usize,
    pub sp: usize,
    pub trap: usize,
    pub hartid: usize,
}

impl TrapFrame {
    /// 系统调用返回到 ecall 的下一条指令
    #[inline]
    pub fn admit_ecall(&mut self) {
        self.epc += 4;
    }

    /// 系统调用号，按约定放在 a7
    #[inline]
    pub fn syscall_num(&self) -> usize {
        self.a7
    }

    /// 第 n 个系统调用参数（a0..a5）
    pub fn arg(&self, n: usize) -> usize {
        match n {
            0 => self.a0,
            1 => self.a1,
            2 => self.a2,
            3 => self.a3,
            4 => self.a4,
            5 => self.a5,
            _ => panic!("trapframe: arg {}", n),
        }
    }

    /// 写入系统调用结果，失败时为 -1
    pub fn set_return(&mut self, result: Result<usize, ()>) {
        self.a0 = match result {
            Ok(ret) => ret,
            Err(()) => -1isize as usize,
        };
    }

    /// 填写跳板页下一次进入内核时需要的字段
    pub fn set_kernel_return(&mut self, k: KernelReturn) {
        self.kernel_satp = k.satp;
        self.kernel_sp = k.sp;
        self.kernel_trap = k.trap;
        self.kernel_hartid = k.hartid;
    }
}
