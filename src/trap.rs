//! 中断处理模块，用户或内核模式下发生中断或异常时进行处理

use crate::consts::{KILLED_STATUS, TRAPFRAME};
use crate::devintr::{DevIntr, IntrRouter};
use crate::fault::{handle_page_fault, FaultResolver, PageFault};
use crate::platform::Platform;
use crate::process::{KernelReturn, Sched, SyscallTable, Task};
use crate::register::scause::{self, ScauseType};
use crate::register::sstatus;

/// 陷阱分发
///
/// 持有陷阱处理需要的全部协作者。真实内核中每个 hart 在
/// 跳板页或 kernelvec 进入 Rust 之后构造或取出一个实例并调用。
pub struct TrapHandler<'a, P: Platform, S: Sched> {
    platform: &'a P,
    sched: &'a S,
    router: IntrRouter<'a>,
    faults: &'a dyn FaultResolver,
    syscalls: &'a dyn SyscallTable,
}

impl<'a, P: Platform, S: Sched> TrapHandler<'a, P, S> {
    pub fn new(
        platform: &'a P,
        sched: &'a S,
        router: IntrRouter<'a>,
        faults: &'a dyn FaultResolver,
        syscalls: &'a dyn SyscallTable,
    ) -> Self {
        Self { platform, sched, router, faults, syscalls }
    }

    /// 设置当前 hart 的陷阱向量为 kernelvec
    pub fn trap_init_hart(&self) {
        self.platform.write_stvec(self.platform.kernelvec());
    }

    /// # 功能说明
    /// 处理来自用户空间的中断、异常或系统调用，由跳板页调用。
    ///
    /// # 流程解释
    /// 1. 确认陷阱来自用户模式，陷阱向量改为 kernelvec；
    /// 2. 保存用户 pc，按 scause 分发：
    ///    - 系统调用：已被终止的进程直接退出；否则越过 ecall、开中断、执行调用；
    ///    - 读/写缺页：交给缺页处理，无法修复则标记终止；
    ///    - 设备中断：时钟中断之后需要让出 CPU；
    ///    - 其他：打印现场并标记终止；
    /// 3. 进程已被标记终止则退出，不再返回用户空间；
    /// 4. 否则按需让出 CPU、投递信号，然后返回用户空间。
    ///
    /// # 可能的错误
    /// 陷阱不是来自用户模式时 panic。
    pub fn user_trap(&self, task: &mut dyn Task) {
        let sstatus = self.platform.read_sstatus();
        if !sstatus::is_from_user(sstatus) {
            panic!("usertrap: not from user mode, sstatus={:#x}", sstatus);
        }

        // 在内核中发生的陷阱交给 kernel_trap
        self.platform.write_stvec(self.platform.kernelvec());

        task.trapframe().epc = self.platform.read_sepc();

        let scause = self.platform.read_scause();
        let mut yielding = false;

        match scause::decode(scause) {
            ScauseType::ExcUEcall => {
                if let Some(status) = task.killed() {
                    task.exit(status);
                    return;
                }

                // 返回到 ecall 的下一条指令
                task.trapframe().admit_ecall();

                // 寄存器已经保存完毕，可以响应中断了
                self.platform.intr_on();

                self.syscalls.syscall(task);
            }
            ScauseType::ExcLoadPageFault => self.page_fault(task, PageFault::Load),
            ScauseType::ExcStorePageFault => self.page_fault(task, PageFault::Store),
            cause @ (ScauseType::IntSExt | ScauseType::IntSTimer) => {
                if self.router.devintr(self.platform, self.sched, cause) == Some(DevIntr::Timer) {
                    yielding = true;
                }
            }
            ScauseType::Unknown => {
                println!("usertrap: unexpected scause {:#x}", scause);
                println!(
                    "            sepc={:#x} stval={:#x}",
                    self.platform.read_sepc(),
                    self.platform.read_stval()
                );
                task.set_killed(KILLED_STATUS);
            }
        }

        if let Some(status) = task.killed() {
            task.exit(status);
            return;
        }

        if yielding {
            task.yielding();
        }

        task.deliver_signals();

        self.user_trap_ret(task);
    }

    fn page_fault(&self, task: &mut dyn Task, cause: PageFault) {
        let va = self.platform.read_stval();
        if handle_page_fault(self.faults, task, va, cause).is_err() {
            task.set_killed(KILLED_STATUS);
        }
    }

    /// # 功能说明
    /// 经由跳板页返回用户空间。
    ///
    /// # 流程解释
    /// 1. 关中断，陷阱向量改为跳板页中的 uservec；
    /// 2. 在陷阱帧中填好下一次进入内核所需的页表、内核栈、入口与 hart 号；
    /// 3. sstatus 设为返回用户模式、返回后开中断；
    /// 4. sepc 设为保存的用户 pc，跳转到跳板页中的 userret。
    pub fn user_trap_ret(&self, task: &mut dyn Task) {
        // 切换 stvec 之后、回到用户态之前不能再响应中断
        self.platform.intr_off();

        self.platform.write_stvec(self.platform.uservec());

        let kret = KernelReturn {
            satp: self.platform.read_satp(),
            sp: task.kstack_top(),
            trap: self.platform.usertrap(),
            hartid: self.platform.hart_id(),
        };
        let tf = task.trapframe();
        tf.set_kernel_return(kret);
        let epc = tf.epc;

        self.platform.write_sstatus(sstatus::user_ret_prepare(self.platform.read_sstatus()));
        self.platform.write_sepc(epc);

        self.platform.userret(TRAPFRAME, task.user_satp());
    }

    /// # 功能说明
    /// 处理内核执行期间发生的陷阱，由 kernelvec 调用。
    /// 只接受设备中断；`current` 为当前 hart 上运行的进程（若有），
    /// 时钟中断之后它会让出 CPU。
    ///
    /// # 可能的错误
    /// 陷阱不是来自监督模式、进入时中断仍开启，或原因不是设备中断时 panic。
    pub fn kernel_trap(&self, current: Option<&mut dyn Task>) {
        let sepc = self.platform.read_sepc();
        let sstatus = self.platform.read_sstatus();
        let scause = self.platform.read_scause();

        if !sstatus::is_from_supervisor(sstatus) {
            panic!("kerneltrap: not from supervisor mode");
        }
        if sstatus::intr_enabled(sstatus) {
            panic!("kerneltrap: interrupts enabled");
        }

        match self.router.devintr(self.platform, self.sched, scause::decode(scause)) {
            Some(DevIntr::Timer) => {
                if let Some(task) = current {
                    task.yielding();
                }
            }
            Some(_) => {}
            None => {
                println!("scause {:#x}", scause);
                println!("sepc={:#x} stval={:#x}", sepc, self.platform.read_stval());
                panic!("kerneltrap: unexpected trap");
            }
        }

        // yield 期间可能发生过其他陷阱，恢复 kernelvec 的 sret 需要的寄存器
        self.platform.write_sepc(sepc);
        self.platform.write_sstatus(sstatus);
    }
}
