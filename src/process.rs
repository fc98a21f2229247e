//! Process table, round-robin scheduler, and process lifecycle.
//!
//! All mutation happens on the single kernel CPU between cooperative
//! suspension points, so a spinlock around the table is never contended;
//! it exists only to satisfy `Sync` for the `lazy_static` global, matching
//! the rest of this kernel's global-state convention.

use lazy_static::lazy_static;
use spin::Mutex;

/// Maximum number of process-table slots, including the kernel at PID 0.
pub const MAX_PROCS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Kernel,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ready,
    Running,
    Terminated,
}

/// The register file saved across a context switch: callee- and
/// caller-saved general-purpose registers plus the trap return frame
/// (instruction pointer, code segment, flags). Field order mirrors the
/// push order of the INT 0x80 handler in `syscall`, so the handler can
/// treat a pointer to this struct as its own stack pointer.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct Context {
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rbp: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rbx: u64,
    pub rax: u64,
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
}

impl Context {
    const fn zeroed() -> Self {
        Context {
            r15: 0,
            r14: 0,
            r13: 0,
            r12: 0,
            r11: 0,
            r10: 0,
            r9: 0,
            r8: 0,
            rbp: 0,
            rdi: 0,
            rsi: 0,
            rdx: 0,
            rcx: 0,
            rbx: 0,
            rax: 0,
            rip: 0,
            cs: 0,
            rflags: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Process {
    pub pid: usize,
    pub kind: Kind,
    pub status: Status,
    /// Address of this process's saved `Context`, sitting at the top of its
    /// own stack. Loaded into RSP by the trap handler when this process is
    /// switched in.
    pub rsp: u64,
}

impl Process {
    const fn empty() -> Self {
        Process {
            pid: 0,
            kind: Kind::Kernel,
            status: Status::Terminated,
            rsp: 0,
        }
    }
}

struct ProcessTable {
    table: [Process; MAX_PROCS],
    /// Number of slots allocated so far; PIDs are handed out monotonically
    /// and never reused.
    len: usize,
    running: usize,
    next: usize,
}

impl ProcessTable {
    const fn new() -> Self {
        ProcessTable {
            table: [Process::empty(); MAX_PROCS],
            len: 0,
            running: 0,
            next: 0,
        }
    }

    fn ready_user_count(&self) -> usize {
        self.table[..self.len]
            .iter()
            .filter(|p| p.kind == Kind::User && p.status == Status::Ready)
            .count()
    }
}

lazy_static! {
    static ref TABLE: Mutex<ProcessTable> = Mutex::new(ProcessTable::new());
}

/// Register the kernel as PID 0, RUNNING, and call `entry` directly. The
/// kernel runs on the stack already established by the boot loader.
pub fn start_kernel(entry: fn()) -> Result<(), ()> {
    let mut t = TABLE.lock();
    if t.len >= MAX_PROCS {
        return Err(());
    }
    t.table[0] = Process {
        pid: 0,
        kind: Kind::Kernel,
        status: Status::Running,
        rsp: 0,
    };
    t.len = 1;
    t.running = 0;
    drop(t);

    entry();
    Ok(())
}

/// Create a new USER process whose first instruction is `entry`, running
/// on a stack that starts at `stack_top`. Returns 0 on success, -1 if the
/// table is full.
pub fn create_proc(entry: extern "C" fn(), stack_top: u64) -> i32 {
    let mut t = TABLE.lock();
    if t.len >= MAX_PROCS {
        return -1;
    }

    let pid = t.len;

    // Build a synthetic saved context at the top of the process's stack, as
    // though it had already trapped in through INT 0x80: when this process
    // is first switched to, the handler's epilogue pops this frame and
    // `iretq`s into `entry` with `stack_top` as its stack pointer.
    let ctx_addr = stack_top - core::mem::size_of::<Context>() as u64;
    let ctx = unsafe { &mut *(ctx_addr as *mut Context) };
    *ctx = Context::zeroed();
    ctx.rip = entry as usize as u64;
    ctx.rbp = stack_top;
    ctx.cs = crate::gdt::kernel_code_selector();
    ctx.rflags = 0x202; // interrupts enabled

    t.table[pid] = Process {
        pid,
        kind: Kind::User,
        status: Status::Ready,
        rsp: ctx_addr,
    };
    t.len += 1;
    t.next = pid;

    0
}

/// Count USER processes in the READY state.
pub fn ready_process_count() -> usize {
    TABLE.lock().ready_user_count()
}

/// Round-robin over USER slots, starting just after the running process
/// (or from slot 1 if the kernel is running). Sets `next` to the first
/// READY user found and returns the resulting ready count, or 0 if none.
pub fn schedule() -> usize {
    let mut t = TABLE.lock();
    let len = t.len;
    if len <= 1 {
        return 0;
    }

    let running_is_user = t.table[t.running].kind == Kind::User;
    let start = if running_is_user { t.running + 1 } else { 1 };

    for offset in 0..len - 1 {
        let i = 1 + (start - 1 + offset) % (len - 1);
        if t.table[i].kind == Kind::User && t.table[i].status == Status::Ready {
            t.next = i;
            return t.ready_user_count();
        }
    }

    0
}

/// Current PID and whether it is the kernel process.
pub fn running_is_kernel() -> bool {
    let t = TABLE.lock();
    t.table[t.running].kind == Kind::Kernel
}

/// Suspend the caller, letting the scheduler pick who runs next.
///
/// If the kernel yields, `schedule()` first picks a user to hand off to.
/// The caller is marked READY, `schedule()` runs again to choose who
/// resumes, and the context switch is invoked. By the time this call
/// returns to a yielding user process, that process's own record has
/// already been restored to RUNNING by the trap handler.
pub fn yield_now() {
    let caller_is_kernel = running_is_kernel();
    if caller_is_kernel {
        schedule();
    }

    {
        let mut t = TABLE.lock();
        let running = t.running;
        t.table[running].status = Status::Ready;
    }

    schedule();

    crate::syscall::context_switch();
}

/// Terminate the caller. USER processes hand control back to the kernel.
pub fn exit() {
    let mut t = TABLE.lock();
    let running = t.running;
    t.table[running].status = Status::Terminated;
    let caller_is_user = t.table[running].kind == Kind::User;
    if caller_is_user {
        t.next = 0; // kernel
    }
    drop(t);

    if caller_is_user {
        crate::syscall::context_switch();
    }
}

/// Called by the trap handler: persist the outgoing process's stack
/// pointer, switch `running` to `next`, mark it RUNNING if it was READY,
/// and return the incoming process's saved stack pointer.
pub(crate) fn switch(outgoing_rsp: u64) -> u64 {
    let mut t = TABLE.lock();
    let running = t.running;
    t.table[running].rsp = outgoing_rsp;

    let next = t.next;
    t.running = next;
    if t.table[next].status == Status::Ready {
        t.table[next].status = Status::Running;
    }

    t.table[next].rsp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn ready_count_increases_after_create() {
        extern "C" fn body() {}
        let before = ready_process_count();
        let rc = create_proc(body, 0x7000_0000_0000);
        assert_eq!(rc, 0);
        assert!(ready_process_count() > before);
    }
}
