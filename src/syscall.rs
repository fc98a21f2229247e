//! Context-switch protocol: system call 0x01, raised as software interrupt
//! 0x80. This is the only systemcall the kernel defines; its entire job is
//! to save the outgoing process's register file and restore the incoming
//! one, atomically from the calling code's perspective.

use core::arch::asm;

use crate::process;

/// Raise the context-switch trap. The caller places `1` (the only defined
/// syscall number) in RAX; the scheduling decision itself (which process
/// is `running`/`next`) has already been made by `process::yield_now` or
/// `process::exit` before this is called, so no further arguments are
/// required across the trap boundary.
pub fn context_switch() {
    unsafe {
        asm!("int 0x80", in("rax") 1u64, options(nostack));
    }
}

/// Called from the naked trap entry with a pointer to the just-saved
/// register file (which doubles as the outgoing process's new stack
/// pointer). Returns the incoming process's saved stack pointer, to be
/// loaded into RSP before `iretq`.
extern "C" fn switch_trampoline(outgoing_rsp: u64) -> u64 {
    process::switch(outgoing_rsp)
}

/// Raw trap entry for vector 0x80, installed via `idt[0x80].set_handler_addr`
/// rather than the typed `x86-interrupt` ABI so every general-purpose
/// register can be saved and restored by hand. The field order here must
/// match `process::Context` exactly.
#[naked]
pub unsafe extern "C" fn syscall_isr() {
    asm!(
        "push rax",
        "push rbx",
        "push rcx",
        "push rdx",
        "push rsi",
        "push rdi",
        "push rbp",
        "push r8",
        "push r9",
        "push r10",
        "push r11",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "mov rdi, rsp",
        "call {switch}",
        "mov rsp, rax",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop r11",
        "pop r10",
        "pop r9",
        "pop r8",
        "pop rbp",
        "pop rdi",
        "pop rsi",
        "pop rdx",
        "pop rcx",
        "pop rbx",
        "pop rax",
        "iretq",
        switch = sym switch_trampoline,
        options(noreturn),
    );
}
