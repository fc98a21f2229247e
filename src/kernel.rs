//! The kernel process body and its four demo user processes.
//!
//! This reproduces the process trace from the original four-process demo:
//! A starts and exits immediately, B yields once, C twice, D three times,
//! with the kernel printing a line every time it regains control. The
//! exact output is spelled out as scenario S1 of the testable properties;
//! nothing here is load-bearing for the scheduler itself, which is
//! exercised directly in `process`'s own tests and in `tests/scheduler.rs`.

use crate::{println, process};

const STACK_A: u64 = 0x10000;
const STACK_B: u64 = 0x11000;
const STACK_C: u64 = 0x12000;
const STACK_D: u64 = 0x13000;

/// Runs as PID 0. Creates the four demo user processes, then yields in a
/// loop for as long as any of them is still READY.
pub fn kernel_process() {
    process::create_proc(proc_a, STACK_A);
    process::create_proc(proc_b, STACK_B);
    process::create_proc(proc_c, STACK_C);
    process::create_proc(proc_d, STACK_D);

    println!("Kernel Process Started");

    while process::ready_process_count() > 0 {
        process::yield_now();
        println!("Kernel Process Resumed");
    }

    println!("Kernel Process Terminated");
}

extern "C" fn proc_a() {
    println!("User Process A Start");
    process::exit();
}

extern "C" fn proc_b() {
    println!("User Process B Start");
    process::yield_now();
    println!("User Process B Resumed 1st");
    process::exit();
}

extern "C" fn proc_c() {
    println!("User Process C Start");
    process::yield_now();
    println!("User Process C Resumed 1st");
    process::yield_now();
    println!("User Process C Resumed 2nd");
    process::exit();
}

extern "C" fn proc_d() {
    println!("User Process D Start");
    process::yield_now();
    println!("User Process D Resumed 1st");
    process::yield_now();
    println!("User Process D Resumed 2nd");
    process::yield_now();
    println!("User Process D Resumed 3rd");
    process::exit();
}
