#![no_std]
#![no_main]

use core::panic::PanicInfo;

use tinykernel::{exit_qemu, process, serial_print, serial_println, QemuExitCode};

/// Exercises the round-robin fairness and resource-exhaustion properties
/// (scenarios S2 and S5) end to end, through the real INT 0x80 context
/// switch rather than calling `process::switch` directly. Does not need
/// the heap, the FDC, or the FAT mount, so only GDT/IDT bring-up runs
/// before the scheduler itself is put to work.
#[no_mangle]
pub extern "C" fn _start() -> ! {
    tinykernel::gdt::init();
    tinykernel::interrupts::init();
    x86_64::instructions::interrupts::enable();

    process::start_kernel(test_kernel_body).expect("process table full at boot");

    serial_println!("[OK]");
    exit_qemu(QemuExitCode::Success);

    loop {}
}

/// Runs as PID 0, the way the real `kernel::kernel_process` does, so the
/// invariant "PID 0 is the kernel" holds for the rest of this test.
fn test_kernel_body() {
    fairness_round_robin();
    resource_exhaustion();
}

/// S2: five processes yielding a different number of times before exiting
/// must all run to completion with none starved, in round-robin order.
fn fairness_round_robin() {
    serial_print!("scheduler::fairness_round_robin...\t");

    static STACKS: [u64; 5] = [0x40000, 0x41000, 0x42000, 0x43000, 0x44000];

    extern "C" fn once_then_exit() {
        process::yield_now();
        process::exit();
    }

    extern "C" fn thrice_then_exit() {
        process::yield_now();
        process::yield_now();
        process::yield_now();
        process::exit();
    }

    extern "C" fn exits_immediately() {
        process::exit();
    }

    process::create_proc(exits_immediately, STACKS[0]);
    process::create_proc(once_then_exit, STACKS[1]);
    process::create_proc(thrice_then_exit, STACKS[2]);
    process::create_proc(thrice_then_exit, STACKS[3]);
    process::create_proc(once_then_exit, STACKS[4]);

    while process::ready_process_count() > 0 {
        process::yield_now();
    }

    assert_eq!(process::ready_process_count(), 0);
}

/// S5: creating processes past the table's capacity must fail cleanly,
/// leaving PID 0 (the kernel, already registered by the time this test
/// runs its own `_start`) untouched. `MAX_PROCS` includes that kernel
/// slot, so at most `MAX_PROCS - 1` more processes can ever be created
/// here, on top of whichever slots `fairness_round_robin` already used.
fn resource_exhaustion() {
    serial_print!("scheduler::resource_exhaustion...\t");

    extern "C" fn body() {}

    let mut last_rc = 0;
    let mut created = 0usize;
    for i in 0..process::MAX_PROCS {
        let stack_top = 0x50000 + (i as u64) * 0x1000;
        last_rc = process::create_proc(body, stack_top);
        if last_rc != 0 {
            break;
        }
        created += 1;
    }

    assert_eq!(last_rc, -1, "table should refuse creation once full");
    assert!(created < process::MAX_PROCS);
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    tinykernel::test_panic_handler(info)
}
