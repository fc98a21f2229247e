#![no_std]
#![cfg_attr(test, no_main)]
#![feature(custom_test_frameworks)]
#![feature(abi_x86_interrupt)]
#![feature(naked_functions)]
#![test_runner(crate::test_runner)]
#![reexport_test_harness_main = "test_main"]

extern crate alloc;

use core::panic::PanicInfo;

#[cfg(test)]
use bootloader::{entry_point, BootInfo};

/// The version of the kernel.
pub const KERNEL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod allocator;
pub mod dma;
pub mod errors;
pub mod fat;
pub mod fdc;
pub mod gdt;
pub mod init;
pub mod interrupts;
pub mod irq;
pub mod kernel;
pub mod keyboard;
pub mod memory;
pub mod port;
pub mod process;
pub mod serial;
pub mod syscall;
pub mod vga_buffer;

/// Spin on `hlt` forever. The terminal state after a fatal init failure,
/// or after the kernel process itself terminates.
pub fn hlt_loop() -> ! {
    loop {
        x86_64::instructions::hlt();
    }
}

/// Implemented for every zero-argument test function so `test_runner` can
/// print its name before and its result after running it.
pub trait Testable {
    fn run(&self);
}

impl<T> Testable for T
where
    T: Fn(),
{
    fn run(&self) {
        serial_print!("{}...\t", core::any::type_name::<T>());

        self();

        serial_println!("[OK]");
    }
}

/// The `#[test_runner]` entry point: run every collected `#[test_case]`
/// function in turn, then exit QEMU successfully. A panicking test case
/// is handled by `test_panic_handler` instead of returning here.
pub fn test_runner(tests: &[&dyn Testable]) {
    serial_println!("Running {} tests...", tests.len());
    for test in tests {
        test.run();
    }

    exit_qemu(QemuExitCode::Success);
}

/// Installed as the panic handler in test builds: reports the panic over
/// serial and exits QEMU with a failure code rather than unwinding (which
/// a freestanding kernel cannot do).
pub fn test_panic_handler(info: &PanicInfo) -> ! {
    serial_println!("[failed]\n");
    serial_println!("Error: {}\n", info);

    exit_qemu(QemuExitCode::Failed);
    hlt_loop();
}

/// The QEMU exit code, written to the `isa-debug-exit` port (0xF4). QEMU
/// maps `0x10`/`0x11` to the process exit codes `33`/`35` configured in
/// `Cargo.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum QemuExitCode {
    Success = 0x10,
    Failed = 0x11,
}

/// Write `exit_code` to the `isa-debug-exit` device, which QEMU interprets
/// as a request to exit with a corresponding process status.
pub fn exit_qemu(exit_code: QemuExitCode) {
    use x86_64::instructions::port::Port;

    unsafe {
        let mut port = Port::new(0xF4);
        port.write(exit_code as u32);
    }
}

#[cfg(test)]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    test_panic_handler(info)
}

#[cfg(test)]
entry_point!(test_kernel_main);

/// Entry point used only when this crate is itself built as a `cargo
/// test` binary (unit `#[test_case]`s embedded in library modules).
#[cfg(test)]
fn test_kernel_main(boot_info: &'static BootInfo) -> ! {
    init::init(boot_info).expect("boot-time init failed");
    test_main();
    hlt_loop();
}
