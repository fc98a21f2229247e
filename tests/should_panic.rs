#![no_std]
#![no_main]

use core::panic::PanicInfo;

use tinykernel::{exit_qemu, serial_print, serial_println, QemuExitCode};

#[no_mangle]
pub extern "C" fn _start() -> ! {
    should_fail();
    serial_println!("[test did not panic]");

    exit_qemu(QemuExitCode::Failed);

    loop {}
}

/// Reading from a closed file session must report a distinct sentinel
/// rather than whatever happens to sit in the staging buffer. Asserting
/// the opposite here deliberately fails, exercising the panic harness
/// against this property.
fn should_fail() {
    serial_print!("should_panic::closed_session_read_is_not_open...\t");
    assert_ne!(tinykernel::fat::read_byte(0), tinykernel::fat::NOT_OPEN_SENTINEL);
}

#[panic_handler]
fn panic(_info: &PanicInfo) -> ! {
    serial_println!("[OK]");

    exit_qemu(QemuExitCode::Success);

    loop {}
}
