#![no_std]
#![no_main]

use core::panic::PanicInfo;

use tinykernel::fat::{self, DirectoryEntry};
use tinykernel::{exit_qemu, serial_print, serial_println, QemuExitCode};

/// Scenarios driven against a real block device (S3, S4, S6) live as
/// `#[cfg(test)]` unit tests inside `fat`, exercised against the
/// in-memory `MemoryDisk` double rather than real floppy hardware. This
/// binary instead checks the on-disk structural invariants that hold
/// independent of any device: the directory entry's byte layout and the
/// synthesized root directory's identity.
#[no_mangle]
pub extern "C" fn _start() -> ! {
    directory_entry_matches_8_3_layout();
    root_directory_has_its_synthesized_name();

    serial_println!("[OK]");
    exit_qemu(QemuExitCode::Success);

    loop {}
}

/// 8-byte name + 3-byte extension + 1 attribute byte + 14 reserved bytes
/// + 16-bit starting cluster + 32-bit file size == 32 bytes, matching the
/// on-disk MS-DOS directory entry this core reads and writes directly.
fn directory_entry_matches_8_3_layout() {
    serial_print!("filesystem::directory_entry_matches_8_3_layout...\t");
    assert_eq!(core::mem::size_of::<DirectoryEntry>(), 32);
}

/// The root directory is never itself stored as an entry on disk; it is
/// only ever referenced by the synthesized back-pointer name set up at
/// mount time.
fn root_directory_has_its_synthesized_name() {
    serial_print!("filesystem::root_directory_has_its_synthesized_name...\t");
    assert_eq!(fat::root_directory().name(), b"ROOT    ");
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    tinykernel::test_panic_handler(info)
}
