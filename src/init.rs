//! Boot-time initialization sequence, run once from `kernel_main`.
//!
//! Fixed order: GDT+TSS, IDT + PIC remap, heap mapping, physical-memory
//! offset capture, FDC bring-up, FAT mount, then handing off to the
//! scheduler via `process::start_kernel`. Any failure before the
//! file-system is mounted is unrecoverable — this kernel has exactly one
//! disk and no fallback — so it logs to serial and halts rather than
//! returning into degraded operation.

use bootloader::BootInfo;
use x86_64::VirtAddr;

use crate::errors::Error;
use crate::{allocator, fdc, gdt, interrupts, keyboard, memory, serial_println};

/// Run every boot-time stage up to (but not including) handing control to
/// the kernel process. Returns `Err` only for stages that have a
/// `Result`-shaped internal failure mode (heap mapping); device
/// bring-up failures are reported separately since the kernel cannot
/// usefully continue in either case.
pub fn init(boot_info: &'static BootInfo) -> Result<(), Error> {
    gdt::init();
    interrupts::init();

    let physical_memory_offset = VirtAddr::new(boot_info.physical_memory_offset);
    let mut mapper = unsafe { memory::init(physical_memory_offset) };
    let mut frame_allocator = unsafe { memory::BootInfoFrameAllocator::init(&boot_info.memory_map) };
    allocator::init_heap(&mut mapper, &mut frame_allocator)?;

    memory::set_physical_memory_offset(physical_memory_offset);

    keyboard::initkeymap();

    x86_64::instructions::interrupts::enable();

    if let Err(e) = fdc::floppy_init() {
        serial_println!("floppy_init failed: {:?}", e);
        crate::hlt_loop();
    }

    crate::fat::init_fs();

    Ok(())
}
