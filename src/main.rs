#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(tinykernel::test_runner)]
#![reexport_test_harness_main = "test_main"]

use core::panic::PanicInfo;

use bootloader::{entry_point, BootInfo};

use tinykernel::{kernel, println, process};

const KERNEL_NAME: &str = "tinykernel";

entry_point!(kernel_main);

fn kernel_main(boot_info: &'static BootInfo) -> ! {
    println!("{} v{}", KERNEL_NAME, tinykernel::KERNEL_VERSION);

    tinykernel::init::init(boot_info).expect("boot-time init failed");

    #[cfg(test)]
    test_main();

    process::start_kernel(kernel::kernel_process).expect("process table full at boot");

    tinykernel::hlt_loop();
}

#[cfg(not(test))]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    println!("{}", info);

    tinykernel::hlt_loop();
}

#[cfg(test)]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    tinykernel::test_panic_handler(info)
}

#[test_case]
#[allow(clippy::eq_op)]
fn trivial_assertion() {
    assert_eq!(1, 1);
}
