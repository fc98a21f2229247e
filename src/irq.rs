//! Cooperative IRQ-wait primitive.
//!
//! Bridges an ISR (which only records that an interrupt happened) and
//! mainline driver code (which blocks until it has). One `irq_wait(n)`
//! consumes one occurrence; occurrences do not accumulate beyond one.

use core::sync::atomic::{AtomicBool, Ordering};
use x86_64::instructions::{hlt, interrupts};

const IRQ_COUNT: usize = 16;

static OCCURRED: [AtomicBool; IRQ_COUNT] = [
    AtomicBool::new(false), AtomicBool::new(false), AtomicBool::new(false), AtomicBool::new(false),
    AtomicBool::new(false), AtomicBool::new(false), AtomicBool::new(false), AtomicBool::new(false),
    AtomicBool::new(false), AtomicBool::new(false), AtomicBool::new(false), AtomicBool::new(false),
    AtomicBool::new(false), AtomicBool::new(false), AtomicBool::new(false), AtomicBool::new(false),
];

/// Called from an ISR to record that IRQ `n` has fired.
pub fn signal(n: u8) {
    if let Some(flag) = OCCURRED.get(n as usize) {
        flag.store(true, Ordering::SeqCst);
    }
}

/// Block until IRQ `n` has fired since the last call to `irq_wait(n)`.
///
/// Spins on `hlt` between polls so the CPU idles rather than busy-waits;
/// interrupts must already be enabled by the caller.
pub fn irq_wait(n: u8) {
    loop {
        if let Some(flag) = OCCURRED.get(n as usize) {
            if flag.swap(false, Ordering::SeqCst) {
                return;
            }
        }
        if interrupts::are_enabled() {
            hlt();
        }
    }
}
