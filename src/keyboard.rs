//! PS/2 keyboard collaborator: scancode decoding and blocking line input.
//!
//! IRQ 1 only ever pushes a raw scancode into a bounded ring buffer; all
//! decoding and the blocking `getchar`/`scanf` consumers run at mainline
//! (non-interrupt) level, matching this kernel's cooperative model where
//! ISRs never themselves block or reschedule.

use crossbeam_queue::ArrayQueue;
use lazy_static::lazy_static;
use pc_keyboard::{layouts, DecodedKey, HandleControl, Keyboard, ScancodeSet1};
use spin::Mutex;
use x86_64::instructions::{hlt, interrupts};

const QUEUE_CAPACITY: usize = 100;

lazy_static! {
    static ref SCANCODE_QUEUE: ArrayQueue<u8> = ArrayQueue::new(QUEUE_CAPACITY);
    static ref KEYBOARD: Mutex<Keyboard<layouts::Us104Key, ScancodeSet1>> = Mutex::new(
        Keyboard::new(ScancodeSet1::new(), layouts::Us104Key, HandleControl::Ignore)
    );
}

/// Called from the IRQ 1 handler. Never blocks; drops the scancode if the
/// queue is momentarily full rather than stalling the interrupt.
pub fn add_scancode(scancode: u8) {
    let _ = SCANCODE_QUEUE.push(scancode);
}

/// Called once at boot; the scancode map is built lazily on first use, so
/// this exists to give the boot sequence an explicit, named step.
pub fn initkeymap() {
    lazy_static::initialize(&KEYBOARD);
}

fn poll_char() -> Option<char> {
    let scancode = SCANCODE_QUEUE.pop()?;
    let mut keyboard = KEYBOARD.lock();
    if let Ok(Some(event)) = keyboard.add_byte(scancode) {
        if let Some(DecodedKey::Unicode(c)) = keyboard.process_keyevent(event) {
            return Some(c);
        }
    }
    None
}

/// Block until a character is available and return it.
pub fn getchar() -> char {
    loop {
        if let Some(c) = poll_char() {
            return c;
        }
        if interrupts::are_enabled() {
            hlt();
        }
    }
}

/// Read a line (up to 99 characters, matching the original line-edit
/// limit) into `buf`, echoing to the console and stopping at newline.
/// Returns the number of characters read.
pub fn scanf(buf: &mut [u8; 99]) -> usize {
    let mut len = 0;
    loop {
        let c = getchar();
        match c {
            '\n' | '\r' => {
                crate::vga_buffer::putchar(b'\n');
                break;
            }
            '\u{8}' => {
                if len > 0 {
                    len -= 1;
                }
            }
            _ if len < buf.len() => {
                buf[len] = c as u8;
                len += 1;
                crate::vga_buffer::putchar(c as u8);
            }
            _ => {}
        }
    }
    len
}
