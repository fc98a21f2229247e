//! Text-mode console. Backs the Rust-idiomatic `print!`/`println!`/
//! `clear!` macros as well as the C-shaped `putchar`/`printf`/`printint`/
//! `clearscreen`/`setcursor` names the rest of the core calls directly.

use core::fmt;
use core::fmt::Write as _;

use lazy_static::lazy_static;
use spin::Mutex;
use volatile::Volatile;

const BUFFER_HEIGHT: usize = 25;
const BUFFER_WIDTH: usize = 80;

lazy_static! {
    pub static ref WRITER: Mutex<Writer> = Mutex::new(Writer {
        column_position: 0,
        color_code: ColorCode::new(Color::White, Color::Black),
        buffer: unsafe { &mut *(0xb8000 as *mut Buffer) },
    });
}

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Color {
    Black = 0,
    Blue = 1,
    Green = 2,
    Cyan = 3,
    Red = 4,
    Magenta = 5,
    Brown = 6,
    LightGray = 7,
    DarkGray = 8,
    LightBlue = 9,
    LightGreen = 10,
    LightCyan = 11,
    LightRed = 12,
    Pink = 13,
    Yellow = 14,
    White = 15,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
struct ColorCode(u8);

impl ColorCode {
    const fn new(foreground: Color, background: Color) -> Self {
        Self((background as u8) << 4 | (foreground as u8))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
struct ScreenChar {
    ascii_char: u8,
    color_code: ColorCode,
}

#[repr(transparent)]
struct Buffer {
    chars: [[Volatile<ScreenChar>; BUFFER_WIDTH]; BUFFER_HEIGHT],
}

/// Writes ASCII bytes to the VGA text buffer, wrapping lines at
/// `BUFFER_WIDTH` and scrolling on newline/overflow.
pub struct Writer {
    column_position: usize,
    color_code: ColorCode,
    buffer: &'static mut Buffer,
}

impl Writer {
    pub fn write_byte(&mut self, byte: u8) {
        match byte {
            b'\n' => self.new_line(),
            byte => {
                if self.column_position >= BUFFER_WIDTH {
                    self.new_line();
                }

                let row = BUFFER_HEIGHT - 1;
                let col = self.column_position;
                let color_code = self.color_code;

                self.buffer.chars[row][col].write(ScreenChar {
                    ascii_char: byte,
                    color_code,
                });

                self.column_position += 1;
            }
        }
    }

    fn write_string(&mut self, s: &str) {
        for byte in s.bytes() {
            match byte {
                0x20..=0x7e | b'\n' => self.write_byte(byte),
                _ => self.write_byte(0xfe),
            }
        }
    }

    fn new_line(&mut self) {
        for row in 1..BUFFER_HEIGHT {
            for col in 0..BUFFER_WIDTH {
                let character = self.buffer.chars[row][col].read();
                self.buffer.chars[row - 1][col].write(character);
            }
        }

        self.clear_row(BUFFER_HEIGHT - 1);
        self.column_position = 0;
    }

    fn clear_row(&mut self, row: usize) {
        let blank = ScreenChar {
            ascii_char: b' ',
            color_code: self.color_code,
        };

        for col in 0..BUFFER_WIDTH {
            self.buffer.chars[row][col].write(blank);
        }
    }
}

impl fmt::Write for Writer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_string(s);
        Ok(())
    }
}

/// Like the standard library's `print!`, but to the VGA text buffer.
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::vga_buffer::_print(format_args!($($arg)*)));
}

/// Like the standard library's `println!`, but to the VGA text buffer.
#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", format_args!($($arg)*)));
}

/// Clears the VGA text buffer.
#[macro_export]
macro_rules! clear {
    () => {
        $crate::vga_buffer::_clear()
    };
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    use x86_64::instructions::interrupts;

    interrupts::without_interrupts(|| {
        WRITER
            .lock()
            .write_fmt(args)
            .expect("printing to VGA text buffer failed");
    });
}

#[doc(hidden)]
pub fn _clear() {
    use x86_64::instructions::interrupts;

    interrupts::without_interrupts(|| {
        let mut writer = WRITER.lock();
        for row in 0..BUFFER_HEIGHT {
            writer.clear_row(row);
        }
        writer.column_position = 0;
    });
}

// --- C-shaped names consumed directly by the core (spec §6) ---

/// Write one character to the console, returning it unchanged.
pub fn putchar(c: u8) -> u8 {
    use x86_64::instructions::interrupts;
    interrupts::without_interrupts(|| WRITER.lock().write_byte(c));
    c
}

/// Write a string to the console, returning the number of bytes written.
pub fn printf(s: &str) -> usize {
    use x86_64::instructions::interrupts;
    interrupts::without_interrupts(|| {
        let _ = WRITER.lock().write_str(s);
    });
    s.len()
}

/// Write the decimal representation of `n` to the console, returning the
/// number of digits written.
pub fn printint(n: u32) -> usize {
    use x86_64::instructions::interrupts;
    let mut buf = [0u8; 10];
    let mut i = buf.len();
    let mut value = n;
    if value == 0 {
        i -= 1;
        buf[i] = b'0';
    } else {
        while value > 0 {
            i -= 1;
            buf[i] = b'0' + (value % 10) as u8;
            value /= 10;
        }
    }
    let digits = &buf[i..];
    interrupts::without_interrupts(|| {
        let mut writer = WRITER.lock();
        for &b in digits {
            writer.write_byte(b);
        }
    });
    digits.len()
}

/// Clear the screen.
pub fn clearscreen() {
    _clear();
}

/// Set where the next `putchar` writes on the bottom text row. `y` is
/// accepted to keep the `setcursor(x, y)` call shape but unused: this
/// writer always scrolls and writes at the bottom row rather than
/// tracking an arbitrary row position, so only the column is meaningful.
pub fn setcursor(x: usize, _y: usize) {
    use x86_64::instructions::interrupts;
    interrupts::without_interrupts(|| {
        WRITER.lock().column_position = x;
    });
}

#[test_case]
fn test_println_simple() {
    println!("test_println_simple output");
}

#[test_case]
fn test_println_many() {
    for _ in 0..200 {
        println!("test_println_many output");
    }
}

#[test_case]
fn test_println_output() {
    use x86_64::instructions::interrupts;

    let s = "Some test string that fits on a single line.";
    interrupts::without_interrupts(|| {
        let mut writer = WRITER.lock();
        writeln!(writer, "\n{s}").expect("writeln failed");

        for (i, c) in s.chars().enumerate() {
            let screen_char = writer.buffer.chars[BUFFER_HEIGHT - 2][i].read();
            assert_eq!(char::from(screen_char.ascii_char), c);
        }
    });
}

#[test_case]
fn test_colors() {
    let foreground = Color::White;
    let background = Color::Black;

    let message = "Hello, world!";
    let color_code = ColorCode::new(foreground, background);
    let mut writer = Writer {
        column_position: 0,
        color_code,
        buffer: unsafe { &mut *(0xb8000 as *mut Buffer) },
    };

    writer.write_string(message);

    let buffer = unsafe { &*(0xb8000 as *const Buffer) };
    let screen_char = buffer.chars[BUFFER_HEIGHT - 1][0].read();

    assert_eq!(screen_char.color_code, color_code);
}
