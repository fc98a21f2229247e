//! Floppy Disk Controller driver (NEC uPD765A / Intel 8272A compatible).
//!
//! An IRQ- and DMA-coordinated state machine: commands are written one byte
//! at a time through the data FIFO once the controller signals it is ready
//! (RQM), and sector transfers are carried out by ISA DMA channel 2 while
//! the CPU waits on IRQ 6.

use bit_field::BitField;

use crate::dma;
use crate::irq::irq_wait;
use crate::port::{in8, out8};

const FLOPPY_IRQ: u8 = 6;

// Registers (Main Status / Digital Output / Data FIFO / Configuration Control).
const DOR: u16 = 0x3F2;
const MSR: u16 = 0x3F4;
const DATA_FIFO: u16 = 0x3F5;
const CCR: u16 = 0x3F7;

const MSR_RQM: u8 = 0x80;

// Command opcodes.
const CMD_SPECIFY: u8 = 3;
const CMD_WRITE_DATA: u8 = 5;
const CMD_READ_DATA: u8 = 6;
const CMD_RECALIBRATE: u8 = 7;
const CMD_SENSE_INTERRUPT: u8 = 8;
const CMD_VERSION: u8 = 16;
const CMD_CONFIGURE: u8 = 19;
const CMD_LOCK: u8 = 20;

const MFM: u8 = 0x40;
const MT: u8 = 0x80;

const COMMAND_TIMEOUT_ITERS: usize = 600;
const MAX_RW_ATTEMPTS: usize = 20;

/// Sector size in bytes; every transfer in this driver is sector-granular.
pub const SECTOR_SIZE: usize = 512;

/// Errors surfaced by the floppy driver, matching the kind taxonomy the
/// rest of the kernel uses for device failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdcError {
    /// Controller did not identify as the expected revision at init.
    HardwareAbsent,
    /// ST1's no-data bit was set: the sector genuinely isn't there.
    NoData,
    /// All retry attempts were exhausted on a transient error.
    RetriesExhausted,
}

/// Poll MSR until RQM is set, then write `cmd` to the data FIFO. Bounded by
/// a fixed iteration count so a wedged controller cannot hang the kernel.
fn write_cmd(cmd: u8) {
    for _ in 0..COMMAND_TIMEOUT_ITERS {
        if in8(MSR) & MSR_RQM != 0 {
            out8(DATA_FIFO, cmd);
            return;
        }
    }
}

/// Poll MSR until RQM is set, then read a byte from the data FIFO.
fn read_data() -> u8 {
    for _ in 0..COMMAND_TIMEOUT_ITERS {
        if in8(MSR) & MSR_RQM != 0 {
            return in8(DATA_FIFO);
        }
    }
    0
}

/// Convert a logical block address to cylinder/head/sector using the fixed
/// 2 heads x 18 sectors/track geometry of a 1.44 MB floppy.
pub fn lba_to_chs(lba: u32) -> (u16, u16, u16) {
    let cyl = (lba / 36) as u16;
    let head = ((lba % 36) / 18) as u16;
    let sector = ((lba % 18) + 1) as u16;
    (cyl, head, sector)
}

fn sense_interrupt() -> (u8, u8) {
    write_cmd(CMD_SENSE_INTERRUPT);
    loop {
        if in8(MSR) & MSR_RQM != 0 {
            break;
        }
    }
    let st0 = read_data();
    let cyl = read_data();
    (st0, cyl)
}

fn specify() {
    const SRT: u8 = 8;
    const HLT: u8 = 5;
    const HUT: u8 = 0;
    write_cmd(CMD_SPECIFY);
    write_cmd((SRT << 4) | HUT);
    write_cmd((HLT << 1) | 0);
}

fn drive_select(drive: u8) {
    out8(CCR, 0); // 500 kbps
    specify();
    let mut dor = in8(DOR);
    dor = (dor & 0x0C) | (drive | (1 << (4 + drive)));
    out8(DOR, dor);
}

fn configure(implied_seek: bool, fifo: bool, drive_polling_mode: bool, threshold: u8) {
    write_cmd(CMD_CONFIGURE);
    write_cmd(0);
    let mut byte = 0u8;
    byte.set_bit(6, implied_seek);
    byte.set_bit(5, !fifo);
    byte.set_bit(4, !drive_polling_mode);
    byte |= threshold - 1;
    write_cmd(byte);
    write_cmd(0); // precompensation
}

fn lock() {
    write_cmd(CMD_LOCK);
    read_data();
}

fn reset(first_time: bool) {
    let dor = in8(DOR);
    out8(DOR, 0);
    out8(DOR, dor & 0x8);
    if !first_time {
        irq_wait(FLOPPY_IRQ);
    }
}

fn recalibrate(drive: u8) {
    loop {
        write_cmd(CMD_RECALIBRATE);
        write_cmd(drive);
        irq_wait(FLOPPY_IRQ);
        let (st0, _cyl) = sense_interrupt();
        if st0 & 0x20 != 0 {
            break;
        }
    }
}

/// Bring the controller up: identify it, configure it, lock the config
/// against a later reset, and recalibrate every drive.
pub fn floppy_init() -> Result<(), FdcError> {
    write_cmd(CMD_VERSION);
    if read_data() != 0x90 {
        return Err(FdcError::HardwareAbsent);
    }

    configure(true, true, false, 8);
    lock();
    reset(true);

    for drive in 0..4 {
        recalibrate(drive);
    }

    Ok(())
}

struct RwResult {
    st0: u8,
    st1: u8,
    st2: u8,
}

fn rw_command(drive: u8, head: u16, cyl: u16, sector: u16, eot: u8, command: u8) -> RwResult {
    write_cmd(MFM | MT | command);
    write_cmd(((head as u8) << 2) | drive);
    write_cmd(cyl as u8);
    write_cmd(head as u8);
    write_cmd(sector as u8);
    write_cmd(2); // 512 bytes/sector
    write_cmd(eot);
    write_cmd(0x1B); // GAP1
    write_cmd(0xFF);

    loop {
        if in8(MSR) & MSR_RQM != 0 {
            break;
        }
    }

    let st0 = read_data();
    let st1 = read_data();
    let st2 = read_data();
    let _cyl_out = read_data();
    let _head_out = read_data();
    let _sect_out = read_data();
    read_data(); // always 2, discarded

    RwResult { st0, st1, st2 }
}

/// Classify a result's status bytes: `None` on success, `Some(true)` for a
/// fatal no-data condition, `Some(false)` for a retryable error.
fn decode_error(r: &RwResult) -> Option<bool> {
    let top2 = r.st0 >> 6;
    let retryable = top2 == 2
        || top2 == 3
        || r.st0 & 0x08 != 0
        || r.st1 & 0x80 != 0
        || r.st1 & 0x20 != 0
        || r.st1 & 0x10 != 0
        || r.st1 & 0x04 != 0
        || (r.st1 | r.st2) & 0x01 != 0
        || r.st2 & 0x40 != 0
        || r.st2 & 0x20 != 0
        || r.st2 & 0x10 != 0
        || r.st2 & 0x04 != 0
        || r.st2 & 0x02 != 0;
    let fatal = r.st1 & 0x02 != 0;

    if fatal {
        Some(true)
    } else if retryable {
        Some(false)
    } else {
        None
    }
}

const EOT: u8 = 19;

/// Write `byte_count` bytes from physical address `addr` to `lba` on
/// `drive`. The DMA controller is programmed for one byte fewer than
/// requested, matching the original driver's write-path convention (see
/// the read/write asymmetry noted alongside `floppy_read`).
pub fn floppy_write(drive: u8, lba: u32, addr: u32, byte_count: usize) -> Result<(), FdcError> {
    let dma_count = byte_count - 1;
    let (cyl, head, sector) = lba_to_chs(lba);

    for _ in 0..MAX_RW_ATTEMPTS {
        dma::prepare_write(addr, dma_count);
        drive_select(drive);
        let result = rw_command(drive, head, cyl, sector, EOT, CMD_WRITE_DATA);
        match decode_error(&result) {
            None => return Ok(()),
            Some(true) => return Err(FdcError::NoData),
            Some(false) => continue,
        }
    }
    Err(FdcError::RetriesExhausted)
}

/// Read `byte_count` bytes from `lba` on `drive` into physical address
/// `addr`.
pub fn floppy_read(drive: u8, lba: u32, addr: u32, byte_count: usize) -> Result<(), FdcError> {
    let (cyl, head, sector) = lba_to_chs(lba);

    for _ in 0..MAX_RW_ATTEMPTS {
        dma::prepare_read(addr, byte_count);
        drive_select(drive);
        let result = rw_command(drive, head, cyl, sector, EOT, CMD_READ_DATA);
        match decode_error(&result) {
            None => return Ok(()),
            Some(true) => return Err(FdcError::NoData),
            Some(false) => continue,
        }
    }
    Err(FdcError::RetriesExhausted)
}

#[cfg(test)]
mod tests {
    use super::lba_to_chs;

    #[test_case]
    fn lba_chs_round_trip() {
        for lba in 0u32..2880 {
            let (cyl, head, sector) = lba_to_chs(lba);
            let back = cyl as u32 * 36 + head as u32 * 18 + (sector as u32 - 1);
            assert_eq!(back, lba);
        }
    }
}
