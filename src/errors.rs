//! Crate-wide error type for boot/init-time fallibility.
//!
//! The file-system and floppy APIs return their own small integer codes
//! (see `fat` and `fdc`); this type exists underneath that surface for
//! the things Rust itself demands a `Result` for, such as page mapping
//! during heap setup.

use thiserror_no_std::Error;
use x86_64::structures::paging::mapper::MapToError;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("out of memory: {0}")]
    OutOfMemory(&'static str),
    #[error("internal invariant violated: {0}")]
    Internal(&'static str),
}

impl From<MapToError<x86_64::structures::paging::Size4KiB>> for Error {
    fn from(e: MapToError<x86_64::structures::paging::Size4KiB>) -> Self {
        match e {
            MapToError::FrameAllocationFailed => Error::OutOfMemory("frame allocation failed"),
            MapToError::ParentEntryHugePage => {
                Error::Internal("parent page table entry is a huge page")
            }
            MapToError::PageAlreadyMapped(_) => Error::Internal("page already mapped"),
        }
    }
}
