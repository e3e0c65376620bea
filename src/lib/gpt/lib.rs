//! GUID Partition Table decoding and primary/backup verification.
//!
//! A GPT disk carries two independent copies of its metadata: the primary
//! header at LBA 1 followed by its entry array, and a backup entry array and
//! header at the end of the disk. [`GuidPartitionTable`] reads both through a
//! [`BlockDevice`] and checks them against each other.

#![no_std]

#[cfg(any(feature = "std", test))]
extern crate std;

extern crate alloc;

use alloc::string::String;
use thiserror::Error;

mod device;
mod entry;
mod guid;
mod header;
mod progress;
mod table;

pub use crate::device::*;
pub use crate::entry::*;
pub use crate::guid::*;
pub use crate::header::*;
pub use crate::progress::*;
pub use crate::table::*;

/// Logical block size. GPT metadata is always addressed in 512-byte blocks
/// here.
pub const BLOCK_SIZE: u64 = 512;

/// Ceiling on the entry count a reader will allocate for.
pub const MAX_PARTITION_ENTRIES: u32 = 4096;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{source} (disk offset {disk_offset})")]
    Decode {
        disk_offset: u64,
        source: fixed_record::Error,
    },
    #[error("block device error: {0}")]
    Device(String),
    #[error("cancelled")]
    Cancelled,
    #[error("{0} partition entries exceeds the supported maximum")]
    TooManyEntries(u32),
    #[error("unsupported partition entry size {0}")]
    UnsupportedEntrySize(u32),
    #[error("{0}")]
    Incoherent(&'static str),
}

pub type Result<T> = core::result::Result<T, Error>;
