//! Fixed-offset binary records.
//!
//! On-disk structures are described by a static [`Layout`] table (field name,
//! byte offset, width). A single generic [`RecordView`] decodes any field of a
//! bounds-checked window and a single generic [`RecordBuilder`] encodes them,
//! with the byte order chosen by a `byteorder` type parameter.
//!
//! Records whose real size is smaller than their declared maximum (a length
//! prefix followed by a variable tail) report both through the [`Record`]
//! trait: `MAX_SIZE` is what a caller reserves before the length is known,
//! [`Record::occupied_size`] is what the record actually uses.

#![no_std]

#[cfg(not(target_os = "none"))]
extern crate std;

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use thiserror::Error;

mod layout;
mod value;

pub use crate::layout::*;
pub use crate::value::*;

pub use byteorder::{BigEndian, ByteOrder, LittleEndian};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("{record}: need {needed} bytes at offset {offset}, only {available} available")]
    Truncated {
        record: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("{record}: invalid {field} at offset {offset}: {reason}")]
    Malformed {
        record: &'static str,
        field: &'static str,
        offset: usize,
        reason: String,
    },
}

pub type Result<T> = core::result::Result<T, Error>;

/// A structure with a byte-exact on-disk form.
///
/// Implementors never perform I/O. They copy what they need out of the
/// caller's buffer and do not borrow it past `decode`.
pub trait Record: Sized {
    type Error: From<Error>;

    /// Name used in decode errors and diagnostic listings.
    const NAME: &'static str;

    /// Upper bound on the encoded size.
    const MAX_SIZE: usize;

    /// Bytes this instance occupies on disk; never more than `MAX_SIZE`.
    fn occupied_size(&self) -> usize;

    /// Decodes the record starting at `offset` in `data`. Reads at most
    /// `occupied_size()` bytes of the result.
    fn decode(data: &[u8], offset: usize) -> core::result::Result<Self, Self::Error>;

    /// Encodes into a fresh buffer of exactly `occupied_size()` bytes.
    fn encode(&self) -> Vec<u8>;

    /// Typed `(name, value)` listing of the decoded fields.
    fn fields(&self) -> Vec<(&'static str, FieldValue)>;

    fn max_size(&self) -> usize {
        Self::MAX_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn error_messages_name_record_and_offset() {
        let e = Error::Truncated {
            record: "GPTHeader",
            offset: 512,
            needed: 512,
            available: 100,
        };
        assert_eq!(
            e.to_string(),
            "GPTHeader: need 512 bytes at offset 512, only 100 available"
        );
    }
}
