#![no_std]
#![allow(non_upper_case_globals)]

#[cfg(not(target_os = "none"))]
extern crate std;

extern crate alloc;

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;
use fixed_record::{BigEndian, Field, FieldKind, FieldValue, Layout, Record};
use log::trace;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

mod hfs_strings;
pub mod internal;

pub use crate::hfs_strings::{fast_unicode_compare, fold};
pub use crate::internal::*;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] fixed_record::Error),
    #[error("name has {0} UTF-16 units, at most 255 allowed")]
    NameTooLong(usize),
    #[error("keyLength {declared} disagrees with the {actual} bytes of parentID and nodeName")]
    KeyLengthMismatch { declared: u16, actual: u16 },
}

pub type Result<T> = core::result::Result<T, Error>;

pub const HFS_MAX_NAME_UNITS: usize = 255;

const UNISTR_LENGTH: Field = Field::new("length", 0, FieldKind::U16);

static HFS_UNISTR255: Layout = Layout::new("HFSUniStr255", &[UNISTR_LENGTH], 2);

/// Length-prefixed UTF-16 name, at most 255 units. The on-disk length field
/// is always derived from the units, so the two cannot disagree.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct HFSUniStr255 {
    unicode: Vec<u16>,
}

impl HFSUniStr255 {
    pub fn from_units(unicode: Vec<u16>) -> Result<Self> {
        if unicode.len() > HFS_MAX_NAME_UNITS {
            return Err(Error::NameTooLong(unicode.len()));
        }
        Ok(Self { unicode })
    }

    /// Canonically decomposed form of `s`, which is how HFS+ stores names
    /// on disk. Use this for names typed by a user before a catalog lookup.
    pub fn from_str_nfd(s: &str) -> Result<Self> {
        let decomposed: String = s.nfd().collect();
        Self::from_units(decomposed.encode_utf16().collect())
    }

    pub fn units(&self) -> &[u16] {
        &self.unicode
    }

    pub fn len(&self) -> usize {
        self.unicode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unicode.is_empty()
    }

    /// Encoded size: the 2-byte length plus 2 bytes per unit.
    pub fn byte_length(&self) -> usize {
        2 + 2 * self.unicode.len()
    }

    pub fn fast_cmp(&self, other: &Self) -> Ordering {
        fast_unicode_compare(&self.unicode, &other.unicode)
    }
}

impl FromStr for HFSUniStr255 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_units(s.encode_utf16().collect())
    }
}

impl Record for HFSUniStr255 {
    type Error = Error;

    const NAME: &'static str = "HFSUniStr255";
    const MAX_SIZE: usize = 2 + 2 * HFS_MAX_NAME_UNITS;

    fn occupied_size(&self) -> usize {
        self.byte_length()
    }

    fn decode(data: &[u8], offset: usize) -> Result<Self> {
        let view = HFS_UNISTR255.view::<BigEndian>(data, offset)?;
        let length = view.u16(&UNISTR_LENGTH) as usize;
        if length > HFS_MAX_NAME_UNITS {
            return Err(view
                .malformed(&UNISTR_LENGTH, alloc::format!("{length} exceeds 255"))
                .into());
        }
        let view = view.extend(data, 2 + 2 * length)?;
        Ok(Self {
            unicode: view.units(2, length)?,
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut b = HFS_UNISTR255.builder::<BigEndian>(self.byte_length());
        b.u16(&UNISTR_LENGTH, self.unicode.len() as u16)
            .units(2, &self.unicode);
        b.finish()
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("length", FieldValue::Unsigned(self.unicode.len() as u64)),
            ("unicode", FieldValue::Text(alloc::format!("{self}"))),
        ]
    }
}

impl fmt::Display for HFSUniStr255 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for ch in char::decode_utf16(self.unicode.iter().copied()) {
            write!(f, "{}", ch.unwrap_or(char::REPLACEMENT_CHARACTER))?;
        }
        Ok(())
    }
}

impl fmt::Debug for HFSUniStr255 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"")?;
        for ch in char::decode_utf16(self.unicode.iter().copied()) {
            match ch {
                Ok(c) => write!(f, "{}", c.escape_debug())?,
                Err(e) => write!(f, "\\u{{{:04X}}}", e.unpaired_surrogate())?,
            }
        }
        write!(f, "\"")
    }
}

/// A key as stored in some B-tree. Only catalog keys are decoded here; keys
/// of other trees are carried as raw bytes.
#[derive(Debug, Clone)]
pub enum BTKey {
    Catalog(HFSPlusCatalogKey),
    Raw(Vec<u8>),
}

impl BTKey {
    fn kind_rank(&self) -> u8 {
        match self {
            BTKey::Catalog(_) => 0,
            BTKey::Raw(_) => 1,
        }
    }
}

impl PartialOrd for BTKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BTKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (BTKey::Catalog(a), BTKey::Catalog(b)) => a.cmp(b),
            (BTKey::Raw(a), BTKey::Raw(b)) => a.cmp(b),
            _ => {
                // A single tree never mixes key kinds; this order only has to
                // be consistent, not meaningful.
                trace!("comparing B-tree keys of different kinds");
                self.kind_rank().cmp(&other.kind_rank())
            }
        }
    }
}

impl PartialEq for BTKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BTKey {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn unistr_layout() -> Result<()> {
        let name: HFSUniStr255 = "Ab".parse()?;
        assert_eq!(name.byte_length(), 6);
        assert_eq!(name.encode(), vec![0, 2, 0, b'A', 0, b'b']);
        assert_eq!(HFSUniStr255::decode(&name.encode(), 0)?, name);
        Ok(())
    }

    #[test]
    fn unistr_empty() -> Result<()> {
        let name = HFSUniStr255::default();
        assert!(name.is_empty());
        assert_eq!(name.encode(), vec![0, 0]);
        assert_eq!(name.occupied_size(), 2);
        Ok(())
    }

    #[test]
    fn unistr_rejects_256_units() {
        assert_eq!(
            HFSUniStr255::from_units(vec![b'x' as u16; 256]),
            Err(Error::NameTooLong(256))
        );
        assert!(HFSUniStr255::from_units(vec![b'x' as u16; 255]).is_ok());
    }

    #[test]
    fn unistr_decode_rejects_oversized_length() {
        let mut data = vec![0x01, 0x00];
        data.resize(2 + 512, 0);
        match HFSUniStr255::decode(&data, 0) {
            Err(Error::Decode(fixed_record::Error::Malformed { field, .. })) => {
                assert_eq!(field, "length")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unistr_decode_does_not_zero_fill() {
        // Claims 3 units but only carries 2.
        let data = [0, 3, 0, b'a', 0, b'b'];
        assert!(matches!(
            HFSUniStr255::decode(&data, 0),
            Err(Error::Decode(fixed_record::Error::Truncated { .. }))
        ));
    }

    #[test]
    fn unistr_nfd() -> Result<()> {
        let composed: HFSUniStr255 = "\u{00C9}t\u{00E9}".parse()?;
        let decomposed = HFSUniStr255::from_str_nfd("\u{00C9}t\u{00E9}")?;
        assert_eq!(composed.len(), 3);
        assert_eq!(decomposed.len(), 5);
        assert_eq!(decomposed.units()[..2], [0x0045, 0x0301]);
        Ok(())
    }

    #[test]
    fn unistr_display_handles_surrogates() -> Result<()> {
        let name: HFSUniStr255 = "a\u{1F600}".parse()?;
        assert_eq!(name.len(), 3);
        assert_eq!(name.to_string(), "a\u{1F600}");
        let broken = HFSUniStr255::from_units(vec![0xD800, b'x' as u16])?;
        assert_eq!(broken.to_string(), "\u{FFFD}x");
        assert_eq!(alloc::format!("{broken:?}"), "\"\\u{D800}x\"");
        Ok(())
    }

    #[test]
    fn btkey_mixed_kinds_are_ordered_by_kind() -> Result<()> {
        let cat = BTKey::Catalog(HFSPlusCatalogKey::from_parts(2, "a")?);
        let raw = BTKey::Raw(vec![0]);
        assert_eq!(cat.cmp(&raw), Ordering::Less);
        assert_eq!(raw.cmp(&cat), Ordering::Greater);
        assert_ne!(cat, raw);
        Ok(())
    }

    #[test]
    fn btkey_same_kind_delegates() -> Result<()> {
        let a = BTKey::Catalog(HFSPlusCatalogKey::from_parts(2, "Apple")?);
        let b = BTKey::Catalog(HFSPlusCatalogKey::from_parts(2, "apple")?);
        assert_eq!(a, b);
        assert!(BTKey::Raw(vec![1]) < BTKey::Raw(vec![2]));
        Ok(())
    }
}
