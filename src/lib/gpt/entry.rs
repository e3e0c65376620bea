use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use bitflags::bitflags;
use fixed_record::{Field, FieldKind, FieldValue, Layout, LittleEndian, Record};

use crate::{BLOCK_SIZE, Guid};

pub const GPT_ENTRY_SIZE: usize = 128;
pub const GPT_NAME_UNITS: usize = 36;

const PARTITION_TYPE_GUID: Field = Field::new("partitionTypeGUID", 0, FieldKind::Bytes(16));
const UNIQUE_PARTITION_GUID: Field =
    Field::new("uniquePartitionGUID", 16, FieldKind::Bytes(16));
const STARTING_LBA: Field = Field::new("startingLBA", 32, FieldKind::U64);
const ENDING_LBA: Field = Field::new("endingLBA", 40, FieldKind::U64);
const ATTRIBUTE_BITS: Field = Field::new("attributeBits", 48, FieldKind::U64);
const PARTITION_NAME: Field =
    Field::new("partitionName", 56, FieldKind::Bytes(2 * GPT_NAME_UNITS));

static GPT_ENTRY: Layout = Layout::new(
    "GPTEntry",
    &[
        PARTITION_TYPE_GUID,
        UNIQUE_PARTITION_GUID,
        STARTING_LBA,
        ENDING_LBA,
        ATTRIBUTE_BITS,
        PARTITION_NAME,
    ],
    GPT_ENTRY_SIZE,
);

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GptAttributes: u64 {
        const PLATFORM_REQUIRED = 1 << 0;
        const EFI_IGNORE = 1 << 1;
        const LEGACY_BIOS_BOOTABLE = 1 << 2;
        // Bits 48..64 belong to the partition type.
        const _ = !0;
    }
}

impl GptAttributes {
    pub fn type_specific(self) -> u16 {
        (self.bits() >> 48) as u16
    }
}

/// One 128-byte partition entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GptEntry {
    pub partition_type_guid: Guid,
    pub unique_partition_guid: Guid,
    pub starting_lba: u64,
    pub ending_lba: u64,
    pub attributes: GptAttributes,
    pub partition_name: [u16; GPT_NAME_UNITS],
}

impl GptEntry {
    /// An entry is in use when its type GUID is non-zero.
    pub fn is_used(&self) -> bool {
        !self.partition_type_guid.is_zero()
    }

    /// Name up to the first NUL, lossily decoded from UTF-16.
    pub fn name(&self) -> String {
        let end = self
            .partition_name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(GPT_NAME_UNITS);
        String::from_utf16_lossy(&self.partition_name[..end])
    }

    /// Byte offset of the first block, or `None` past the 64-bit range.
    pub fn start_offset(&self) -> Option<u64> {
        self.starting_lba.checked_mul(BLOCK_SIZE)
    }

    /// Size in bytes; zero for unused or inverted entries, `None` when the
    /// block range does not fit in 64 bits of bytes.
    pub fn length(&self) -> Option<u64> {
        if !self.is_used() || self.ending_lba < self.starting_lba {
            return Some(0);
        }
        (self.ending_lba - self.starting_lba)
            .checked_add(1)?
            .checked_mul(BLOCK_SIZE)
    }

    pub fn type_name(&self) -> &'static str {
        self.partition_type_guid.partition_type_name()
    }

    /// Stores `name` truncated to 36 UTF-16 units.
    pub fn set_name(&mut self, name: &str) {
        self.partition_name = [0; GPT_NAME_UNITS];
        for (dst, src) in self.partition_name.iter_mut().zip(name.encode_utf16()) {
            *dst = src;
        }
    }
}

impl Default for GptEntry {
    fn default() -> Self {
        Self {
            partition_type_guid: Guid::ZERO,
            unique_partition_guid: Guid::ZERO,
            starting_lba: 0,
            ending_lba: 0,
            attributes: GptAttributes::empty(),
            partition_name: [0; GPT_NAME_UNITS],
        }
    }
}

impl Record for GptEntry {
    type Error = fixed_record::Error;

    const NAME: &'static str = "GPTEntry";
    const MAX_SIZE: usize = GPT_ENTRY_SIZE;

    fn occupied_size(&self) -> usize {
        GPT_ENTRY_SIZE
    }

    fn decode(data: &[u8], offset: usize) -> fixed_record::Result<Self> {
        let v = GPT_ENTRY.view::<LittleEndian>(data, offset)?;
        let mut partition_name = [0u16; GPT_NAME_UNITS];
        partition_name.copy_from_slice(&v.units(PARTITION_NAME.offset, GPT_NAME_UNITS)?);
        Ok(Self {
            partition_type_guid: Guid(v.array(&PARTITION_TYPE_GUID)),
            unique_partition_guid: Guid(v.array(&UNIQUE_PARTITION_GUID)),
            starting_lba: v.u64(&STARTING_LBA),
            ending_lba: v.u64(&ENDING_LBA),
            attributes: GptAttributes::from_bits_retain(v.u64(&ATTRIBUTE_BITS)),
            partition_name,
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut b = GPT_ENTRY.builder::<LittleEndian>(GPT_ENTRY_SIZE);
        b.bytes(&PARTITION_TYPE_GUID, &self.partition_type_guid.0)
            .bytes(&UNIQUE_PARTITION_GUID, &self.unique_partition_guid.0)
            .u64(&STARTING_LBA, self.starting_lba)
            .u64(&ENDING_LBA, self.ending_lba)
            .u64(&ATTRIBUTE_BITS, self.attributes.bits())
            .units(PARTITION_NAME.offset, &self.partition_name);
        b.finish()
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            (
                "partitionTypeGUID",
                FieldValue::Text(self.partition_type_guid.to_string_formatted()),
            ),
            (
                "uniquePartitionGUID",
                FieldValue::Text(self.unique_partition_guid.to_string_formatted()),
            ),
            ("startingLBA", FieldValue::Unsigned(self.starting_lba)),
            ("endingLBA", FieldValue::Unsigned(self.ending_lba)),
            ("attributeBits", FieldValue::Unsigned(self.attributes.bits())),
            ("partitionName", FieldValue::Text(self.name())),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hfs_entry() -> GptEntry {
        let mut e = GptEntry {
            partition_type_guid: Guid::APPLE_HFS,
            unique_partition_guid: Guid([7; 16]),
            starting_lba: 40,
            ending_lba: 409_639,
            attributes: GptAttributes::LEGACY_BIOS_BOOTABLE,
            ..GptEntry::default()
        };
        e.set_name("Macintosh HD");
        e
    }

    #[test]
    fn layout_offsets() {
        let raw = hfs_entry().encode();
        assert_eq!(raw.len(), 128);
        assert_eq!(&raw[..4], &[0x00, 0x53, 0x46, 0x48]);
        assert_eq!(&raw[32..40], &40u64.to_le_bytes());
        assert_eq!(&raw[48..56], &4u64.to_le_bytes());
        assert_eq!(&raw[56..60], &[b'M', 0, b'a', 0]);
    }

    #[test]
    fn decode_encode_is_lossless() -> fixed_record::Result<()> {
        let mut raw = hfs_entry().encode();
        // Type-specific attribute bits and trailing name garbage must survive.
        raw[55] = 0x80;
        raw[126] = 0x41;
        let e = GptEntry::decode(&raw, 0)?;
        assert_eq!(e.attributes.type_specific(), 0x8000);
        assert_eq!(e.encode(), raw);
        Ok(())
    }

    #[test]
    fn used_means_nonzero_type() {
        assert!(hfs_entry().is_used());
        let mut e = hfs_entry();
        e.partition_type_guid = Guid::ZERO;
        assert!(!e.is_used());
        assert_eq!(e.length(), Some(0));

        let unique_only = GptEntry {
            unique_partition_guid: Guid([1; 16]),
            ..GptEntry::default()
        };
        assert!(!unique_only.is_used());
    }

    #[test]
    fn name_and_geometry() {
        let e = hfs_entry();
        assert_eq!(e.name(), "Macintosh HD");
        assert_eq!(e.start_offset(), Some(40 * 512));
        assert_eq!(e.length(), Some(409_600 * 512));
        assert_eq!(e.type_name(), "Apple HFS/HFS+");
    }

    #[test]
    fn huge_lbas_do_not_overflow() {
        let mut e = hfs_entry();
        e.starting_lba = u64::MAX - 1;
        e.ending_lba = u64::MAX;
        assert_eq!(e.start_offset(), None);
        assert_eq!(e.length(), None);

        e.starting_lba = 0;
        assert_eq!(e.start_offset(), Some(0));
        assert_eq!(e.length(), None);

        e.ending_lba = u64::MAX / BLOCK_SIZE - 1;
        assert_eq!(e.length(), Some((u64::MAX / BLOCK_SIZE) * BLOCK_SIZE));

        e.starting_lba = 10;
        e.ending_lba = 5;
        assert_eq!(e.length(), Some(0));
    }

    #[test]
    fn name_is_truncated_to_36_units() {
        let mut e = GptEntry::default();
        let long = "x".repeat(50);
        e.set_name(&long);
        assert_eq!(e.name().len(), 36);
    }

    #[test]
    fn truncated_entry_fails() {
        let raw = hfs_entry().encode();
        assert!(GptEntry::decode(&raw, 1).is_err());
    }
}
