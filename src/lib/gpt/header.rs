use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use crc32fast::Hasher;
use fixed_record::{Field, FieldKind, FieldValue, Layout, LittleEndian, Record};

use crate::Guid;

pub const GPT_SIGNATURE: [u8; 8] = *b"EFI PART";
pub const GPT_REVISION_1_0: u32 = 0x0001_0000;
pub const GPT_HEADER_SIZE: usize = 512;
/// Bytes covered by the defined header fields.
pub const GPT_HEADER_FIELDS_SIZE: u32 = 92;

const SIGNATURE: Field = Field::new("signature", 0, FieldKind::Bytes(8));
const REVISION: Field = Field::new("revision", 8, FieldKind::U32);
const HEADER_SIZE: Field = Field::new("headerSize", 12, FieldKind::U32);
const CRC32_CHECKSUM: Field = Field::new("crc32Checksum", 16, FieldKind::U32);
const RESERVED1: Field = Field::new("reserved1", 20, FieldKind::U32);
const PRIMARY_LBA: Field = Field::new("primaryLBA", 24, FieldKind::U64);
const BACKUP_LBA: Field = Field::new("backupLBA", 32, FieldKind::U64);
const FIRST_USABLE_LBA: Field = Field::new("firstUsableLBA", 40, FieldKind::U64);
const LAST_USABLE_LBA: Field = Field::new("lastUsableLBA", 48, FieldKind::U64);
const DISK_GUID: Field = Field::new("diskGUID", 56, FieldKind::Bytes(16));
const PARTITION_ENTRY_LBA: Field = Field::new("partitionEntryLBA", 72, FieldKind::U64);
const NUMBER_OF_PARTITION_ENTRIES: Field =
    Field::new("numberOfPartitionEntries", 80, FieldKind::U32);
const SIZE_OF_PARTITION_ENTRY: Field = Field::new("sizeOfPartitionEntry", 84, FieldKind::U32);
const PARTITION_ENTRY_ARRAY_CRC32: Field =
    Field::new("partitionEntryArrayCRC32", 88, FieldKind::U32);
const RESERVED2: Field = Field::new("reserved2", 92, FieldKind::Bytes(420));

static GPT_HEADER: Layout = Layout::new(
    "GPTHeader",
    &[
        SIGNATURE,
        REVISION,
        HEADER_SIZE,
        CRC32_CHECKSUM,
        RESERVED1,
        PRIMARY_LBA,
        BACKUP_LBA,
        FIRST_USABLE_LBA,
        LAST_USABLE_LBA,
        DISK_GUID,
        PARTITION_ENTRY_LBA,
        NUMBER_OF_PARTITION_ENTRIES,
        SIZE_OF_PARTITION_ENTRY,
        PARTITION_ENTRY_ARRAY_CRC32,
        RESERVED2,
    ],
    GPT_HEADER_SIZE,
);

/// One copy of the GPT header.
///
/// The backup copy is not byte-identical to the primary: it names itself in
/// `primary_lba`, the primary in `backup_lba`, and points `partition_entry_lba`
/// at the backup entry array, so its checksum differs as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GptHeader {
    pub signature: [u8; 8],
    pub revision: u32,
    pub header_size: u32,
    pub crc32_checksum: u32,
    pub reserved1: u32,
    pub primary_lba: u64,
    pub backup_lba: u64,
    pub first_usable_lba: u64,
    pub last_usable_lba: u64,
    pub disk_guid: Guid,
    pub partition_entry_lba: u64,
    pub number_of_partition_entries: u32,
    pub size_of_partition_entry: u32,
    pub partition_entry_array_crc32: u32,
    pub reserved2: [u8; 420],
}

impl GptHeader {
    /// CRC-32 over the first `header_size` bytes with the checksum field read
    /// as zero. Equals `crc32_checksum` on an intact header.
    pub fn calculate_crc32(&self) -> u32 {
        let mut bytes = self.encode();
        bytes[CRC32_CHECKSUM.range()].fill(0);
        let len = (self.header_size as usize).min(GPT_HEADER_SIZE);
        let mut hasher = Hasher::new();
        hasher.update(&bytes[..len]);
        hasher.finalize()
    }

    /// Structural sanity: signature, a header size within the block, and the
    /// 128-byte entry size this crate decodes. Checksums are not looked at.
    pub fn is_valid(&self) -> bool {
        self.signature == GPT_SIGNATURE
            && (GPT_HEADER_FIELDS_SIZE..=GPT_HEADER_SIZE as u32).contains(&self.header_size)
            && self.size_of_partition_entry as usize == crate::GptEntry::MAX_SIZE
    }

    pub fn is_checksum_valid(&self) -> bool {
        self.crc32_checksum == self.calculate_crc32()
    }

    pub fn entry_array_size(&self) -> u64 {
        self.number_of_partition_entries as u64 * self.size_of_partition_entry as u64
    }
}

impl Record for GptHeader {
    type Error = fixed_record::Error;

    const NAME: &'static str = "GPTHeader";
    const MAX_SIZE: usize = GPT_HEADER_SIZE;

    fn occupied_size(&self) -> usize {
        GPT_HEADER_SIZE
    }

    fn decode(data: &[u8], offset: usize) -> fixed_record::Result<Self> {
        let v = GPT_HEADER.view::<LittleEndian>(data, offset)?;
        let signature = v.array::<8>(&SIGNATURE);
        if signature != GPT_SIGNATURE {
            return Err(v.malformed(&SIGNATURE, format!("expected \"EFI PART\", got {signature:02X?}")));
        }
        Ok(Self {
            signature,
            revision: v.u32(&REVISION),
            header_size: v.u32(&HEADER_SIZE),
            crc32_checksum: v.u32(&CRC32_CHECKSUM),
            reserved1: v.u32(&RESERVED1),
            primary_lba: v.u64(&PRIMARY_LBA),
            backup_lba: v.u64(&BACKUP_LBA),
            first_usable_lba: v.u64(&FIRST_USABLE_LBA),
            last_usable_lba: v.u64(&LAST_USABLE_LBA),
            disk_guid: Guid(v.array(&DISK_GUID)),
            partition_entry_lba: v.u64(&PARTITION_ENTRY_LBA),
            number_of_partition_entries: v.u32(&NUMBER_OF_PARTITION_ENTRIES),
            size_of_partition_entry: v.u32(&SIZE_OF_PARTITION_ENTRY),
            partition_entry_array_crc32: v.u32(&PARTITION_ENTRY_ARRAY_CRC32),
            reserved2: v.array(&RESERVED2),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut b = GPT_HEADER.builder::<LittleEndian>(GPT_HEADER_SIZE);
        b.bytes(&SIGNATURE, &self.signature)
            .u32(&REVISION, self.revision)
            .u32(&HEADER_SIZE, self.header_size)
            .u32(&CRC32_CHECKSUM, self.crc32_checksum)
            .u32(&RESERVED1, self.reserved1)
            .u64(&PRIMARY_LBA, self.primary_lba)
            .u64(&BACKUP_LBA, self.backup_lba)
            .u64(&FIRST_USABLE_LBA, self.first_usable_lba)
            .u64(&LAST_USABLE_LBA, self.last_usable_lba)
            .bytes(&DISK_GUID, &self.disk_guid.0)
            .u64(&PARTITION_ENTRY_LBA, self.partition_entry_lba)
            .u32(&NUMBER_OF_PARTITION_ENTRIES, self.number_of_partition_entries)
            .u32(&SIZE_OF_PARTITION_ENTRY, self.size_of_partition_entry)
            .u32(&PARTITION_ENTRY_ARRAY_CRC32, self.partition_entry_array_crc32)
            .bytes(&RESERVED2, &self.reserved2);
        b.finish()
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            (
                "signature",
                FieldValue::Text(String::from_utf8_lossy(&self.signature).into_owned()),
            ),
            ("revision", FieldValue::Unsigned(self.revision as u64)),
            ("headerSize", FieldValue::Unsigned(self.header_size as u64)),
            ("crc32Checksum", FieldValue::Unsigned(self.crc32_checksum as u64)),
            ("reserved1", FieldValue::Unsigned(self.reserved1 as u64)),
            ("primaryLBA", FieldValue::Unsigned(self.primary_lba)),
            ("backupLBA", FieldValue::Unsigned(self.backup_lba)),
            ("firstUsableLBA", FieldValue::Unsigned(self.first_usable_lba)),
            ("lastUsableLBA", FieldValue::Unsigned(self.last_usable_lba)),
            ("diskGUID", FieldValue::Text(self.disk_guid.to_string_formatted())),
            ("partitionEntryLBA", FieldValue::Unsigned(self.partition_entry_lba)),
            (
                "numberOfPartitionEntries",
                FieldValue::Unsigned(self.number_of_partition_entries as u64),
            ),
            (
                "sizeOfPartitionEntry",
                FieldValue::Unsigned(self.size_of_partition_entry as u64),
            ),
            (
                "partitionEntryArrayCRC32",
                FieldValue::Unsigned(self.partition_entry_array_crc32 as u64),
            ),
        ]
    }
}
