use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use crc32fast::Hasher;
use fixed_record::{Record, print_fields};
use log::{debug, warn};

use crate::{
    BLOCK_SIZE, BlockDevice, Error, GPT_ENTRY_SIZE, GPT_HEADER_SIZE, GptEntry, GptHeader,
    MAX_PARTITION_ENTRIES, NullProgress, ProgressMonitor, Result,
};

/// Both copies of a disk's GPT metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuidPartitionTable {
    header: GptHeader,
    entries: Vec<GptEntry>,
    backup_header: GptHeader,
    backup_entries: Vec<GptEntry>,
}

/// Which copy a read or check refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Primary,
    Backup,
}

impl Side {
    fn label(self) -> &'static str {
        match self {
            Side::Primary => "primary",
            Side::Backup => "backup",
        }
    }
}

fn lba_offset(base: u64, lba: u64) -> Result<u64> {
    lba.checked_mul(BLOCK_SIZE)
        .and_then(|o| o.checked_add(base))
        .ok_or(Error::Incoherent("LBA lies beyond the addressable range"))
}

fn read_header<D: BlockDevice + ?Sized>(device: &mut D, disk_offset: u64) -> Result<GptHeader> {
    let mut buf = [0u8; GPT_HEADER_SIZE];
    let n = device.read_at(disk_offset, &mut buf)?;
    GptHeader::decode(&buf[..n], 0).map_err(|source| Error::Decode {
        disk_offset,
        source,
    })
}

fn encode_entries(entries: &[GptEntry]) -> Vec<u8> {
    let mut out = Vec::with_capacity(entries.len() * GPT_ENTRY_SIZE);
    for e in entries {
        out.extend_from_slice(&e.encode());
    }
    out
}

fn entries_crc32(entries: &[GptEntry]) -> u32 {
    let mut hasher = Hasher::new();
    for e in entries {
        hasher.update(&e.encode());
    }
    hasher.finalize()
}

impl GuidPartitionTable {
    pub fn long_name() -> &'static str {
        "GUID Partition Table"
    }

    pub fn short_name() -> &'static str {
        "GPT"
    }

    /// Reads the table of a disk whose LBA 0 sits at `offset` on `device`.
    pub fn read<D: BlockDevice + ?Sized>(device: &mut D, offset: u64) -> Result<Self> {
        Self::read_with_progress(device, offset, &NullProgress)
    }

    /// Like [`read`](Self::read), reporting per-entry progress and stopping
    /// with [`Error::Cancelled`] once `progress` signals a cancel.
    pub fn read_with_progress<D, P>(device: &mut D, offset: u64, progress: &P) -> Result<Self>
    where
        D: BlockDevice + ?Sized,
        P: ProgressMonitor + ?Sized,
    {
        let header_at = lba_offset(offset, 1)?;
        let header = read_header(device, header_at)?;
        Self::check_entry_geometry(&header)?;
        debug!(
            "primary GPT header at LBA {}: {} entries at LBA {}, backup at LBA {}",
            header.primary_lba,
            header.number_of_partition_entries,
            header.partition_entry_lba,
            header.backup_lba
        );

        let array_bytes = header.entry_array_size();
        progress.set_data_size(2 * (GPT_HEADER_SIZE as u64 + array_bytes));
        progress.add_data_progress(GPT_HEADER_SIZE as u64);

        let entries = Self::read_entries(device, offset, &header, Side::Primary, progress)?;

        let backup_at = lba_offset(offset, header.backup_lba)?;
        let backup_header = read_header(device, backup_at)?;
        Self::check_entry_geometry(&backup_header)?;
        debug!(
            "backup GPT header at LBA {}: {} entries at LBA {}",
            header.backup_lba,
            backup_header.number_of_partition_entries,
            backup_header.partition_entry_lba
        );
        progress.add_data_progress(GPT_HEADER_SIZE as u64);

        let backup_entries =
            Self::read_entries(device, offset, &backup_header, Side::Backup, progress)?;
        progress.update_total_progress(1.0, "Partition table read");

        Ok(Self {
            header,
            entries,
            backup_header,
            backup_entries,
        })
    }

    fn check_entry_geometry(header: &GptHeader) -> Result<()> {
        if header.number_of_partition_entries > MAX_PARTITION_ENTRIES {
            return Err(Error::TooManyEntries(header.number_of_partition_entries));
        }
        if header.size_of_partition_entry as usize != GPT_ENTRY_SIZE {
            return Err(Error::UnsupportedEntrySize(header.size_of_partition_entry));
        }
        Ok(())
    }

    fn read_entries<D, P>(
        device: &mut D,
        offset: u64,
        header: &GptHeader,
        side: Side,
        progress: &P,
    ) -> Result<Vec<GptEntry>>
    where
        D: BlockDevice + ?Sized,
        P: ProgressMonitor + ?Sized,
    {
        let count = header.number_of_partition_entries as usize;
        let array_at = lba_offset(offset, header.partition_entry_lba)?;
        let mut buf = vec![0u8; count * GPT_ENTRY_SIZE];
        let n = device.read_at(array_at, &mut buf)?;
        buf.truncate(n);

        let (base, message) = match side {
            Side::Primary => (0.0, "Reading primary partition entries"),
            Side::Backup => (0.5, "Reading backup partition entries"),
        };
        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            if progress.cancel_signaled() {
                debug!("{} entry read cancelled after {i} entries", side.label());
                progress.confirm_cancel();
                return Err(Error::Cancelled);
            }
            let at = i * GPT_ENTRY_SIZE;
            let entry = GptEntry::decode(buf.get(at..).unwrap_or(&[]), 0).map_err(|source| {
                Error::Decode {
                    disk_offset: array_at.saturating_add(at as u64),
                    source,
                }
            })?;
            entries.push(entry);
            progress.add_data_progress(GPT_ENTRY_SIZE as u64);
            progress.update_total_progress(base + 0.5 * (i + 1) as f64 / count as f64, message);
        }
        Ok(entries)
    }

    /// Assembles a table from already decoded parts.
    pub fn from_parts(
        header: GptHeader,
        entries: Vec<GptEntry>,
        backup_header: GptHeader,
        backup_entries: Vec<GptEntry>,
    ) -> Self {
        Self {
            header,
            entries,
            backup_header,
            backup_entries,
        }
    }

    pub fn header(&self) -> &GptHeader {
        &self.header
    }

    pub fn backup_header(&self) -> &GptHeader {
        &self.backup_header
    }

    pub fn entries(&self) -> &[GptEntry] {
        &self.entries
    }

    pub fn backup_entries(&self) -> &[GptEntry] {
        &self.backup_entries
    }

    pub fn entry(&self, index: usize) -> Option<&GptEntry> {
        self.entries.get(index)
    }

    /// Primary entries with a non-zero type GUID, in table order.
    pub fn used_entries(&self) -> impl Iterator<Item = &GptEntry> + '_ {
        self.entries.iter().filter(|e| e.is_used())
    }

    pub fn used_partition_count(&self) -> usize {
        self.used_entries().count()
    }

    pub fn calculate_primary_header_checksum(&self) -> u32 {
        self.header.calculate_crc32()
    }

    pub fn calculate_backup_header_checksum(&self) -> u32 {
        self.backup_header.calculate_crc32()
    }

    /// CRC-32 over the concatenated encoded primary entries.
    pub fn calculate_primary_entries_checksum(&self) -> u32 {
        entries_crc32(&self.entries)
    }

    pub fn calculate_backup_entries_checksum(&self) -> u32 {
        entries_crc32(&self.backup_entries)
    }

    /// Byte-for-byte comparison of the two entry arrays.
    pub fn entry_tables_equal(&self) -> bool {
        self.entries.len() == self.backup_entries.len()
            && self
                .entries
                .iter()
                .zip(&self.backup_entries)
                .all(|(a, b)| a.encode() == b.encode())
    }

    /// Each header points at the other's LBA.
    pub fn headers_match(&self) -> bool {
        self.header.primary_lba == self.backup_header.backup_lba
            && self.header.backup_lba == self.backup_header.primary_lba
    }

    fn side_header(&self, side: Side) -> &GptHeader {
        match side {
            Side::Primary => &self.header,
            Side::Backup => &self.backup_header,
        }
    }

    fn header_structure_ok(&self, side: Side) -> bool {
        let h = self.side_header(side);
        if !h.is_valid() {
            warn!(
                "{} GPT header is malformed: headerSize {}, sizeOfPartitionEntry {}",
                side.label(),
                h.header_size,
                h.size_of_partition_entry
            );
            return false;
        }
        true
    }

    fn header_checksum_ok(&self, side: Side) -> bool {
        let (h, calculated) = match side {
            Side::Primary => (&self.header, self.calculate_primary_header_checksum()),
            Side::Backup => (&self.backup_header, self.calculate_backup_header_checksum()),
        };
        if h.crc32_checksum != calculated {
            warn!(
                "{} GPT header checksum mismatch: stored {:#010x}, calculated {:#010x}",
                side.label(),
                h.crc32_checksum,
                calculated
            );
            return false;
        }
        true
    }

    fn entries_checksum_ok(&self, side: Side) -> bool {
        let (h, calculated) = match side {
            Side::Primary => (&self.header, self.calculate_primary_entries_checksum()),
            Side::Backup => (&self.backup_header, self.calculate_backup_entries_checksum()),
        };
        if h.partition_entry_array_crc32 != calculated {
            warn!(
                "{} GPT entry array checksum mismatch: stored {:#010x}, calculated {:#010x}",
                side.label(),
                h.partition_entry_array_crc32,
                calculated
            );
            return false;
        }
        true
    }

    /// Both headers are well formed, both headers and both entry arrays pass
    /// their checksums, the arrays are identical and the headers
    /// cross-reference each other. Every failing clause is logged, not just
    /// the first.
    pub fn is_valid(&self) -> bool {
        let mut valid = true;
        for side in [Side::Primary, Side::Backup] {
            valid &= self.header_structure_ok(side);
            valid &= self.header_checksum_ok(side);
            valid &= self.entries_checksum_ok(side);
        }
        if !self.entry_tables_equal() {
            warn!("primary and backup GPT entry arrays differ");
            valid = false;
        }
        if !self.headers_match() {
            warn!(
                "GPT header LBAs do not cross-reference: primary {}/{}, backup {}/{}",
                self.header.primary_lba,
                self.header.backup_lba,
                self.backup_header.primary_lba,
                self.backup_header.backup_lba
            );
            valid = false;
        }
        valid
    }

    /// Byte offset of the primary header, relative to the start of the disk.
    /// The primary copy is always read from LBA 1, whatever its header says.
    pub fn primary_table_bytes_offset(&self) -> u64 {
        BLOCK_SIZE
    }

    /// Byte offset of the backup entry array, which precedes its header.
    pub fn backup_table_bytes_offset(&self) -> Result<u64> {
        lba_offset(0, self.backup_header.partition_entry_lba)
    }

    /// Primary header block followed by its entry array, as laid out on disk.
    pub fn primary_table_bytes(&self) -> Result<Vec<u8>> {
        if self.header.partition_entry_lba != 2 {
            return Err(Error::Incoherent(
                "primary entry array does not follow the primary header",
            ));
        }
        if self.entries.len() != self.header.number_of_partition_entries as usize {
            return Err(Error::Incoherent(
                "primary entry count disagrees with the primary header",
            ));
        }
        let mut out = self.header.encode();
        out.extend_from_slice(&encode_entries(&self.entries));
        Ok(out)
    }

    /// Backup entry array followed by the backup header block.
    pub fn backup_table_bytes(&self) -> Result<Vec<u8>> {
        let h = &self.backup_header;
        if self.backup_entries.len() != h.number_of_partition_entries as usize {
            return Err(Error::Incoherent(
                "backup entry count disagrees with the backup header",
            ));
        }
        let array_blocks = h.entry_array_size().div_ceil(BLOCK_SIZE);
        if h.partition_entry_lba.checked_add(array_blocks) != Some(h.primary_lba) {
            return Err(Error::Incoherent(
                "backup entry array does not end at the backup header",
            ));
        }
        let mut out = encode_entries(&self.backup_entries);
        out.resize((array_blocks * BLOCK_SIZE) as usize, 0);
        out.extend_from_slice(&h.encode());
        Ok(out)
    }
}

impl fmt::Display for GuidPartitionTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{} ({}):", Self::long_name(), Self::short_name())?;
        writeln!(f, "{}:", GptHeader::NAME)?;
        print_fields(f, " ", &self.header.fields())?;
        for (i, e) in self.entries.iter().enumerate().filter(|(_, e)| e.is_used()) {
            writeln!(f, "{} {i} ({}):", GptEntry::NAME, e.type_name())?;
            print_fields(f, " ", &e.fields())?;
        }
        Ok(())
    }
}
