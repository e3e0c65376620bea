use alloc::format;
use alloc::string::String;
use core::fmt;
use serde::{Serialize, Serializer};

/// A GUID in its on-disk byte order: the first three groups little-endian,
/// the last two big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid(pub [u8; 16]);

impl Guid {
    pub const ZERO: Guid = Guid([0; 16]);

    pub const EFI_SYSTEM: Guid =
        Guid::from_fields(0xC12A7328, 0xF81F, 0x11D2, [0xBA, 0x4B, 0x00, 0xA0, 0xC9, 0x3E, 0xC9, 0x3B]);
    pub const BIOS_BOOT: Guid =
        Guid::from_fields(0x21686148, 0x6449, 0x6E6F, [0x74, 0x68, 0x65, 0x65, 0x64, 0x45, 0x46, 0x49]);
    pub const MICROSOFT_RESERVED: Guid =
        Guid::from_fields(0xE3C9E316, 0x0B5C, 0x4DB8, [0x81, 0x7D, 0xF9, 0x2D, 0xF0, 0x02, 0x15, 0xAE]);
    pub const MICROSOFT_BASIC_DATA: Guid =
        Guid::from_fields(0xEBD0A0A2, 0xB9E5, 0x4433, [0x87, 0xC0, 0x68, 0xB6, 0xB7, 0x26, 0x99, 0xC7]);
    pub const LINUX_FILESYSTEM: Guid =
        Guid::from_fields(0x0FC63DAF, 0x8483, 0x4772, [0x8E, 0x79, 0x3D, 0x69, 0xD8, 0x47, 0x7D, 0xE4]);
    pub const LINUX_SWAP: Guid =
        Guid::from_fields(0x0657FD6D, 0xA4AB, 0x43C4, [0x84, 0xE5, 0x09, 0x33, 0xC8, 0x4B, 0x4F, 0x4F]);
    pub const APPLE_HFS: Guid =
        Guid::from_fields(0x48465300, 0x0000, 0x11AA, [0xAA, 0x11, 0x00, 0x30, 0x65, 0x43, 0xEC, 0xAC]);
    pub const APPLE_APFS: Guid =
        Guid::from_fields(0x7C3457EF, 0x0000, 0x11AA, [0xAA, 0x11, 0x00, 0x30, 0x65, 0x43, 0xEC, 0xAC]);
    pub const APPLE_UFS: Guid =
        Guid::from_fields(0x55465300, 0x0000, 0x11AA, [0xAA, 0x11, 0x00, 0x30, 0x65, 0x43, 0xEC, 0xAC]);
    pub const APPLE_BOOT: Guid =
        Guid::from_fields(0x426F6F74, 0x0000, 0x11AA, [0xAA, 0x11, 0x00, 0x30, 0x65, 0x43, 0xEC, 0xAC]);

    /// Builds a GUID from its textual groups (`time_low-time_mid-time_hi-clock_seq+node`).
    pub const fn from_fields(time_low: u32, time_mid: u16, time_hi: u16, tail: [u8; 8]) -> Self {
        let a = time_low.to_le_bytes();
        let b = time_mid.to_le_bytes();
        let c = time_hi.to_le_bytes();
        Guid([
            a[0], a[1], a[2], a[3], b[0], b[1], c[0], c[1], tail[0], tail[1], tail[2], tail[3],
            tail[4], tail[5], tail[6], tail[7],
        ])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 16]
    }

    pub fn to_string_formatted(&self) -> String {
        format!("{self}")
    }

    /// Well-known partition type name.
    pub fn partition_type_name(&self) -> &'static str {
        match *self {
            Guid::ZERO => "Unused",
            Guid::EFI_SYSTEM => "EFI System",
            Guid::BIOS_BOOT => "BIOS Boot",
            Guid::MICROSOFT_RESERVED => "Microsoft Reserved",
            Guid::MICROSOFT_BASIC_DATA => "Microsoft Basic Data",
            Guid::LINUX_FILESYSTEM => "Linux Filesystem",
            Guid::LINUX_SWAP => "Linux Swap",
            Guid::APPLE_HFS => "Apple HFS/HFS+",
            Guid::APPLE_APFS => "Apple APFS",
            Guid::APPLE_UFS => "Apple UFS",
            Guid::APPLE_BOOT => "Apple Boot",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let d = &self.0;
        write!(
            f,
            "{:02X}{:02X}{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
            d[3], d[2], d[1], d[0], d[5], d[4], d[7], d[6], d[8], d[9], d[10], d[11], d[12], d[13],
            d[14], d[15]
        )
    }
}

impl Serialize for Guid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
