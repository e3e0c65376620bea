use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;
use fixed_record::{BigEndian, Field, FieldKind, FieldValue, Layout, Record};

use crate::{Error, HFSUniStr255, Result, fast_unicode_compare};

const CNID: Field = Field::new("cnid", 0, FieldKind::U32);

static HFS_CATALOG_NODE_ID: Layout = Layout::new("HFSCatalogNodeID", &[CNID], 4);

/// Catalog node ID. Compared as an unsigned 32-bit value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HFSCatalogNodeID(pub u32);

pub const kHFSRootParentID: HFSCatalogNodeID = HFSCatalogNodeID(1);
pub const kHFSRootFolderID: HFSCatalogNodeID = HFSCatalogNodeID(2);
pub const kHFSExtentsFileID: HFSCatalogNodeID = HFSCatalogNodeID(3);
pub const kHFSCatalogFileID: HFSCatalogNodeID = HFSCatalogNodeID(4);
pub const kHFSBadBlockFileID: HFSCatalogNodeID = HFSCatalogNodeID(5);
pub const kHFSAllocationFileID: HFSCatalogNodeID = HFSCatalogNodeID(6);
pub const kHFSStartupFileID: HFSCatalogNodeID = HFSCatalogNodeID(7);
pub const kHFSAttributesFileID: HFSCatalogNodeID = HFSCatalogNodeID(8);
pub const kHFSRepairCatalogFileID: HFSCatalogNodeID = HFSCatalogNodeID(14);
pub const kHFSBogusExtentFileID: HFSCatalogNodeID = HFSCatalogNodeID(15);
pub const kHFSFirstUserCatalogNodeID: HFSCatalogNodeID = HFSCatalogNodeID(16);

impl HFSCatalogNodeID {
    pub fn is_reserved(self) -> bool {
        self < kHFSFirstUserCatalogNodeID
    }
}

impl From<u32> for HFSCatalogNodeID {
    fn from(id: u32) -> Self {
        HFSCatalogNodeID(id)
    }
}

impl From<HFSCatalogNodeID> for u32 {
    fn from(id: HFSCatalogNodeID) -> Self {
        id.0
    }
}

impl fmt::Display for HFSCatalogNodeID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Record for HFSCatalogNodeID {
    type Error = Error;

    const NAME: &'static str = "HFSCatalogNodeID";
    const MAX_SIZE: usize = 4;

    fn occupied_size(&self) -> usize {
        4
    }

    fn decode(data: &[u8], offset: usize) -> Result<Self> {
        let view = HFS_CATALOG_NODE_ID.view::<BigEndian>(data, offset)?;
        Ok(HFSCatalogNodeID(view.u32(&CNID)))
    }

    fn encode(&self) -> Vec<u8> {
        let mut b = HFS_CATALOG_NODE_ID.builder::<BigEndian>(4);
        b.u32(&CNID, self.0);
        b.finish()
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![("cnid", FieldValue::Unsigned(self.0 as u64))]
    }
}

const KEY_LENGTH: Field = Field::new("keyLength", 0, FieldKind::U16);
const PARENT_ID: Field = Field::new("parentID", 2, FieldKind::U32);
const NODE_NAME_OFFSET: usize = 6;

static HFS_PLUS_CATALOG_KEY: Layout =
    Layout::new("HFSPlusCatalogKey", &[KEY_LENGTH, PARENT_ID], NODE_NAME_OFFSET);

/// Catalog B-tree key: parent folder ID, then the node's name.
///
/// `key_length` counts the parent ID and the name record, not itself, and is
/// recomputed whenever a key is built so it always matches `node_name`.
#[derive(Debug, Clone)]
pub struct HFSPlusCatalogKey {
    key_length: u16,
    parent_id: HFSCatalogNodeID,
    node_name: HFSUniStr255,
}

impl HFSPlusCatalogKey {
    pub fn new(parent_id: HFSCatalogNodeID, node_name: HFSUniStr255) -> Self {
        Self {
            key_length: (4 + node_name.byte_length()) as u16,
            parent_id,
            node_name,
        }
    }

    pub fn from_parts(parent_id: u32, node_name: &str) -> Result<Self> {
        Ok(Self::new(HFSCatalogNodeID(parent_id), node_name.parse()?))
    }

    /// Key for looking up a user-supplied name; the name is decomposed first.
    pub fn for_lookup(parent_id: u32, node_name: &str) -> Result<Self> {
        Ok(Self::new(
            HFSCatalogNodeID(parent_id),
            HFSUniStr255::from_str_nfd(node_name)?,
        ))
    }

    pub fn key_length(&self) -> u16 {
        self.key_length
    }

    pub fn parent_id(&self) -> HFSCatalogNodeID {
        self.parent_id
    }

    pub fn node_name(&self) -> &HFSUniStr255 {
        &self.node_name
    }

    pub fn into_parts(self) -> (HFSCatalogNodeID, HFSUniStr255) {
        (self.parent_id, self.node_name)
    }
}

impl Record for HFSPlusCatalogKey {
    type Error = Error;

    const NAME: &'static str = "HFSPlusCatalogKey";
    const MAX_SIZE: usize = 2 + 4 + HFSUniStr255::MAX_SIZE;

    fn occupied_size(&self) -> usize {
        2 + self.key_length as usize
    }

    fn decode(data: &[u8], offset: usize) -> Result<Self> {
        let view = HFS_PLUS_CATALOG_KEY.view::<BigEndian>(data, offset)?;
        let key_length = view.u16(&KEY_LENGTH);
        if (key_length as usize) < NODE_NAME_OFFSET {
            return Err(view
                .malformed(&KEY_LENGTH, alloc::format!("{key_length} is shorter than 6"))
                .into());
        }
        let occupied = 2 + key_length as usize;
        view.extend(data, occupied)?;

        // The name may not extend past what keyLength declares.
        let bounded = &data[..offset + occupied];
        let parent_id = HFSCatalogNodeID::decode(bounded, offset + PARENT_ID.offset)?;
        let node_name = HFSUniStr255::decode(bounded, offset + NODE_NAME_OFFSET)?;

        let actual = (4 + node_name.byte_length()) as u16;
        if actual != key_length {
            return Err(Error::KeyLengthMismatch {
                declared: key_length,
                actual,
            });
        }
        Ok(Self {
            key_length,
            parent_id,
            node_name,
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut b = HFS_PLUS_CATALOG_KEY.builder::<BigEndian>(self.occupied_size());
        b.u16(&KEY_LENGTH, self.key_length)
            .u32(&PARENT_ID, self.parent_id.0)
            .raw(NODE_NAME_OFFSET, &self.node_name.encode());
        b.finish()
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("keyLength", FieldValue::Unsigned(self.key_length as u64)),
            ("parentID", FieldValue::Record(self.parent_id.fields())),
            ("nodeName", FieldValue::Record(self.node_name.fields())),
        ]
    }
}

impl PartialOrd for HFSPlusCatalogKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HFSPlusCatalogKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.parent_id.cmp(&other.parent_id) {
            Ordering::Equal => {
                fast_unicode_compare(self.node_name.units(), other.node_name.units())
            }
            ord => ord,
        }
    }
}

impl PartialEq for HFSPlusCatalogKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HFSPlusCatalogKey {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_key() -> Result<()> {
        let key = HFSPlusCatalogKey::from_parts(2, "")?;
        assert_eq!(key.key_length(), 4 + 2);
        assert_eq!(key.occupied_size(), 8);
        assert_eq!(key.encode(), vec![0, 6, 0, 0, 0, 2, 0, 0]);
        Ok(())
    }

    #[test]
    fn key_length_tracks_name() -> Result<()> {
        let key = HFSPlusCatalogKey::from_parts(16, "Desktop")?;
        assert_eq!(key.key_length() as usize, 4 + key.node_name().byte_length());
        assert_eq!(key.occupied_size(), 2 + key.key_length() as usize);
        assert_eq!(key.encode().len(), key.occupied_size());
        assert_eq!(key.max_size(), 518);
        Ok(())
    }

    #[test]
    fn key_fields_serialize_nested() -> Result<()> {
        let key = HFSPlusCatalogKey::from_parts(2, "a")?;
        let json = serde_json::to_string(&FieldValue::Record(key.fields()))
            .expect("field listing serializes");
        assert_eq!(
            json,
            r#"{"keyLength":8,"parentID":{"cnid":2},"nodeName":{"length":1,"unicode":"a"}}"#
        );
        Ok(())
    }

    #[test]
    fn decode_encode_roundtrip() -> Result<()> {
        let key = HFSPlusCatalogKey::from_parts(0x8000_0001, "Système")?;
        let mut node = vec![0xAAu8; 3];
        node.extend_from_slice(&key.encode());
        node.extend_from_slice(&[0xBB; 10]);
        let decoded = HFSPlusCatalogKey::decode(&node, 3)?;
        assert_eq!(decoded.parent_id(), key.parent_id());
        assert_eq!(decoded.node_name(), key.node_name());
        assert_eq!(decoded.key_length(), key.key_length());
        Ok(())
    }

    #[test]
    fn decode_rejects_short_key_length() {
        let data = [0, 4, 0, 0, 0, 2, 0, 0];
        assert!(matches!(
            HFSPlusCatalogKey::decode(&data, 0),
            Err(Error::Decode(fixed_record::Error::Malformed { .. }))
        ));
    }

    #[test]
    fn decode_rejects_name_past_key_length() {
        // keyLength says 6 but the name claims one unit.
        let data = [0, 6, 0, 0, 0, 2, 0, 1, 0, b'a'];
        assert!(matches!(
            HFSPlusCatalogKey::decode(&data, 0),
            Err(Error::Decode(fixed_record::Error::Truncated { .. }))
        ));
    }

    #[test]
    fn decode_rejects_inconsistent_key_length() {
        // keyLength 10 leaves room for a 2-unit name, but the name has 1.
        let data = [0, 10, 0, 0, 0, 2, 0, 1, 0, b'a', 0, 0];
        assert_eq!(
            HFSPlusCatalogKey::decode(&data, 0).err(),
            Some(Error::KeyLengthMismatch {
                declared: 10,
                actual: 8
            })
        );
    }

    #[test]
    fn decode_truncated_buffer() {
        let key = HFSPlusCatalogKey::from_parts(2, "abc").unwrap();
        let bytes = key.encode();
        assert!(HFSPlusCatalogKey::decode(&bytes[..bytes.len() - 1], 0).is_err());
        assert!(HFSPlusCatalogKey::decode(&bytes[..3], 0).is_err());
    }

    #[test]
    fn parent_id_is_primary() -> Result<()> {
        let a = HFSPlusCatalogKey::from_parts(1, "zzz")?;
        let b = HFSPlusCatalogKey::from_parts(2, "aaa")?;
        assert!(a < b);
        Ok(())
    }

    #[test]
    fn parent_id_compares_unsigned() -> Result<()> {
        let low = HFSPlusCatalogKey::from_parts(5, "x")?;
        let high = HFSPlusCatalogKey::from_parts(0xFFFF_FFF0, "x")?;
        assert!(low < high);
        Ok(())
    }

    #[test]
    fn apple_and_apple_are_adjacent_and_equal() -> Result<()> {
        let upper = HFSPlusCatalogKey::from_parts(10, "Apple")?;
        let lower = HFSPlusCatalogKey::from_parts(10, "apple")?;
        let before = HFSPlusCatalogKey::from_parts(10, "Apfel")?;
        let after = HFSPlusCatalogKey::from_parts(10, "Applesauce")?;
        assert_eq!(upper.cmp(&lower), Ordering::Equal);
        assert_eq!(upper, lower);
        assert!(before < upper && before < lower);
        assert!(upper < after && lower < after);
        Ok(())
    }

    #[test]
    fn lookup_key_matches_stored_decomposed_name() -> Result<()> {
        let stored = HFSPlusCatalogKey::new(
            kHFSRootFolderID,
            HFSUniStr255::from_units("Cafe\u{0301}".encode_utf16().collect())?,
        );
        let lookup = HFSPlusCatalogKey::for_lookup(2, "CAF\u{00C9}")?;
        assert_ne!(lookup.node_name(), stored.node_name());
        assert_eq!(lookup.cmp(&stored), Ordering::Equal);
        Ok(())
    }

    #[test]
    fn reserved_ids() {
        assert!(kHFSRootParentID.is_reserved());
        assert!(kHFSRootFolderID.is_reserved());
        assert!(!kHFSFirstUserCatalogNodeID.is_reserved());
        assert_eq!(u32::from(kHFSCatalogFileID), 4);
    }

    #[test]
    fn field_listing() -> Result<()> {
        let key = HFSPlusCatalogKey::from_parts(2, "a")?;
        let fields = key.fields();
        assert_eq!(fields[0], ("keyLength", FieldValue::Unsigned(8)));
        assert_eq!(
            fields[1],
            (
                "parentID",
                FieldValue::Record(vec![("cnid", FieldValue::Unsigned(2))])
            )
        );
        match &fields[2].1 {
            FieldValue::Record(name) => {
                assert_eq!(name[1], ("unicode", FieldValue::Text("a".into())))
            }
            other => panic!("unexpected {other:?}"),
        }
        Ok(())
    }
}
