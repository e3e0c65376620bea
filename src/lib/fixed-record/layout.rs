use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use byteorder::ByteOrder;
use core::marker::PhantomData;
use core::ops::Range;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U8,
    U16,
    U32,
    U64,
    Bytes(usize),
}

impl FieldKind {
    pub const fn width(self) -> usize {
        match self {
            FieldKind::U8 => 1,
            FieldKind::U16 => 2,
            FieldKind::U32 => 4,
            FieldKind::U64 => 8,
            FieldKind::Bytes(n) => n,
        }
    }
}

/// One row of a layout table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub offset: usize,
    pub kind: FieldKind,
}

impl Field {
    pub const fn new(name: &'static str, offset: usize, kind: FieldKind) -> Self {
        Self { name, offset, kind }
    }

    pub const fn end(&self) -> usize {
        self.offset + self.kind.width()
    }

    pub fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }
}

/// Field table for one structure. `size` is the fixed part; variable-length
/// records keep their tail after it.
#[derive(Debug)]
pub struct Layout {
    pub name: &'static str,
    pub fields: &'static [Field],
    pub size: usize,
}

impl Layout {
    /// Panics (at compile time when used in a `const`) if a field runs past
    /// `size`, which is what lets [`RecordView`] index without further checks.
    pub const fn new(name: &'static str, fields: &'static [Field], size: usize) -> Self {
        let mut i = 0;
        while i < fields.len() {
            assert!(fields[i].end() <= size, "layout field past end of record");
            i += 1;
        }
        Self { name, fields, size }
    }

    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn view<'a, E: ByteOrder>(
        &'static self,
        data: &'a [u8],
        offset: usize,
    ) -> Result<RecordView<'a, E>> {
        RecordView::with_len(self, data, offset, self.size)
    }

    pub fn builder<E: ByteOrder>(&'static self, len: usize) -> RecordBuilder<E> {
        RecordBuilder::new(self, len)
    }
}

/// Bounds-checked window over a caller's buffer.
pub struct RecordView<'a, E> {
    layout: &'static Layout,
    base: usize,
    bytes: &'a [u8],
    _order: PhantomData<E>,
}

impl<'a, E: ByteOrder> RecordView<'a, E> {
    /// `len` may exceed the layout's fixed size for records with a tail, but
    /// never fall below it.
    pub fn with_len(
        layout: &'static Layout,
        data: &'a [u8],
        offset: usize,
        len: usize,
    ) -> Result<Self> {
        let len = len.max(layout.size);
        let available = data.len().saturating_sub(offset);
        if available < len {
            return Err(Error::Truncated {
                record: layout.name,
                offset,
                needed: len,
                available,
            });
        }
        Ok(Self {
            layout,
            base: offset,
            bytes: &data[offset..offset + len],
            _order: PhantomData,
        })
    }

    /// Same record, re-checked for a larger occupied length once a length
    /// prefix has been read.
    pub fn extend(self, data: &'a [u8], len: usize) -> Result<Self> {
        Self::with_len(self.layout, data, self.base, len)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn u8(&self, field: &Field) -> u8 {
        self.bytes[field.offset]
    }

    pub fn u16(&self, field: &Field) -> u16 {
        E::read_u16(&self.bytes[field.range()])
    }

    pub fn u32(&self, field: &Field) -> u32 {
        E::read_u32(&self.bytes[field.range()])
    }

    pub fn u64(&self, field: &Field) -> u64 {
        E::read_u64(&self.bytes[field.range()])
    }

    pub fn bytes(&self, field: &Field) -> &'a [u8] {
        &self.bytes[field.range()]
    }

    /// Copies a byte field into a fixed array. `N` must equal the field width.
    pub fn array<const N: usize>(&self, field: &Field) -> [u8; N] {
        let src = self.bytes(field);
        debug_assert_eq!(src.len(), N, "{} is {} bytes wide", field.name, src.len());
        let mut out = [0u8; N];
        let n = src.len().min(N);
        out[..n].copy_from_slice(&src[..n]);
        out
    }

    /// `count` 16-bit units starting `at` bytes into the record.
    pub fn units(&self, at: usize, count: usize) -> Result<Vec<u16>> {
        let needed = at + count * 2;
        if needed > self.bytes.len() {
            return Err(Error::Truncated {
                record: self.layout.name,
                offset: self.base,
                needed,
                available: self.bytes.len(),
            });
        }
        let mut out = vec![0u16; count];
        E::read_u16_into(&self.bytes[at..needed], &mut out);
        Ok(out)
    }

    /// Everything from `at` to the end of the window.
    pub fn tail(&self, at: usize) -> &'a [u8] {
        self.bytes.get(at..).unwrap_or(&[])
    }

    pub fn malformed(&self, field: &Field, reason: impl Into<String>) -> Error {
        Error::Malformed {
            record: self.layout.name,
            field: field.name,
            offset: self.base + field.offset,
            reason: reason.into(),
        }
    }
}

/// Zero-initialised output buffer addressed through the same layout table.
pub struct RecordBuilder<E> {
    layout: &'static Layout,
    buf: Vec<u8>,
    _order: PhantomData<E>,
}

impl<E: ByteOrder> RecordBuilder<E> {
    pub fn new(layout: &'static Layout, len: usize) -> Self {
        Self {
            layout,
            buf: vec![0; len.max(layout.size)],
            _order: PhantomData,
        }
    }

    pub fn layout(&self) -> &'static Layout {
        self.layout
    }

    pub fn u8(&mut self, field: &Field, value: u8) -> &mut Self {
        self.buf[field.offset] = value;
        self
    }

    pub fn u16(&mut self, field: &Field, value: u16) -> &mut Self {
        E::write_u16(&mut self.buf[field.range()], value);
        self
    }

    pub fn u32(&mut self, field: &Field, value: u32) -> &mut Self {
        E::write_u32(&mut self.buf[field.range()], value);
        self
    }

    pub fn u64(&mut self, field: &Field, value: u64) -> &mut Self {
        E::write_u64(&mut self.buf[field.range()], value);
        self
    }

    /// Copies up to the field width; shorter input leaves the rest zeroed.
    pub fn bytes(&mut self, field: &Field, value: &[u8]) -> &mut Self {
        let dst = &mut self.buf[field.range()];
        let n = value.len().min(dst.len());
        dst[..n].copy_from_slice(&value[..n]);
        self
    }

    /// Writes 16-bit units starting `at` bytes into the record.
    pub fn units(&mut self, at: usize, units: &[u16]) -> &mut Self {
        let end = at + units.len() * 2;
        E::write_u16_into(units, &mut self.buf[at..end]);
        self
    }

    /// Raw bytes at `at`, typically an already-encoded sub-record.
    pub fn raw(&mut self, at: usize, bytes: &[u8]) -> &mut Self {
        self.buf[at..at + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, LittleEndian};

    const MAGIC: Field = Field::new("magic", 0, FieldKind::U32);
    const COUNT: Field = Field::new("count", 4, FieldKind::U16);
    const TAG: Field = Field::new("tag", 6, FieldKind::Bytes(2));

    static SAMPLE: Layout = Layout::new("Sample", &[MAGIC, COUNT, TAG], 8);

    #[test]
    fn builder_and_view_agree() -> Result<()> {
        let mut b = SAMPLE.builder::<BigEndian>(8);
        b.u32(&MAGIC, 0xDEADBEEF).u16(&COUNT, 3).bytes(&TAG, b"ok");
        let bytes = b.finish();
        assert_eq!(&bytes[..4], &[0xDE, 0xAD, 0xBE, 0xEF]);

        let v = SAMPLE.view::<BigEndian>(&bytes, 0)?;
        assert_eq!(v.u32(&MAGIC), 0xDEADBEEF);
        assert_eq!(v.u16(&COUNT), 3);
        assert_eq!(v.array::<2>(&TAG), *b"ok");
        Ok(())
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "tag is 2 bytes wide")]
    fn array_width_must_match_field() {
        let bytes = [0u8; 8];
        if let Ok(v) = SAMPLE.view::<BigEndian>(&bytes, 0) {
            let _ = v.array::<4>(&TAG);
        }
    }

    #[test]
    fn byte_order_is_a_type_parameter() -> Result<()> {
        let data = [0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0, 0];
        let le = SAMPLE.view::<LittleEndian>(&data, 0)?;
        let be = SAMPLE.view::<BigEndian>(&data, 0)?;
        assert_eq!(le.u32(&MAGIC), 1);
        assert_eq!(be.u32(&MAGIC), 0x0100_0000);
        assert_eq!(le.u16(&COUNT), 2);
        Ok(())
    }

    #[test]
    fn view_at_offset() -> Result<()> {
        let mut data = vec![0xFFu8; 3];
        data.extend_from_slice(&[0, 0, 0, 7, 0, 1, b'a', b'b']);
        let v = SAMPLE.view::<BigEndian>(&data, 3)?;
        assert_eq!(v.u32(&MAGIC), 7);
        assert_eq!(v.base(), 3);
        Ok(())
    }

    #[test]
    fn short_buffer_is_truncated_not_zero_filled() {
        let data = [0u8; 10];
        let err = SAMPLE.view::<BigEndian>(&data, 4).err();
        assert_eq!(
            err,
            Some(Error::Truncated {
                record: "Sample",
                offset: 4,
                needed: 8,
                available: 6,
            })
        );
        assert!(SAMPLE.view::<BigEndian>(&data, 40).is_err());
    }

    #[test]
    fn units_past_window_fail() -> Result<()> {
        let data = [0u8, 0, 0, 0, 0, 0, 0, 0x41];
        let v = SAMPLE.view::<BigEndian>(&data, 0)?;
        assert_eq!(v.units(6, 1)?, vec![0x0041]);
        assert!(v.units(6, 2).is_err());
        Ok(())
    }

    #[test]
    fn malformed_reports_absolute_offset() -> Result<()> {
        let data = [0u8; 20];
        let v = SAMPLE.view::<BigEndian>(&data, 10)?;
        match v.malformed(&COUNT, "zero") {
            Error::Malformed { field, offset, .. } => {
                assert_eq!(field, "count");
                assert_eq!(offset, 14);
            }
            other => panic!("unexpected {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn field_lookup_by_name() {
        assert_eq!(SAMPLE.field("count"), Some(&COUNT));
        assert_eq!(SAMPLE.field("missing"), None);
    }
}
