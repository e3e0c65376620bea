//! HFS+ case-insensitive name ordering (TN1150 `FastUnicodeCompare`).
//!
//! Names are compared one UTF-16 unit at a time after a fixed per-unit
//! folding. Only characters that cannot be decomposed are folded: HFS+ stores
//! names in canonical decomposition, so `À` never reaches the table as a
//! single unit. A handful of formatting characters are ignored entirely, and
//! U+0000 folds to U+FFFF so that it sorts after everything else.

use core::cmp::Ordering;

#[derive(Clone, Copy)]
enum Fold {
    Add(u16),
    Ignore,
}

/// A run of units `first..=last`; only every `step`-th unit from `first` is
/// affected.
struct Span {
    first: u16,
    last: u16,
    step: u16,
    fold: Fold,
}

const fn add(first: u16, last: u16, delta: u16) -> Span {
    Span { first, last, step: 1, fold: Fold::Add(delta) }
}

const fn every_other(first: u16, last: u16) -> Span {
    Span { first, last, step: 2, fold: Fold::Add(1) }
}

const fn ignore(first: u16, last: u16) -> Span {
    Span { first, last, step: 1, fold: Fold::Ignore }
}

// Sorted by `first`, non-overlapping.
static CASE_FOLDING: &[Span] = &[
    add(0x0041, 0x005A, 0x20),
    add(0x00C6, 0x00C6, 0x20),
    add(0x00D0, 0x00D0, 0x20),
    add(0x00D8, 0x00D8, 0x20),
    add(0x00DE, 0x00DE, 0x20),
    add(0x0110, 0x0110, 1),
    add(0x0126, 0x0126, 1),
    add(0x0132, 0x0132, 1),
    add(0x013F, 0x013F, 1),
    add(0x0141, 0x0141, 1),
    add(0x014A, 0x014A, 1),
    add(0x0152, 0x0152, 1),
    add(0x0166, 0x0166, 1),
    add(0x0181, 0x0181, 0xD2),
    every_other(0x0182, 0x0184),
    add(0x0186, 0x0186, 0xCE),
    add(0x0187, 0x0187, 1),
    add(0x0189, 0x018A, 0xCD),
    add(0x018B, 0x018B, 1),
    add(0x018E, 0x018E, 0x4F),
    add(0x018F, 0x018F, 0xCA),
    add(0x0190, 0x0190, 0xCB),
    add(0x0191, 0x0191, 1),
    add(0x0193, 0x0193, 0xCD),
    add(0x0194, 0x0194, 0xCF),
    add(0x0196, 0x0196, 0xD3),
    add(0x0197, 0x0197, 0xD1),
    add(0x0198, 0x0198, 1),
    add(0x019C, 0x019C, 0xD3),
    add(0x019D, 0x019D, 0xD5),
    add(0x019F, 0x019F, 0xD6),
    every_other(0x01A2, 0x01A4),
    add(0x01A7, 0x01A7, 1),
    add(0x01A9, 0x01A9, 0xDA),
    add(0x01AC, 0x01AC, 1),
    add(0x01AE, 0x01AE, 0xDA),
    add(0x01B1, 0x01B2, 0xD9),
    every_other(0x01B3, 0x01B5),
    add(0x01B7, 0x01B7, 0xDB),
    add(0x01B8, 0x01B8, 1),
    add(0x01BC, 0x01BC, 1),
    add(0x01C4, 0x01C4, 2),
    add(0x01C5, 0x01C5, 1),
    add(0x01C7, 0x01C7, 2),
    add(0x01C8, 0x01C8, 1),
    add(0x01CA, 0x01CA, 2),
    add(0x01CB, 0x01CB, 1),
    add(0x01E4, 0x01E4, 1),
    add(0x01F1, 0x01F1, 2),
    add(0x01F2, 0x01F2, 1),
    // Greek
    add(0x0391, 0x03A1, 0x20),
    add(0x03A3, 0x03A9, 0x20),
    every_other(0x03E2, 0x03EE),
    // Cyrillic
    add(0x0402, 0x0402, 0x50),
    add(0x0404, 0x0406, 0x50),
    add(0x0408, 0x040B, 0x50),
    add(0x040F, 0x040F, 0x50),
    add(0x0410, 0x0418, 0x20),
    add(0x041A, 0x042F, 0x20),
    every_other(0x0460, 0x0474),
    every_other(0x0478, 0x0480),
    every_other(0x0490, 0x04BE),
    add(0x04C3, 0x04C3, 1),
    add(0x04C7, 0x04C7, 1),
    add(0x04CB, 0x04CB, 1),
    // Armenian
    add(0x0531, 0x0556, 0x30),
    // Georgian
    add(0x10A0, 0x10C5, 0x30),
    // Zero-width joiners and directional marks
    ignore(0x200C, 0x200F),
    ignore(0x202A, 0x202E),
    ignore(0x206A, 0x206F),
    // Roman numerals
    add(0x2160, 0x216F, 0x10),
    // Byte order mark
    ignore(0xFEFF, 0xFEFF),
    // Fullwidth Latin
    add(0xFF21, 0xFF3A, 0x20),
];

/// Folded value of one unit, or `None` if the unit is ignored for ordering.
pub fn fold(c: u16) -> Option<u16> {
    if c == 0 {
        return Some(0xFFFF);
    }
    let idx = CASE_FOLDING
        .binary_search_by(|span| {
            if c < span.first {
                Ordering::Greater
            } else if c > span.last {
                Ordering::Less
            } else {
                Ordering::Equal
            }
        })
        .ok();
    let Some(span) = idx.map(|i| &CASE_FOLDING[i]) else {
        return Some(c);
    };
    if (c - span.first) % span.step != 0 {
        return Some(c);
    }
    match span.fold {
        Fold::Add(delta) => Some(c + delta),
        Fold::Ignore => None,
    }
}

/// Orders two names the way the HFS+ catalog B-tree does. Does not allocate.
pub fn fast_unicode_compare(str1: &[u16], str2: &[u16]) -> Ordering {
    let a = str1.iter().filter_map(|&c| fold(c));
    let b = str2.iter().filter_map(|&c| fold(c));
    a.cmp(b)
}
