use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Semantic value of one decoded field, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Unsigned(u64),
    Bytes(Vec<u8>),
    Text(String),
    Record(Vec<(&'static str, FieldValue)>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldValue::Unsigned(n) => write!(f, "{n}"),
            FieldValue::Bytes(b) => {
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            FieldValue::Text(s) => write!(f, "\"{s}\""),
            FieldValue::Record(fields) => {
                write!(f, "{{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Unsigned(n) => serializer.serialize_u64(*n),
            FieldValue::Bytes(b) => serializer.serialize_bytes(b),
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Record(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (name, value) in fields {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
        }
    }
}

/// Writes one `name: value` line per field, nested records indented under
/// their name.
pub fn print_fields(
    out: &mut dyn fmt::Write,
    prefix: &str,
    fields: &[(&'static str, FieldValue)],
) -> fmt::Result {
    for (name, value) in fields {
        match value {
            FieldValue::Record(inner) => {
                writeln!(out, "{prefix} {name}:")?;
                let mut nested = String::from(prefix);
                nested.push_str("  ");
                print_fields(out, &nested, inner)?;
            }
            other => writeln!(out, "{prefix} {name}: {other}")?,
        }
    }
    Ok(())
}
