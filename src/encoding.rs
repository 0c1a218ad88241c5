//! Canonical byte encoding of fixture record sets.
//!
//! The layout is:
//!
//! ```text
//! varint(record count)
//! per record:  varint(field count)
//! per field:   varint(name len) name-bytes value
//! value:       0x00                               NULL
//!              0x01 i64 (8 bytes, big-endian)     INTEGER
//!              0x02 f64 bits (8 bytes, big-endian) REAL
//!              0x03 varint(len) UTF-8 bytes       TEXT
//!              0x04 varint(len) raw bytes         BLOB
//! ```
//!
//! Every value carries its type tag, so `1` and `"1"` never encode alike.
//! Field order is part of the encoding.

mod varint;

use crate::fixture::Record;
use crate::value::Value;
use varint::write_len;

/// Append the canonical encoding of one value.
pub(crate) fn encode_value(out: &mut Vec<u8>, value: &Value) {
    out.push(value.type_tag());
    match value {
        Value::Null => {}
        Value::Integer(v) => out.extend(v.to_be_bytes()),
        Value::Real(v) => out.extend(v.to_bits().to_be_bytes()),
        Value::Text(s) => {
            write_len(out, s.len());
            out.extend(s.as_bytes());
        }
        Value::Blob(b) => {
            write_len(out, b.len());
            out.extend(b);
        }
    }
}

/// Append the canonical encoding of one record.
pub(crate) fn encode_record(out: &mut Vec<u8>, record: &Record) {
    write_len(out, record.len());
    for (name, value) in record {
        write_len(out, name.len());
        out.extend(name.as_bytes());
        encode_value(out, value);
    }
}

/// Encode an ordered record set.
#[must_use]
pub(crate) fn encode_record_set(records: &[Record]) -> Vec<u8> {
    let mut out = Vec::new();
    write_len(&mut out, records.len());
    for record in records {
        encode_record(&mut out, record);
    }
    out
}
