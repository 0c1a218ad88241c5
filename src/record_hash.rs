//! Content hashes of fixture record sets.

use core::fmt;

use sha2::{Digest, Sha256};

use crate::encoding::encode_record_set;
use crate::fixture::Record;

/// Lowercase hex SHA-256 digest of a canonically encoded record set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordSetHash(String);

impl RecordSetHash {
    /// The digest as lowercase hex.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordSetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hash the records a fixture would insert.
///
/// The hash depends on record order, field order within each record and the
/// type of every value: every value is encoded with a type tag, and strings
/// and field names with a length prefix.
#[must_use]
pub fn compute_record_hash(records: &[Record]) -> RecordSetHash {
    let digest = Sha256::digest(encode_record_set(records));
    RecordSetHash(hex::encode(digest))
}
