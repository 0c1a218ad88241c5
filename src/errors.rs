//! Submodule defining the errors used across the crate.

use crate::value::Value;

/// Errors raised while fingerprinting a table or running a fixture
/// operation.
///
/// `E` is the error type of the underlying [`Connection`](crate::Connection);
/// driver and backend failures are carried through unchanged.
#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    /// `CHECKSUM TABLE` produced no usable checksum (no row, no `Checksum`
    /// column, or NULL because the table does not exist).
    #[error("CHECKSUM TABLE returned no checksum for table `{table}`")]
    MissingChecksum {
        /// Table being fingerprinted.
        table: String,
    },
    /// The catalog has no `AUTO_INCREMENT` entry for the table.
    #[error("no AUTO_INCREMENT metadata for table `{table}` in schema `{schema}`")]
    MissingAutoIncrement {
        /// Active schema.
        schema: String,
        /// Table being fingerprinted.
        table: String,
    },
    /// A metadata column held a value that cannot be part of a fingerprint.
    #[error("malformed `{column}` value {value:?} for table `{table}`")]
    MalformedMetadata {
        /// Table being fingerprinted.
        table: String,
        /// Column that was read.
        column: &'static str,
        /// Offending value.
        value: Value,
    },
    /// Error reported by the driver or the base fixture backend.
    #[error(transparent)]
    Database(E),
}
