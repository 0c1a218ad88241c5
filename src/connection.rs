//! Driver abstraction consumed by the fingerprint provider.
//!
//! A [`Connection`] only has to say whether its engine can checksum tables.
//! Engines that can hand out a [`SupportsChecksum`] capability; everything
//! else falls back to always reloading fixtures.

use indexmap::IndexMap;

use crate::value::Value;

/// A result row, keyed by column name in result order.
pub type Row = IndexMap<String, Value>;

/// A database connection fixtures are loaded through.
pub trait Connection {
    /// Error type reported by the driver.
    type Error: core::error::Error + Send + Sync + 'static;

    /// Returns the checksum capability when the engine supports
    /// `CHECKSUM TABLE` and an `INFORMATION_SCHEMA.TABLES` catalog.
    fn as_checksum(&mut self) -> Option<&mut dyn SupportsChecksum<Error = Self::Error>>;
}

/// Capability of engines that can checksum a table and report its
/// auto-increment counter.
pub trait SupportsChecksum {
    /// Error type reported by the driver.
    type Error;

    /// Name of the schema (database) the connection is bound to.
    fn active_schema(&self) -> &str;

    /// Run a read-only query and return its first row, if any.
    ///
    /// `params` are bound by name, e.g. `(":schema", "app_test")`.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the query fails.
    fn query_row(&mut self, sql: &str, params: &[(&str, &str)])
    -> Result<Option<Row>, Self::Error>;
}

impl<C: Connection + ?Sized> Connection for &mut C {
    type Error = C::Error;

    #[inline]
    fn as_checksum(&mut self) -> Option<&mut dyn SupportsChecksum<Error = Self::Error>> {
        C::as_checksum(self)
    }
}
