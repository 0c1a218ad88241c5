//! Table fingerprints.
//!
//! On engines with the [`SupportsChecksum`] capability a fingerprint is the
//! table checksum followed by the table's auto-increment counter, so both a
//! content change and a consumed id invalidate it. Other engines get a
//! volatile fingerprint that never repeats, which makes every load run.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::connection::{Connection, SupportsChecksum};
use crate::errors::Error;
use crate::value::Value;

/// Column of the `CHECKSUM TABLE` result holding the checksum.
pub const CHECKSUM_COLUMN: &str = "Checksum";

/// Column of `INFORMATION_SCHEMA.TABLES` holding the next auto-increment id.
pub const AUTO_INCREMENT_COLUMN: &str = "AUTO_INCREMENT";

/// Catalog query for a table's auto-increment counter.
pub const AUTO_INCREMENT_SQL: &str = "SELECT `AUTO_INCREMENT` FROM INFORMATION_SCHEMA.TABLES \
     WHERE TABLE_SCHEMA = :schema AND TABLE_NAME = :table";

static VOLATILE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Summary of a table's stored state at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableFingerprint {
    value: String,
    volatile: bool,
}

impl TableFingerprint {
    /// Wrap an already computed fingerprint string.
    pub fn new(fingerprint: impl Into<String>) -> Self {
        Self {
            value: fingerprint.into(),
            volatile: false,
        }
    }

    /// Fingerprint that differs from every other fingerprint produced by this
    /// process.
    #[must_use]
    pub fn volatile() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_nanos());
        let sequence = VOLATILE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self {
            value: format!("{nanos}:{sequence}"),
            volatile: true,
        }
    }

    /// Whether this fingerprint came from an engine without table checksums.
    #[must_use]
    pub fn is_volatile(&self) -> bool {
        self.volatile
    }

    /// The fingerprint as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for TableFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.volatile {
            f.write_str("volatile:")?;
        }
        f.write_str(&self.value)
    }
}

/// Quote a table name as a MySQL identifier.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Compute the current fingerprint of `table`.
///
/// # Errors
///
/// Returns an error if the checksum or the auto-increment counter cannot be
/// read. Unsupported engines never fail.
pub fn compute_fingerprint<C>(
    connection: &mut C,
    table: &str,
) -> Result<TableFingerprint, Error<C::Error>>
where
    C: Connection + ?Sized,
{
    let Some(checksum) = connection.as_checksum() else {
        let fingerprint = TableFingerprint::volatile();
        tracing::trace!(table, %fingerprint, "engine cannot checksum tables, using volatile fingerprint");
        return Ok(fingerprint);
    };

    let checksum_part = table_checksum(&mut *checksum, table)?;
    let auto_increment_part = auto_increment(checksum, table)?;
    let fingerprint = TableFingerprint::new(format!("{checksum_part}{auto_increment_part}"));
    tracing::trace!(table, %fingerprint, "computed table fingerprint");
    Ok(fingerprint)
}

fn table_checksum<E>(
    connection: &mut dyn SupportsChecksum<Error = E>,
    table: &str,
) -> Result<String, Error<E>> {
    let sql = format!("CHECKSUM TABLE {}", quote_identifier(table));
    let row = connection
        .query_row(&sql, &[])
        .map_err(Error::Database)?
        .ok_or_else(|| Error::MissingChecksum {
            table: table.to_string(),
        })?;

    match row.get(CHECKSUM_COLUMN) {
        None | Some(Value::Null) => Err(Error::MissingChecksum {
            table: table.to_string(),
        }),
        Some(value) => render(value, table, CHECKSUM_COLUMN),
    }
}

fn auto_increment<E>(
    connection: &mut dyn SupportsChecksum<Error = E>,
    table: &str,
) -> Result<String, Error<E>> {
    let schema = connection.active_schema().to_string();
    let row = connection
        .query_row(AUTO_INCREMENT_SQL, &[(":schema", schema.as_str()), (":table", table)])
        .map_err(Error::Database)?;

    let value = row
        .as_ref()
        .and_then(|row| row.get(AUTO_INCREMENT_COLUMN))
        .ok_or_else(|| Error::MissingAutoIncrement {
            schema,
            table: table.to_string(),
        })?;

    // NULL for tables without an auto-increment column
    render(value, table, AUTO_INCREMENT_COLUMN)
}

fn render<E>(value: &Value, table: &str, column: &'static str) -> Result<String, Error<E>> {
    value
        .as_fingerprint_part()
        .ok_or_else(|| Error::MalformedMetadata {
            table: table.to_string(),
            column,
            value: value.clone(),
        })
}
