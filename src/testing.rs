//! Test doubles for fixture code.
//!
//! This module is gated behind the `testing` feature.
//!
//! # Provided doubles
//!
//! - [`MemoryConnection`]: an in-memory, checksum-capable connection that
//!   answers `CHECKSUM TABLE` and `INFORMATION_SCHEMA.TABLES` queries the way
//!   MySQL does and logs every query it receives
//! - [`UnsupportedConnection`]: a connection whose engine cannot checksum
//! - [`RecordingBackend`]: a base fixture backend that counts real writes and
//!   applies them to a [`MemoryConnection`]

use hashbrown::HashMap;
use sha2::{Digest, Sha256};

use crate::connection::{Connection, Row, SupportsChecksum};
use crate::encoding::encode_record_set;
use crate::fingerprint::{AUTO_INCREMENT_COLUMN, AUTO_INCREMENT_SQL, CHECKSUM_COLUMN};
use crate::fixture::{Fixture, Record};
use crate::lifecycle::FixtureBackend;
use crate::value::Value;

/// Errors reported by the in-memory doubles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    /// Failure injected with [`MemoryConnection::fail_queries`] or
    /// [`RecordingBackend::fail_writes`].
    #[error("injected failure")]
    Injected,
    /// A write targeted a table that does not exist.
    #[error("table `{0}` does not exist")]
    UnknownTable(String),
    /// The connection received a query it does not emulate.
    #[error("unsupported query: {0}")]
    UnsupportedQuery(String),
}

/// A query received by a [`MemoryConnection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedQuery {
    /// SQL text.
    pub sql: String,
    /// Named parameters, in the order they were passed.
    pub params: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct MemoryTable {
    rows: Vec<Record>,
    auto_increment: Option<i64>,
    in_catalog: bool,
    metadata: HashMap<String, Option<Value>>,
}

/// In-memory stand-in for a MySQL connection.
#[derive(Debug, Clone)]
pub struct MemoryConnection {
    schema: String,
    tables: HashMap<String, MemoryTable>,
    log: Vec<LoggedQuery>,
    fail_queries: bool,
}

impl MemoryConnection {
    /// Create a connection bound to `schema` with no tables.
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            tables: HashMap::new(),
            log: Vec::new(),
            fail_queries: false,
        }
    }

    /// Create an empty table with an auto-increment counter at 1.
    pub fn create_table(&mut self, table: &str) {
        self.tables.insert(
            table.to_string(),
            MemoryTable {
                rows: Vec::new(),
                auto_increment: Some(1),
                in_catalog: true,
                metadata: HashMap::new(),
            },
        );
    }

    /// Append rows, advancing the auto-increment counter once per row.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::UnknownTable`] if the table does not exist.
    pub fn insert_rows(&mut self, table: &str, rows: &[Record]) -> Result<(), MemoryError> {
        let entry = self.table_mut(table)?;
        entry.rows.extend_from_slice(rows);
        if let Some(counter) = entry.auto_increment.as_mut() {
            *counter += i64::try_from(rows.len()).unwrap_or(i64::MAX);
        }
        Ok(())
    }

    /// Remove all rows and reset the auto-increment counter, like
    /// `TRUNCATE TABLE`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::UnknownTable`] if the table does not exist.
    pub fn truncate_table(&mut self, table: &str) -> Result<(), MemoryError> {
        let entry = self.table_mut(table)?;
        entry.rows.clear();
        if entry.auto_increment.is_some() {
            entry.auto_increment = Some(1);
        }
        Ok(())
    }

    /// Drop a table. Dropping a missing table is a no-op.
    pub fn drop_table(&mut self, table: &str) {
        self.tables.remove(table);
    }

    /// Overwrite the auto-increment counter; `None` models a table without an
    /// auto-increment column.
    ///
    /// # Panics
    ///
    /// Panics if the table does not exist.
    pub fn set_auto_increment(&mut self, table: &str, counter: Option<i64>) {
        self.tables
            .get_mut(table)
            .expect("table must exist")
            .auto_increment = counter;
    }

    /// Make the catalog query find no row for `table`.
    ///
    /// # Panics
    ///
    /// Panics if the table does not exist.
    pub fn hide_from_catalog(&mut self, table: &str) {
        self.tables
            .get_mut(table)
            .expect("table must exist")
            .in_catalog = false;
    }

    /// Force the metadata column `column` reported for `table`.
    ///
    /// `Some(value)` replaces the computed value of a `Checksum` or
    /// `AUTO_INCREMENT` column; `None` leaves the column out of the row.
    ///
    /// # Panics
    ///
    /// Panics if the table does not exist.
    pub fn override_metadata(&mut self, table: &str, column: &str, value: Option<Value>) {
        self.tables
            .get_mut(table)
            .expect("table must exist")
            .metadata
            .insert(column.to_string(), value);
    }

    /// Make every subsequent query fail with [`MemoryError::Injected`].
    pub fn fail_queries(&mut self, fail: bool) {
        self.fail_queries = fail;
    }

    /// Current rows of `table`.
    #[must_use]
    pub fn rows(&self, table: &str) -> Option<&[Record]> {
        self.tables.get(table).map(|entry| entry.rows.as_slice())
    }

    /// The checksum `CHECKSUM TABLE` would report, `None` for missing tables.
    ///
    /// Empty tables checksum to 0, as in MySQL.
    #[must_use]
    pub fn checksum(&self, table: &str) -> Option<i64> {
        let entry = self.tables.get(table)?;
        if entry.rows.is_empty() {
            return Some(0);
        }
        let digest = Sha256::digest(encode_record_set(&entry.rows));
        Some(i64::from(u32::from_be_bytes([
            digest[0], digest[1], digest[2], digest[3],
        ])))
    }

    /// Every query received so far.
    #[must_use]
    pub fn query_log(&self) -> &[LoggedQuery] {
        &self.log
    }

    fn table_mut(&mut self, table: &str) -> Result<&mut MemoryTable, MemoryError> {
        self.tables
            .get_mut(table)
            .ok_or_else(|| MemoryError::UnknownTable(table.to_string()))
    }

    fn checksum_row(&self, sql: &str) -> Row {
        let quoted = sql.trim_start_matches("CHECKSUM TABLE ");
        let table = quoted
            .strip_prefix('`')
            .and_then(|rest| rest.strip_suffix('`'))
            .unwrap_or(quoted)
            .replace("``", "`");
        let mut row = Row::new();
        row.insert(
            "Table".to_string(),
            Value::Text(format!("{}.{table}", self.schema)),
        );
        let checksum = self.checksum(&table).into();
        self.put_metadata(&mut row, &table, CHECKSUM_COLUMN, checksum);
        row
    }

    fn auto_increment_row(&self, params: &[(&str, &str)]) -> Option<Row> {
        let param = |name: &str| {
            params
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
        };
        if param(":schema")? != self.schema {
            return None;
        }
        let table = param(":table")?;
        let entry = self.tables.get(table)?;
        if !entry.in_catalog {
            return None;
        }
        let mut row = Row::new();
        self.put_metadata(&mut row, table, AUTO_INCREMENT_COLUMN, entry.auto_increment.into());
        Some(row)
    }

    fn put_metadata(&self, row: &mut Row, table: &str, column: &str, computed: Value) {
        let forced = self
            .tables
            .get(table)
            .and_then(|entry| entry.metadata.get(column));
        match forced {
            Some(Some(value)) => {
                row.insert(column.to_string(), value.clone());
            }
            Some(None) => {}
            None => {
                row.insert(column.to_string(), computed);
            }
        }
    }
}

impl Connection for MemoryConnection {
    type Error = MemoryError;

    fn as_checksum(&mut self) -> Option<&mut dyn SupportsChecksum<Error = MemoryError>> {
        Some(self)
    }
}

impl SupportsChecksum for MemoryConnection {
    type Error = MemoryError;

    fn active_schema(&self) -> &str {
        &self.schema
    }

    fn query_row(
        &mut self,
        sql: &str,
        params: &[(&str, &str)],
    ) -> Result<Option<Row>, MemoryError> {
        self.log.push(LoggedQuery {
            sql: sql.to_string(),
            params: params
                .iter()
                .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
                .collect(),
        });
        if self.fail_queries {
            return Err(MemoryError::Injected);
        }
        if sql.starts_with("CHECKSUM TABLE ") {
            Ok(Some(self.checksum_row(sql)))
        } else if sql == AUTO_INCREMENT_SQL {
            Ok(self.auto_increment_row(params))
        } else {
            Err(MemoryError::UnsupportedQuery(sql.to_string()))
        }
    }
}

/// A connection to an engine without table checksums.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedConnection;

impl Connection for UnsupportedConnection {
    type Error = MemoryError;

    fn as_checksum(&mut self) -> Option<&mut dyn SupportsChecksum<Error = MemoryError>> {
        None
    }
}

/// Base fixture backend counting the writes that actually reach the
/// database.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordingBackend {
    inserts: usize,
    truncates: usize,
    drops: usize,
    fail_writes: bool,
}

impl RecordingBackend {
    /// Create a backend with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with [`MemoryError::Injected`].
    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of inserts performed.
    #[must_use]
    pub fn inserts(&self) -> usize {
        self.inserts
    }

    /// Number of truncations performed.
    #[must_use]
    pub fn truncates(&self) -> usize {
        self.truncates
    }

    /// Number of drops performed.
    #[must_use]
    pub fn drops(&self) -> usize {
        self.drops
    }

    fn check(&self) -> Result<(), MemoryError> {
        if self.fail_writes {
            Err(MemoryError::Injected)
        } else {
            Ok(())
        }
    }
}

impl FixtureBackend<MemoryConnection> for RecordingBackend {
    fn insert(
        &mut self,
        connection: &mut MemoryConnection,
        fixture: &Fixture,
    ) -> Result<(), MemoryError> {
        self.check()?;
        connection.insert_rows(fixture.table(), fixture.records())?;
        self.inserts += 1;
        Ok(())
    }

    fn truncate(
        &mut self,
        connection: &mut MemoryConnection,
        fixture: &Fixture,
    ) -> Result<(), MemoryError> {
        self.check()?;
        connection.truncate_table(fixture.table())?;
        self.truncates += 1;
        Ok(())
    }

    fn drop_table(
        &mut self,
        connection: &mut MemoryConnection,
        fixture: &Fixture,
    ) -> Result<(), MemoryError> {
        self.check()?;
        connection.drop_table(fixture.table());
        self.drops += 1;
        Ok(())
    }
}

impl FixtureBackend<UnsupportedConnection> for RecordingBackend {
    fn insert(
        &mut self,
        _connection: &mut UnsupportedConnection,
        _fixture: &Fixture,
    ) -> Result<(), MemoryError> {
        self.check()?;
        self.inserts += 1;
        Ok(())
    }

    fn truncate(
        &mut self,
        _connection: &mut UnsupportedConnection,
        _fixture: &Fixture,
    ) -> Result<(), MemoryError> {
        self.check()?;
        self.truncates += 1;
        Ok(())
    }

    fn drop_table(
        &mut self,
        _connection: &mut UnsupportedConnection,
        _fixture: &Fixture,
    ) -> Result<(), MemoryError> {
        self.check()?;
        self.drops += 1;
        Ok(())
    }
}
