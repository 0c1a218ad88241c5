//! SQLite support through `rusqlite`.
//!
//! This module is gated behind the `sqlite` feature.
//!
//! SQLite has neither `CHECKSUM TABLE` nor an `INFORMATION_SCHEMA` catalog,
//! so a [`rusqlite::Connection`] exposes no checksum capability and every
//! fixture load runs. [`SqliteBackend`] performs the real writes.

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{OptionalExtension, ToSql, params_from_iter};

use crate::connection::{Connection, SupportsChecksum};
use crate::fixture::{Fixture, Record};
use crate::lifecycle::FixtureBackend;
use crate::value::Value;

impl Connection for rusqlite::Connection {
    type Error = rusqlite::Error;

    fn as_checksum(&mut self) -> Option<&mut dyn SupportsChecksum<Error = rusqlite::Error>> {
        None
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Integer(v) => ToSqlOutput::Borrowed(ValueRef::Integer(*v)),
            Value::Real(v) => ToSqlOutput::Borrowed(ValueRef::Real(*v)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl From<rusqlite::types::Value> for Value {
    fn from(value: rusqlite::types::Value) -> Self {
        match value {
            rusqlite::types::Value::Null => Value::Null,
            rusqlite::types::Value::Integer(v) => Value::Integer(v),
            rusqlite::types::Value::Real(v) => Value::Real(v),
            rusqlite::types::Value::Text(s) => Value::Text(s),
            rusqlite::types::Value::Blob(b) => Value::Blob(b),
        }
    }
}

/// Quote a name as a SQLite identifier.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Base fixture backend writing to a SQLite database.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteBackend;

impl FixtureBackend<rusqlite::Connection> for SqliteBackend {
    fn insert(
        &mut self,
        connection: &mut rusqlite::Connection,
        fixture: &Fixture,
    ) -> rusqlite::Result<()> {
        let table = quote_identifier(fixture.table());
        let tx = connection.transaction()?;
        for record in fixture.records() {
            if record.is_empty() {
                tx.execute(&format!("INSERT INTO {table} DEFAULT VALUES"), [])?;
                continue;
            }
            let columns = record
                .keys()
                .map(|column| quote_identifier(column))
                .collect::<Vec<_>>()
                .join(", ");
            let placeholders = (1..=record.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            tx.execute(
                &format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})"),
                params_from_iter(record.values()),
            )?;
        }
        tx.commit()
    }

    fn truncate(
        &mut self,
        connection: &mut rusqlite::Connection,
        fixture: &Fixture,
    ) -> rusqlite::Result<()> {
        let tx = connection.transaction()?;
        tx.execute(
            &format!("DELETE FROM {}", quote_identifier(fixture.table())),
            [],
        )?;
        // Only present once an AUTOINCREMENT table exists.
        let has_sequence = tx
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'sqlite_sequence'",
                [],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if has_sequence {
            tx.execute(
                "DELETE FROM sqlite_sequence WHERE name = ?1",
                [fixture.table()],
            )?;
        }
        tx.commit()
    }

    fn drop_table(
        &mut self,
        connection: &mut rusqlite::Connection,
        fixture: &Fixture,
    ) -> rusqlite::Result<()> {
        connection.execute(
            &format!("DROP TABLE IF EXISTS {}", quote_identifier(fixture.table())),
            [],
        )?;
        Ok(())
    }
}

/// Read every row of `table` in rowid order.
///
/// # Errors
///
/// Returns the driver error if the table cannot be read.
pub fn load_rows(connection: &rusqlite::Connection, table: &str) -> rusqlite::Result<Vec<Record>> {
    let mut stmt = connection.prepare(&format!(
        "SELECT * FROM {} ORDER BY rowid",
        quote_identifier(table)
    ))?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();
    let rows = stmt.query_map([], |row| {
        let mut record = Record::new();
        for (i, column) in columns.iter().enumerate() {
            let value: rusqlite::types::Value = row.get(i)?;
            record.insert(column.clone(), value.into());
        }
        Ok(record)
    })?;
    rows.collect()
}
