//! MySQL support through the synchronous `mysql` client.
//!
//! This module is gated behind the `mysql` feature.
//!
//! [`MysqlConnection`] wraps any [`Queryable`] handle (a `Conn`, a
//! `PooledConn` or an open `Transaction`) and exposes the checksum
//! capability, so unchanged tables are not reloaded. [`MysqlBackend`]
//! performs the real writes.
//!
//! MySQL 8 caches `INFORMATION_SCHEMA.TABLES` statistics. Run
//! `SET SESSION information_schema_stats_expiry = 0` on the handle before
//! wrapping it, or auto-increment changes may go unnoticed.

use ::mysql::prelude::Queryable;
use ::mysql::{Params, Row as MysqlRow, Value as MysqlValue};

use crate::connection::{Connection, Row, SupportsChecksum};
use crate::fingerprint::quote_identifier;
use crate::fixture::{Fixture, Record};
use crate::lifecycle::FixtureBackend;
use crate::value::Value;

/// A MySQL client handle together with its active schema.
#[derive(Debug)]
pub struct MysqlConnection<Q> {
    inner: Q,
    schema: String,
}

impl<Q: Queryable> MysqlConnection<Q> {
    /// Wrap `inner`, reading the active schema with `SELECT DATABASE()`.
    ///
    /// A connection without a selected database gets an empty schema, so
    /// fingerprinting fails with a missing auto-increment entry.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the schema query fails.
    pub fn new(mut inner: Q) -> ::mysql::Result<Self> {
        let schema = inner
            .query_first::<MysqlRow, _>("SELECT DATABASE()")?
            .and_then(|row| row.as_ref(0).cloned())
            .map(Value::from)
            .and_then(|value| match value {
                Value::Text(schema) => Some(schema),
                _ => None,
            })
            .unwrap_or_default();
        Ok(Self { inner, schema })
    }

    /// Wrap `inner` with a schema already known to the caller.
    #[must_use]
    pub fn with_schema(inner: Q, schema: impl Into<String>) -> Self {
        Self {
            inner,
            schema: schema.into(),
        }
    }

    /// The wrapped client handle.
    pub fn get_mut(&mut self) -> &mut Q {
        &mut self.inner
    }

    /// Unwrap the client handle.
    #[must_use]
    pub fn into_inner(self) -> Q {
        self.inner
    }
}

impl<Q: Queryable> Connection for MysqlConnection<Q> {
    type Error = ::mysql::Error;

    fn as_checksum(&mut self) -> Option<&mut dyn SupportsChecksum<Error = ::mysql::Error>> {
        Some(self)
    }
}

impl<Q: Queryable> SupportsChecksum for MysqlConnection<Q> {
    type Error = ::mysql::Error;

    fn active_schema(&self) -> &str {
        &self.schema
    }

    fn query_row(
        &mut self,
        sql: &str,
        params: &[(&str, &str)],
    ) -> Result<Option<Row>, ::mysql::Error> {
        // CHECKSUM TABLE is not preparable on every server version.
        let row = if params.is_empty() {
            self.inner.query_first::<MysqlRow, _>(sql)?
        } else {
            self.inner
                .exec_first::<MysqlRow, _, _>(sql, named_params(params))?
        };
        Ok(row.as_ref().map(row_from_mysql))
    }
}

/// Convert `:name` string parameters into driver parameters.
fn named_params(params: &[(&str, &str)]) -> Params {
    let named: Vec<(String, MysqlValue)> = params
        .iter()
        .map(|(name, value)| {
            (
                name.trim_start_matches(':').to_string(),
                MysqlValue::Bytes(value.as_bytes().to_vec()),
            )
        })
        .collect();
    Params::from(named)
}

fn row_from_mysql(row: &MysqlRow) -> Row {
    let mut converted = Row::new();
    for (i, column) in row.columns_ref().iter().enumerate() {
        let value = row.as_ref(i).cloned().map_or(Value::Null, Value::from);
        converted.insert(column.name_str().into_owned(), value);
    }
    converted
}

impl From<MysqlValue> for Value {
    fn from(value: MysqlValue) -> Self {
        match value {
            MysqlValue::NULL => Value::Null,
            // The text protocol reports every column as bytes.
            MysqlValue::Bytes(bytes) => match String::from_utf8(bytes) {
                Ok(text) => Value::Text(text),
                Err(err) => Value::Blob(err.into_bytes()),
            },
            MysqlValue::Int(v) => Value::Integer(v),
            MysqlValue::UInt(v) => {
                i64::try_from(v).map_or_else(|_| Value::Text(v.to_string()), Value::Integer)
            }
            MysqlValue::Float(v) => Value::Real(f64::from(v)),
            MysqlValue::Double(v) => Value::Real(v),
            MysqlValue::Date(year, month, day, hour, minute, second, micros) => Value::Text(
                format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}.{micros:06}"),
            ),
            MysqlValue::Time(negative, days, hours, minutes, seconds, micros) => {
                let sign = if negative { "-" } else { "" };
                let hours = u64::from(days) * 24 + u64::from(hours);
                Value::Text(format!(
                    "{sign}{hours:02}:{minutes:02}:{seconds:02}.{micros:06}"
                ))
            }
        }
    }
}

fn to_mysql(value: &Value) -> MysqlValue {
    match value {
        Value::Null => MysqlValue::NULL,
        Value::Integer(v) => MysqlValue::Int(*v),
        Value::Real(v) => MysqlValue::Double(*v),
        Value::Text(s) => MysqlValue::Bytes(s.as_bytes().to_vec()),
        Value::Blob(b) => MysqlValue::Bytes(b.clone()),
    }
}

/// `INSERT` statement for one record, with positional placeholders.
fn insert_sql(table: &str, record: &Record) -> String {
    let table = quote_identifier(table);
    if record.is_empty() {
        return format!("INSERT INTO {table} () VALUES ()");
    }
    let columns = record
        .keys()
        .map(|column| quote_identifier(column))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; record.len()].join(", ");
    format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})")
}

/// Base fixture backend writing to a MySQL database.
///
/// Records are inserted one statement each. Wrap the connection around a
/// `Transaction` to make a load atomic.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlBackend;

impl<Q: Queryable> FixtureBackend<MysqlConnection<Q>> for MysqlBackend {
    fn insert(
        &mut self,
        connection: &mut MysqlConnection<Q>,
        fixture: &Fixture,
    ) -> ::mysql::Result<()> {
        for record in fixture.records() {
            let values: Vec<MysqlValue> = record.values().map(to_mysql).collect();
            let params = if values.is_empty() {
                Params::Empty
            } else {
                Params::Positional(values)
            };
            connection
                .inner
                .exec_drop(insert_sql(fixture.table(), record), params)?;
        }
        Ok(())
    }

    fn truncate(
        &mut self,
        connection: &mut MysqlConnection<Q>,
        fixture: &Fixture,
    ) -> ::mysql::Result<()> {
        connection
            .inner
            .query_drop(format!("TRUNCATE TABLE {}", quote_identifier(fixture.table())))
    }

    fn drop_table(
        &mut self,
        connection: &mut MysqlConnection<Q>,
        fixture: &Fixture,
    ) -> ::mysql::Result<()> {
        connection.inner.query_drop(format!(
            "DROP TABLE IF EXISTS {}",
            quote_identifier(fixture.table())
        ))
    }
}
