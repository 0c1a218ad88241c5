//! Fixture data: identity, target table and the records to load.

use core::fmt;

use indexmap::IndexMap;

use crate::value::Value;

/// Connection name fixtures use when none is configured.
pub const DEFAULT_CONNECTION: &str = "test";

/// One row a fixture inserts, as an ordered column name to value mapping.
///
/// Insertion order is the field order used for hashing.
pub type Record = IndexMap<String, Value>;

/// Build a [`Record`] from `column => value` pairs.
///
/// ```
/// use checksum_fixture::{record, Value};
///
/// let row = record! { "id" => 1, "name" => "x" };
/// assert_eq!(row["name"], Value::from("x"));
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::new()
    };
    ($($column:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::Record::new();
        $(
            record.insert(::std::string::String::from($column), $crate::Value::from($value));
        )+
        record
    }};
}

/// Stable identity of a fixture type, used to key table fingerprints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixtureId(String);

impl FixtureId {
    /// Create an identity from an explicit name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Identity derived from a Rust type's fully qualified name.
    #[must_use]
    pub fn of<T: ?Sized>() -> Self {
        Self(core::any::type_name::<T>().to_string())
    }

    /// The identity as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FixtureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FixtureId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for FixtureId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Composite `"<connection>-<table>"` key used to share record hashes
/// between fixtures that load the same table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableKey(String);

impl TableKey {
    /// Build the key for `table` on `connection`.
    #[must_use]
    pub fn new(connection: &str, table: &str) -> Self {
        Self(format!("{connection}-{table}"))
    }

    /// The key as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Test data bound to one table on one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    id: FixtureId,
    table: String,
    connection: String,
    records: Vec<Record>,
}

impl Fixture {
    /// Create an empty fixture for `table` on the default connection.
    pub fn new(id: impl Into<FixtureId>, table: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            table: table.into(),
            connection: DEFAULT_CONNECTION.to_string(),
            records: Vec::new(),
        }
    }

    /// Bind the fixture to a named connection.
    #[must_use]
    pub fn with_connection(mut self, connection: impl Into<String>) -> Self {
        self.connection = connection.into();
        self
    }

    /// Append one record.
    #[must_use]
    pub fn with_record(mut self, record: Record) -> Self {
        self.records.push(record);
        self
    }

    /// Append several records, keeping their order.
    #[must_use]
    pub fn with_records(mut self, records: impl IntoIterator<Item = Record>) -> Self {
        self.records.extend(records);
        self
    }

    /// The fixture identity.
    #[must_use]
    pub fn id(&self) -> &FixtureId {
        &self.id
    }

    /// Target table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Connection name.
    #[must_use]
    pub fn connection(&self) -> &str {
        &self.connection
    }

    /// Records in insertion order.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Key under which this fixture's record hash is shared.
    #[must_use]
    pub fn table_key(&self) -> TableKey {
        TableKey::new(&self.connection, &self.table)
    }
}
