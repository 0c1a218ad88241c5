#![doc = include_str!("../README.md")]
#![deny(clippy::mod_module_files)]

pub mod cache;
pub mod connection;
pub(crate) mod encoding;
pub mod errors;
pub mod fingerprint;
pub mod fixture;
#[cfg(feature = "serde")]
pub mod json;
pub mod lifecycle;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod record_hash;
#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod value;

pub use cache::StateCache;
pub use connection::{Connection, Row, SupportsChecksum};
pub use errors::Error;
pub use fingerprint::{TableFingerprint, compute_fingerprint};
pub use fixture::{DEFAULT_CONNECTION, Fixture, FixtureId, Record, TableKey};
#[cfg(feature = "serde")]
pub use json::{JsonRecordsError, records_from_json};
pub use lifecycle::{ChecksumFixture, FixtureBackend, Outcome};
#[cfg(feature = "mysql")]
pub use crate::mysql::{MysqlBackend, MysqlConnection};
pub use record_hash::{RecordSetHash, compute_record_hash};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;
pub use value::Value;
