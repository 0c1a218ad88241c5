//! Load state shared by every fixture of a test run.

use hashbrown::HashMap;

use crate::fingerprint::TableFingerprint;
use crate::fixture::{FixtureId, TableKey};
use crate::record_hash::RecordSetHash;

/// Last known table fingerprints and record hashes.
///
/// Create one instance when the test run starts and pass it to every
/// lifecycle call. Fixture values are rebuilt between tests; this cache is
/// what carries the load state across them. Entries never expire, they are
/// only removed by truncate and drop.
#[derive(Debug, Clone, Default)]
pub struct StateCache {
    table_fingerprints: HashMap<FixtureId, TableFingerprint>,
    record_hashes: HashMap<TableKey, RecordSetHash>,
}

impl StateCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprint recorded after the last load by `fixture`.
    #[must_use]
    pub fn fingerprint(&self, fixture: &FixtureId) -> Option<&TableFingerprint> {
        self.table_fingerprints.get(fixture)
    }

    /// Record the fingerprint of the table `fixture` just loaded.
    pub fn set_fingerprint(&mut self, fixture: FixtureId, fingerprint: TableFingerprint) {
        self.table_fingerprints.insert(fixture, fingerprint);
    }

    /// Forget the fingerprint of `fixture`.
    pub fn remove_fingerprint(&mut self, fixture: &FixtureId) -> Option<TableFingerprint> {
        self.table_fingerprints.remove(fixture)
    }

    /// Hash of the records last loaded into `key`.
    #[must_use]
    pub fn record_hash(&self, key: &TableKey) -> Option<&RecordSetHash> {
        self.record_hashes.get(key)
    }

    /// Record the hash of the records just loaded into `key`.
    pub fn set_record_hash(&mut self, key: TableKey, hash: RecordSetHash) {
        self.record_hashes.insert(key, hash);
    }

    /// Forget the record hash of `key`.
    pub fn remove_record_hash(&mut self, key: &TableKey) -> Option<RecordSetHash> {
        self.record_hashes.remove(key)
    }

    /// Number of fixtures with a recorded fingerprint.
    #[must_use]
    pub fn fingerprint_count(&self) -> usize {
        self.table_fingerprints.len()
    }

    /// Number of tables with a recorded record hash.
    #[must_use]
    pub fn record_hash_count(&self) -> usize {
        self.record_hashes.len()
    }

    /// Whether both namespaces are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table_fingerprints.is_empty() && self.record_hashes.is_empty()
    }
}
