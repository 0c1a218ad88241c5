//! Insert, truncate and drop with load skipping.
//!
//! [`ChecksumFixture`] decides whether a fixture operation has to reach the
//! database at all. The writes themselves are delegated to a
//! [`FixtureBackend`].
//!
//! | operation  | skipped when                                                  |
//! |------------|---------------------------------------------------------------|
//! | `insert`   | table fingerprint unchanged, or same records already loaded   |
//! |            | (never on engines without table checksums)                    |
//! | `truncate` | table fingerprint unchanged                                   |
//! | `drop`     | never                                                         |
//!
//! The record-hash check runs whenever the fingerprint differs, so an insert
//! issued right after an external write, with no truncate in between, is
//! still skipped when the same records were loaded last. Test runners always
//! truncate before inserting, and truncating a modified table drops the
//! record hash.

use crate::cache::StateCache;
use crate::connection::Connection;
use crate::errors::Error;
use crate::fingerprint::{TableFingerprint, compute_fingerprint};
use crate::fixture::Fixture;
use crate::record_hash::compute_record_hash;

/// The writes a fixture performs against the database.
pub trait FixtureBackend<C: Connection + ?Sized> {
    /// Insert the fixture's records into its table.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the insert fails.
    fn insert(&mut self, connection: &mut C, fixture: &Fixture) -> Result<(), C::Error>;

    /// Delete every row of the fixture's table.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the truncation fails.
    fn truncate(&mut self, connection: &mut C, fixture: &Fixture) -> Result<(), C::Error>;

    /// Drop the fixture's table.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the drop fails.
    fn drop_table(&mut self, connection: &mut C, fixture: &Fixture) -> Result<(), C::Error>;
}

/// What a lifecycle operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The write was delegated to the backend and succeeded.
    Performed,
    /// The table fingerprint matched the one recorded after the last load.
    SkippedUnmodified,
    /// Another fixture already loaded identical records into the table.
    SkippedSameRecords,
}

impl Outcome {
    /// Whether the operation was skipped.
    #[must_use]
    pub fn is_skipped(self) -> bool {
        !matches!(self, Outcome::Performed)
    }
}

/// A fixture whose loads are skipped while its table is untouched.
#[derive(Debug, Clone)]
pub struct ChecksumFixture<B> {
    fixture: Fixture,
    backend: B,
}

impl<B> ChecksumFixture<B> {
    /// Wrap `fixture`, delegating real writes to `backend`.
    pub fn new(fixture: Fixture, backend: B) -> Self {
        Self { fixture, backend }
    }

    /// The wrapped fixture.
    #[must_use]
    pub fn fixture(&self) -> &Fixture {
        &self.fixture
    }

    /// The base backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Unwrap into the fixture and its backend.
    pub fn into_parts(self) -> (Fixture, B) {
        (self.fixture, self.backend)
    }

    /// Load the fixture's records unless the table already holds them.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be fingerprinted or the backend
    /// insert fails. The cache is only updated after a successful insert.
    pub fn insert<C>(
        &mut self,
        cache: &mut StateCache,
        connection: &mut C,
    ) -> Result<Outcome, Error<C::Error>>
    where
        C: Connection + ?Sized,
        B: FixtureBackend<C>,
    {
        let fixture = &self.fixture;
        let current = compute_fingerprint(connection, fixture.table())?;
        if is_unmodified(cache, fixture, &current) {
            tracing::debug!(fixture = %fixture.id(), table = fixture.table(), "table unmodified, skipping insert");
            return Ok(Outcome::SkippedUnmodified);
        }

        let key = fixture.table_key();
        let hash = compute_record_hash(fixture.records());
        tracing::trace!(key = %key, %hash, "computed record hash");
        if !current.is_volatile() && cache.record_hash(&key) == Some(&hash) {
            tracing::debug!(fixture = %fixture.id(), key = %key, "same records already loaded, skipping insert");
            return Ok(Outcome::SkippedSameRecords);
        }

        self.backend
            .insert(connection, fixture)
            .map_err(Error::Database)?;
        let loaded = compute_fingerprint(connection, fixture.table())?;
        tracing::debug!(fixture = %fixture.id(), table = fixture.table(), records = fixture.records().len(), "inserted fixture records");

        cache.set_fingerprint(fixture.id().clone(), loaded);
        cache.set_record_hash(key, hash);
        Ok(Outcome::Performed)
    }

    /// Empty the fixture's table unless it is untouched since the last load.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be fingerprinted or the backend
    /// truncation fails.
    pub fn truncate<C>(
        &mut self,
        cache: &mut StateCache,
        connection: &mut C,
    ) -> Result<Outcome, Error<C::Error>>
    where
        C: Connection + ?Sized,
        B: FixtureBackend<C>,
    {
        let fixture = &self.fixture;
        let current = compute_fingerprint(connection, fixture.table())?;
        if is_unmodified(cache, fixture, &current) {
            tracing::debug!(fixture = %fixture.id(), table = fixture.table(), "table unmodified, skipping truncate");
            return Ok(Outcome::SkippedUnmodified);
        }

        cache.remove_record_hash(&fixture.table_key());
        self.backend
            .truncate(connection, fixture)
            .map_err(Error::Database)?;
        tracing::debug!(fixture = %fixture.id(), table = fixture.table(), "truncated table");
        Ok(Outcome::Performed)
    }

    /// Drop the fixture's table and forget everything cached about it.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the drop fails. The cache entries are
    /// removed even then.
    pub fn drop<C>(
        &mut self,
        cache: &mut StateCache,
        connection: &mut C,
    ) -> Result<Outcome, Error<C::Error>>
    where
        C: Connection + ?Sized,
        B: FixtureBackend<C>,
    {
        let fixture = &self.fixture;
        cache.remove_fingerprint(fixture.id());
        cache.remove_record_hash(&fixture.table_key());
        self.backend
            .drop_table(connection, fixture)
            .map_err(Error::Database)?;
        tracing::debug!(fixture = %fixture.id(), table = fixture.table(), "dropped table");
        Ok(Outcome::Performed)
    }
}

/// A missing fingerprint counts as modified.
fn is_unmodified(cache: &StateCache, fixture: &Fixture, current: &TableFingerprint) -> bool {
    cache.fingerprint(fixture.id()) == Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;
    use crate::testing::{MemoryConnection, MemoryError, RecordingBackend, UnsupportedConnection};

    fn users_fixture(id: &str) -> ChecksumFixture<RecordingBackend> {
        ChecksumFixture::new(
            Fixture::new(id, "users").with_record(record! { "id" => 1, "name" => "x" }),
            RecordingBackend::new(),
        )
    }

    fn connection() -> MemoryConnection {
        let mut conn = MemoryConnection::new("app_test");
        conn.create_table("users");
        conn
    }

    #[test]
    fn test_first_insert_is_performed_and_cached() {
        let mut cache = StateCache::new();
        let mut conn = connection();
        let mut fixture = users_fixture("UsersFixture");

        assert_eq!(fixture.insert(&mut cache, &mut conn).unwrap(), Outcome::Performed);
        assert_eq!(fixture.backend().inserts(), 1);

        let loaded = compute_fingerprint(&mut conn, "users").unwrap();
        assert_eq!(cache.fingerprint(fixture.fixture().id()), Some(&loaded));
        assert_eq!(
            cache.record_hash(&fixture.fixture().table_key()),
            Some(&compute_record_hash(fixture.fixture().records()))
        );
    }

    #[test]
    fn test_second_insert_skips_unmodified() {
        let mut cache = StateCache::new();
        let mut conn = connection();
        let mut fixture = users_fixture("UsersFixture");

        fixture.insert(&mut cache, &mut conn).unwrap();
        assert_eq!(
            fixture.insert(&mut cache, &mut conn).unwrap(),
            Outcome::SkippedUnmodified
        );
        assert_eq!(fixture.backend().inserts(), 1);
        assert_eq!(conn.rows("users").unwrap().len(), 1);
    }

    #[test]
    fn test_unmodified_skip_does_not_hash_records() {
        let mut cache = StateCache::new();
        let mut conn = connection();
        let mut fixture = users_fixture("UsersFixture");
        fixture.insert(&mut cache, &mut conn).unwrap();

        // A stale record hash is irrelevant while the fingerprint matches.
        let key = fixture.fixture().table_key();
        cache.remove_record_hash(&key);
        assert_eq!(
            fixture.insert(&mut cache, &mut conn).unwrap(),
            Outcome::SkippedUnmodified
        );
        assert!(cache.record_hash(&key).is_none());
    }

    #[test]
    fn test_external_change_without_truncate_keeps_record_shortcut() {
        let mut cache = StateCache::new();
        let mut conn = connection();
        let mut fixture = users_fixture("UsersFixture");
        fixture.insert(&mut cache, &mut conn).unwrap();

        conn.insert_rows("users", &[record! { "id" => 2, "name" => "y" }])
            .unwrap();
        assert_eq!(
            fixture.insert(&mut cache, &mut conn).unwrap(),
            Outcome::SkippedSameRecords
        );
        assert_eq!(fixture.backend().inserts(), 1);
        assert_eq!(conn.rows("users").unwrap().len(), 2);
    }

    #[test]
    fn test_external_change_then_truncate_forces_insert() {
        let mut cache = StateCache::new();
        let mut conn = connection();
        let mut fixture = users_fixture("UsersFixture");
        fixture.insert(&mut cache, &mut conn).unwrap();

        conn.insert_rows("users", &[record! { "id" => 2, "name" => "y" }])
            .unwrap();
        assert_eq!(fixture.truncate(&mut cache, &mut conn).unwrap(), Outcome::Performed);
        assert_eq!(fixture.insert(&mut cache, &mut conn).unwrap(), Outcome::Performed);
        assert_eq!(fixture.backend().inserts(), 2);
        assert_eq!(
            conn.rows("users").unwrap(),
            &[record! { "id" => 1, "name" => "x" }]
        );
    }

    #[test]
    fn test_failed_insert_caches_nothing() {
        let mut cache = StateCache::new();
        let mut conn = connection();
        let mut backend = RecordingBackend::new();
        backend.fail_writes(true);
        let mut fixture = ChecksumFixture::new(
            Fixture::new("UsersFixture", "users").with_record(record! { "id" => 1 }),
            backend,
        );

        let err = fixture.insert(&mut cache, &mut conn).unwrap_err();
        assert!(matches!(err, Error::Database(MemoryError::Injected)));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_fingerprint_failure_caches_nothing() {
        let mut cache = StateCache::new();
        let mut conn = MemoryConnection::new("app_test");
        let mut fixture = users_fixture("UsersFixture");

        let err = fixture.insert(&mut cache, &mut conn).unwrap_err();
        assert!(matches!(err, Error::MissingChecksum { .. }));
        assert_eq!(fixture.backend().inserts(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_truncate_skips_unmodified() {
        let mut cache = StateCache::new();
        let mut conn = connection();
        let mut fixture = users_fixture("UsersFixture");
        fixture.insert(&mut cache, &mut conn).unwrap();

        assert_eq!(
            fixture.truncate(&mut cache, &mut conn).unwrap(),
            Outcome::SkippedUnmodified
        );
        assert_eq!(fixture.backend().truncates(), 0);
        assert!(cache.record_hash(&fixture.fixture().table_key()).is_some());
    }

    #[test]
    fn test_truncate_modified_clears_record_hash_only() {
        let mut cache = StateCache::new();
        let mut conn = connection();
        let mut fixture = users_fixture("UsersFixture");
        fixture.insert(&mut cache, &mut conn).unwrap();
        let cached = cache.fingerprint(fixture.fixture().id()).cloned();

        conn.insert_rows("users", &[record! { "id" => 7 }]).unwrap();
        assert_eq!(fixture.truncate(&mut cache, &mut conn).unwrap(), Outcome::Performed);
        assert_eq!(fixture.backend().truncates(), 1);
        assert!(cache.record_hash(&fixture.fixture().table_key()).is_none());
        assert_eq!(cache.fingerprint(fixture.fixture().id()).cloned(), cached);
        assert!(conn.rows("users").unwrap().is_empty());
    }

    #[test]
    fn test_truncate_without_cache_is_performed() {
        let mut cache = StateCache::new();
        let mut conn = connection();
        let mut fixture = users_fixture("UsersFixture");
        assert_eq!(fixture.truncate(&mut cache, &mut conn).unwrap(), Outcome::Performed);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_drop_clears_both_entries() {
        let mut cache = StateCache::new();
        let mut conn = connection();
        let mut fixture = users_fixture("UsersFixture");
        fixture.insert(&mut cache, &mut conn).unwrap();

        assert_eq!(fixture.drop(&mut cache, &mut conn).unwrap(), Outcome::Performed);
        assert_eq!(fixture.backend().drops(), 1);
        assert!(cache.is_empty());
        assert!(conn.rows("users").is_none());
    }

    #[test]
    fn test_drop_clears_cache_even_when_backend_fails() {
        let mut cache = StateCache::new();
        let mut conn = connection();
        let mut fixture = users_fixture("UsersFixture");
        fixture.insert(&mut cache, &mut conn).unwrap();

        let (inner, mut backend) = fixture.into_parts();
        backend.fail_writes(true);
        let mut fixture = ChecksumFixture::new(inner, backend);
        assert!(fixture.drop(&mut cache, &mut conn).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unsupported_engine_always_inserts() {
        let mut cache = StateCache::new();
        let mut conn = UnsupportedConnection;
        let mut fixture = users_fixture("UsersFixture");

        assert_eq!(fixture.insert(&mut cache, &mut conn).unwrap(), Outcome::Performed);
        assert_eq!(fixture.insert(&mut cache, &mut conn).unwrap(), Outcome::Performed);
        assert_eq!(fixture.backend().inserts(), 2);
        assert_eq!(fixture.truncate(&mut cache, &mut conn).unwrap(), Outcome::Performed);
    }

    #[test]
    fn test_outcome_is_skipped() {
        assert!(!Outcome::Performed.is_skipped());
        assert!(Outcome::SkippedUnmodified.is_skipped());
        assert!(Outcome::SkippedSameRecords.is_skipped());
    }
}
