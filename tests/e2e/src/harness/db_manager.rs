//! Test Database Manager
//!
//! Provides isolated database instances for testing:
//! - Temporary databases that are automatically cleaned up
//! - Databases upgraded from legacy fixture files
//! - Reopening, snapshots and raw file comparison

use std::path::{Path, PathBuf};

use rfstore_core::{EmitterRecord, EmitterStore, EmitterType, RfIdentification};
use tempfile::TempDir;

use crate::mocks::{LegacyFixture, TestDataFactory};

/// Manager for test databases
///
/// Creates isolated database instances for each test to prevent interference.
/// Automatically cleans up temporary databases when dropped.
///
/// # Example
///
/// ```rust,ignore
/// let mut db = TestDatabaseManager::new_temp();
/// db.seed_wifi(10);
/// assert_eq!(db.count(), 10);
/// ```
pub struct TestDatabaseManager {
    /// The store instance
    pub store: EmitterStore,
    /// Temporary directory (kept alive to prevent premature deletion)
    _temp_dir: TempDir,
    /// Path to the database file
    db_path: PathBuf,
    /// Snapshot data for restore operations
    snapshot: Option<Vec<EmitterRecord>>,
}

impl TestDatabaseManager {
    /// Create a new, empty store in a temporary directory
    pub fn new_temp() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test_rf.db");
        let store = EmitterStore::open_path(&db_path).expect("Failed to create test store");

        Self {
            store,
            _temp_dir: temp_dir,
            db_path,
            snapshot: None,
        }
    }

    /// Build a legacy file with `build`, then open (and so migrate) it
    pub fn from_legacy<F>(version: u32, build: F) -> Self
    where
        F: FnOnce(&LegacyFixture),
    {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("legacy_rf.db");
        {
            let fixture = LegacyFixture::create(&db_path, version);
            build(&fixture);
        }
        let store = EmitterStore::open_path(&db_path).expect("Failed to open legacy store");

        Self {
            store,
            _temp_dir: temp_dir,
            db_path,
            snapshot: None,
        }
    }

    /// Get the database path
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Number of stored emitters
    pub fn count(&self) -> i64 {
        self.store.count().unwrap_or(0)
    }

    /// Close and reopen the store on the same file
    pub fn reopen(&mut self) {
        // the old connection must close before the new one opens
        self.store = EmitterStore::open_in_memory().expect("Failed to open placeholder store");
        self.store = EmitterStore::open_path(&self.db_path).expect("Failed to reopen store");
    }

    /// Raw bytes of the database file with every connection closed
    pub fn file_bytes(&mut self) -> Vec<u8> {
        self.store = EmitterStore::open_in_memory().expect("Failed to open placeholder store");
        let bytes = std::fs::read(&self.db_path).expect("Failed to read database file");
        self.store = EmitterStore::open_path(&self.db_path).expect("Failed to reopen store");
        bytes
    }

    // ========================================================================
    // SEEDING METHODS
    // ========================================================================

    /// Insert records in one committed batch
    pub fn insert_all(&mut self, records: &[EmitterRecord]) {
        let mut batch = self.store.begin().expect("Failed to begin batch");
        for record in records {
            batch.insert(record).expect("Failed to insert record");
        }
        batch.end().expect("Failed to commit batch");
    }

    /// Seed 2.4 GHz access points spread along the equator
    pub fn seed_wifi(&mut self, count: usize) -> Vec<RfIdentification> {
        let records: Vec<_> = (0..count)
            .map(|i| TestDataFactory::wifi(&TestDataFactory::mac(i), EmitterType::Wlan2, 0.0, i as f64 * 0.001))
            .collect();
        self.insert_all(&records);
        records.into_iter().map(|r| r.id).collect()
    }

    // ========================================================================
    // SNAPSHOT/RESTORE
    // ========================================================================

    /// Take a snapshot of current database state
    pub fn take_snapshot(&mut self) {
        self.snapshot = Some(self.store.all_emitters().unwrap_or_default());
    }

    /// Restore from the last snapshot
    ///
    /// Recreates the database file and re-inserts every snapshot record.
    pub fn restore_snapshot(&mut self) -> bool {
        if let Some(records) = self.snapshot.take() {
            self.recreate();
            self.insert_all(&records);
            true
        } else {
            false
        }
    }

    /// Check if a snapshot exists
    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Recreate an empty database at the same path
    pub fn recreate(&mut self) {
        self.store = EmitterStore::open_in_memory().expect("Failed to open placeholder store");
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", self.db_path.display(), suffix));
        }
        self.store = EmitterStore::open_path(&self.db_path).expect("Failed to recreate store");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_store_is_empty() {
        let db = TestDatabaseManager::new_temp();
        assert_eq!(db.count(), 0);
        assert!(db.path().exists());
    }

    #[test]
    fn test_seed_and_reopen() {
        let mut db = TestDatabaseManager::new_temp();
        let ids = db.seed_wifi(5);
        assert_eq!(ids.len(), 5);
        db.reopen();
        assert_eq!(db.count(), 5);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut db = TestDatabaseManager::new_temp();
        db.seed_wifi(3);
        db.take_snapshot();
        assert!(db.has_snapshot());

        db.recreate();
        assert_eq!(db.count(), 0);

        assert!(db.restore_snapshot());
        assert_eq!(db.count(), 3);
        assert!(!db.restore_snapshot());
    }
}
