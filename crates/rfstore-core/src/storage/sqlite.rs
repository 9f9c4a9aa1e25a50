//! SQLite Storage Implementation
//!
//! Emitter store over a single SQLite connection. The store is not internally
//! synchronized: its owner serializes every call.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension};

use super::batch::Batch;
use super::config::StoreConfig;
use super::migrations;
use crate::emitter::{BoundingBox, EmitterRecord, EmitterType, RfIdentification};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Storage error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
    /// Insert of an emitter that is already stored
    #[error("Emitter already stored: {key}")]
    ConstraintViolation { key: String },
    /// A migration step failed and was rolled back
    #[error("Schema migration to v{version} failed: {source}")]
    Migration {
        version: u32,
        source: Box<StoreError>,
    },
    /// A migration step wrote a different number of rows than it transformed
    #[error("Migration v{version} wrote {actual} rows, expected {expected}")]
    MigrationCheck {
        version: u32,
        expected: usize,
        actual: usize,
    },
    /// Schema version header this build cannot read
    #[error("Unsupported schema version {found} (this build reads up to v{supported})")]
    UnsupportedVersion { found: i64, supported: u32 },
    /// Transaction requested while the connection is already inside one
    #[error("Transaction misuse: {0}")]
    TransactionMisuse(String),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Map a failed insert to `ConstraintViolation` when the key was taken
    pub(super) fn from_insert(err: rusqlite::Error, key: &str) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => StoreError::ConstraintViolation {
                key: key.to_string(),
            },
            _ => StoreError::Database(err),
        }
    }
}

// ============================================================================
// SQL
// ============================================================================

pub(super) const INSERT_SQL: &str =
    "INSERT INTO emitters (rfID, rfType, trust, latitude, longitude, radius_ns, radius_ew, note)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

pub(super) const UPDATE_SQL: &str =
    "UPDATE emitters SET trust = ?1, latitude = ?2, longitude = ?3, radius_ns = ?4, radius_ew = ?5, note = ?6
     WHERE rfID = ?7 AND rfType = ?8";

pub(super) const DROP_SQL: &str = "DELETE FROM emitters WHERE rfID = ?1 AND rfType = ?2";

const SELECT_COLUMNS: &str =
    "SELECT rfID, rfType, trust, latitude, longitude, radius_ns, radius_ew, note FROM emitters";

/// Keys bound per statement in bulk lookups, below SQLite's parameter limit
const LOOKUP_CHUNK: usize = 500;

// ============================================================================
// STORE
// ============================================================================

/// Persistent store of emitter records
///
/// Opening the store migrates the file to the current schema. Reads go
/// straight to SQLite; mutations happen through a [`Batch`] from
/// [`EmitterStore::begin`].
pub struct EmitterStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl EmitterStore {
    /// Apply PRAGMAs to a connection
    fn configure_connection(conn: &Connection, config: &StoreConfig) -> Result<()> {
        conn.execute_batch(&config.pragmas())?;
        Ok(())
    }

    /// Open (creating and migrating if needed) the store described by `config`
    pub fn open(config: StoreConfig) -> Result<Self> {
        let path = config.resolve_path()?;
        let mut conn = Connection::open(&path)?;

        // Restrict database file permissions to owner-only on Unix
        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        Self::configure_connection(&conn, &config)?;
        let applied = migrations::apply_migrations(&mut conn)?;

        tracing::info!(
            path = %path.display(),
            migrations_applied = applied,
            "Emitter store opened"
        );

        Ok(Self {
            conn,
            path: Some(path),
        })
    }

    /// Open the store at `path` with default settings
    pub fn open_path(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open(StoreConfig::with_path(path))
    }

    /// Open a private in-memory store (for testing and tools)
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        Self::configure_connection(&conn, &StoreConfig::default())?;
        migrations::apply_migrations(&mut conn)?;
        Ok(Self { conn, path: None })
    }

    /// Database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Schema version recorded in the file
    pub fn schema_version(&self) -> Result<u32> {
        migrations::get_current_version(&self.conn)
    }

    /// Start an atomic batch of mutations
    ///
    /// Fails with `TransactionMisuse` if the connection is still inside a
    /// transaction that was never ended (a leaked batch).
    pub fn begin(&mut self) -> Result<Batch<'_>> {
        Batch::begin(&mut self.conn)
    }

    // ========== Reads ==========

    /// Point lookup, `None` when the emitter is not stored
    pub fn get_emitter(&self, id: &RfIdentification) -> Result<Option<EmitterRecord>> {
        query_emitter(&self.conn, id)
    }

    /// Bulk lookup in as few round trips as possible
    ///
    /// Absent keys are skipped, so the result can be shorter than the input.
    pub fn get_emitters<'a, I>(&self, ids: I) -> Result<Vec<EmitterRecord>>
    where
        I: IntoIterator<Item = &'a RfIdentification>,
    {
        query_emitters(&self.conn, ids)
    }

    /// Identities of every emitter of `rf_type` inside `bb`
    pub fn get_ids(&self, rf_type: EmitterType, bb: &BoundingBox) -> Result<HashSet<RfIdentification>> {
        query_ids(&self.conn, rf_type, bb)
    }

    /// Full records of every emitter of any of `rf_types` inside `bb`
    pub fn get_emitters_in_box(
        &self,
        rf_types: &[EmitterType],
        bb: &BoundingBox,
    ) -> Result<Vec<EmitterRecord>> {
        query_emitters_in_box(&self.conn, rf_types, bb)
    }

    /// Total number of stored emitters
    pub fn count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM emitters", [], |row| row.get(0))?)
    }

    /// Number of stored emitters per type, types without rows omitted
    pub fn count_by_type(&self) -> Result<BTreeMap<EmitterType, i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT rfType, COUNT(*) FROM emitters GROUP BY rfType")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let (ordinal, count) = row?;
            match EmitterType::from_ordinal(ordinal) {
                Some(t) => {
                    counts.insert(t, count);
                }
                None => tracing::warn!(ordinal, count, "Rows with unknown emitter type"),
            }
        }
        Ok(counts)
    }

    /// Every stored emitter ordered by storage key
    pub fn all_emitters(&self) -> Result<Vec<EmitterRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY rfID", SELECT_COLUMNS))?;
        let rows = stmt.query_map([], row_to_emitter)?;
        collect_known(rows)
    }

    /// Flush the WAL into the main database file
    pub fn checkpoint(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}

// ============================================================================
// QUERIES (shared by the store and open batches)
// ============================================================================

/// Convert a row to EmitterRecord, `None` for unknown type ordinals
fn row_to_emitter(row: &rusqlite::Row) -> rusqlite::Result<Option<EmitterRecord>> {
    let key: String = row.get(0)?;
    let ordinal: i64 = row.get(1)?;
    let Some(rf_type) = EmitterType::from_ordinal(ordinal) else {
        tracing::warn!(key = %key, ordinal, "Skipping emitter with unknown type");
        return Ok(None);
    };

    Ok(Some(EmitterRecord {
        id: RfIdentification::from_storage_key(&key, rf_type),
        trust: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        radius_ns: row.get::<_, f64>(5)? as f32,
        radius_ew: row.get::<_, f64>(6)? as f32,
        note: row.get(7)?,
    }))
}

fn collect_known<I>(rows: I) -> Result<Vec<EmitterRecord>>
where
    I: Iterator<Item = rusqlite::Result<Option<EmitterRecord>>>,
{
    let mut result = Vec::new();
    for row in rows {
        if let Some(record) = row? {
            result.push(record);
        }
    }
    Ok(result)
}

pub(super) fn query_emitter(conn: &Connection, id: &RfIdentification) -> Result<Option<EmitterRecord>> {
    tracing::debug!("getEmitter(): {}", id.log_string());
    let mut stmt = conn.prepare_cached(&format!("{} WHERE rfID = ?1 AND rfType = ?2", SELECT_COLUMNS))?;
    let record = stmt
        .query_row(params![id.storage_key(), id.rf_type.ordinal()], row_to_emitter)
        .optional()?;
    Ok(record.flatten())
}

pub(super) fn query_emitters<'a, I>(conn: &Connection, ids: I) -> Result<Vec<EmitterRecord>>
where
    I: IntoIterator<Item = &'a RfIdentification>,
{
    // storage key -> requested type; also removes duplicates
    let wanted: BTreeMap<String, EmitterType> = ids
        .into_iter()
        .map(|id| (id.storage_key(), id.rf_type))
        .collect();
    if wanted.is_empty() {
        return Ok(Vec::new());
    }

    let keys: Vec<&String> = wanted.keys().collect();
    let mut emitters = Vec::with_capacity(keys.len());

    for chunk in keys.chunks(LOOKUP_CHUNK) {
        let placeholders = vec!["?"; chunk.len()].join(",");
        let sql = format!("{} WHERE rfID IN ({})", SELECT_COLUMNS, placeholders);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(chunk.iter()), row_to_emitter)?;

        for record in collect_known(rows)? {
            if wanted.get(&record.storage_key()) == Some(&record.rf_type()) {
                emitters.push(record);
            }
        }
    }

    if emitters.len() != wanted.len() {
        tracing::debug!(
            requested = wanted.len(),
            found = emitters.len(),
            "getEmitters(ids): not all emitters found"
        );
    }
    Ok(emitters)
}

pub(super) fn query_ids(
    conn: &Connection,
    rf_type: EmitterType,
    bb: &BoundingBox,
) -> Result<HashSet<RfIdentification>> {
    let mut stmt = conn.prepare_cached(
        "SELECT rfID FROM emitters
         WHERE rfType = ?1
         AND latitude BETWEEN ?2 AND ?3
         AND longitude BETWEEN ?4 AND ?5",
    )?;
    let rows = stmt.query_map(
        params![rf_type.ordinal(), bb.south, bb.north, bb.west, bb.east],
        |row| row.get::<_, String>(0),
    )?;

    let mut result = HashSet::new();
    for key in rows {
        result.insert(RfIdentification::from_storage_key(&key?, rf_type));
    }
    tracing::debug!("getIds(bbox) returned {} {} emitters", result.len(), rf_type);
    Ok(result)
}

pub(super) fn query_emitters_in_box(
    conn: &Connection,
    rf_types: &[EmitterType],
    bb: &BoundingBox,
) -> Result<Vec<EmitterRecord>> {
    let ordinals: Vec<i64> = rf_types
        .iter()
        .map(EmitterType::ordinal)
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    if ordinals.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ordinals.len()].join(",");
    let sql = format!(
        "{} WHERE rfType IN ({}) AND latitude BETWEEN ? AND ? AND longitude BETWEEN ? AND ?",
        SELECT_COLUMNS, placeholders
    );

    let mut values: Vec<rusqlite::types::Value> = ordinals.into_iter().map(Into::into).collect();
    values.extend([bb.south, bb.north, bb.west, bb.east].map(Into::into));

    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), row_to_emitter)?;
    let result = collect_known(rows)?;
    tracing::debug!("getEmitters(bbox) returned {} emitters", result.len());
    Ok(result)
}
