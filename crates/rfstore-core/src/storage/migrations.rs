//! Database Migrations
//!
//! Schema migration definitions for the emitter store. The schema version is
//! kept in SQLite's own `user_version` header field.
//!
//! Every step rebuilds the `emitters` table: load the old rows, transform them
//! in memory, write a shadow table, swap it in. The version bump commits in
//! the same transaction, so a failed step leaves the previous layout intact.

use rusqlite::{params, Connection, Transaction};

use super::legacy::{self, RowV2, RowV3, RowV4};
use super::sqlite::{Result, StoreError};

/// Version this build reads and writes
pub const LATEST_VERSION: u32 = 4;

pub const TABLE_SAMPLES: &str = "emitters";
pub const SPATIAL_INDEX: &str = "emitters_index";

/// Migration definitions
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema with single radius and string type",
        apply: migrate_v1,
    },
    Migration {
        version: 2,
        description: "Split radius into north-south and east-west",
        apply: migrate_v2,
    },
    Migration {
        version: 3,
        description: "Hash primary key, WLAN renamed to WLAN_24GHZ",
        apply: migrate_v3,
    },
    Migration {
        version: 4,
        description: "Ordinal types, band-aware keys, spatial index",
        apply: migrate_v4,
    },
];

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number
    pub version: u32,
    /// Description
    pub description: &'static str,
    /// Step body, runs inside the step's transaction
    pub apply: fn(&Transaction<'_>) -> Result<()>,
}

/// V1: Initial schema
const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS emitters (
    rfID STRING PRIMARY KEY,
    rfType STRING,
    trust INTEGER,
    latitude REAL,
    longitude REAL,
    radius REAL,
    note STRING
);
"#;

/// V2: two radii, still string typed
const SHADOW_V2: &str = r#"
CREATE TABLE emitters_new (
    rfID STRING PRIMARY KEY,
    rfType STRING,
    trust INTEGER,
    latitude REAL,
    longitude REAL,
    radius_ns REAL,
    radius_ew REAL,
    note STRING
);
"#;

/// V3: hash key, TEXT columns
const SHADOW_V3: &str = r#"
CREATE TABLE emitters_new (
    rfHash TEXT PRIMARY KEY,
    rfID TEXT,
    rfType TEXT,
    trust INTEGER,
    latitude REAL,
    longitude REAL,
    radius_ns REAL,
    radius_ew REAL,
    note TEXT
);
"#;

/// V4: current layout
const SHADOW_V4: &str = r#"
CREATE TABLE emitters_new (
    rfID TEXT PRIMARY KEY NOT NULL,
    rfType INTEGER NOT NULL,
    trust INTEGER NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    radius_ns REAL NOT NULL,
    radius_ew REAL NOT NULL,
    note TEXT
);
"#;

/// Composite index for bounding box + type lookups
const CREATE_SPATIAL_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS emitters_index ON emitters (latitude, longitude, rfType);";

fn migrate_v1(tx: &Transaction<'_>) -> Result<()> {
    tx.execute_batch(SCHEMA_V1)?;
    Ok(())
}

fn migrate_v2(tx: &Transaction<'_>) -> Result<()> {
    let rows = legacy::to_v2(legacy::load_v1(tx)?);

    tx.execute_batch(SHADOW_V2)?;
    {
        let mut insert = tx.prepare(
            "INSERT INTO emitters_new (rfID, rfType, trust, latitude, longitude, radius_ns, radius_ew, note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for RowV2 {
            rf_id,
            rf_type,
            trust,
            latitude,
            longitude,
            radius_ns,
            radius_ew,
            note,
        } in &rows
        {
            insert.execute(params![
                rf_id, rf_type, trust, latitude, longitude, radius_ns, radius_ew, note
            ])?;
        }
    }

    swap_in_shadow(tx, 2, rows.len())
}

fn migrate_v3(tx: &Transaction<'_>) -> Result<()> {
    let rows = legacy::to_v3(legacy::load_v2(tx)?);

    tx.execute_batch(SHADOW_V3)?;
    {
        let mut insert = tx.prepare(
            "INSERT INTO emitters_new (rfHash, rfID, rfType, trust, latitude, longitude, radius_ns, radius_ew, note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        for RowV3 {
            hash,
            rf_id,
            rf_type,
            trust,
            latitude,
            longitude,
            radius_ns,
            radius_ew,
            note,
        } in &rows
        {
            insert.execute(params![
                hash, rf_id, rf_type, trust, latitude, longitude, radius_ns, radius_ew, note
            ])?;
        }
    }

    swap_in_shadow(tx, 3, rows.len())
}

fn migrate_v4(tx: &Transaction<'_>) -> Result<()> {
    let rows = legacy::to_v4(legacy::load_v3(tx)?);

    tx.execute_batch(SHADOW_V4)?;
    tx.execute_batch("DROP INDEX IF EXISTS emitters_index;")?;
    {
        let mut insert = tx.prepare(
            "INSERT INTO emitters_new (rfID, rfType, trust, latitude, longitude, radius_ns, radius_ew, note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for RowV4 {
            key,
            rf_type,
            trust,
            latitude,
            longitude,
            radius_ns,
            radius_ew,
            note,
        } in &rows
        {
            insert.execute(params![
                key,
                rf_type.ordinal(),
                trust,
                latitude,
                longitude,
                radius_ns,
                radius_ew,
                note
            ])?;
        }
    }

    swap_in_shadow(tx, 4, rows.len())?;
    tx.execute_batch(CREATE_SPATIAL_INDEX)?;
    Ok(())
}

/// Check the shadow table, then replace `emitters` with it
fn swap_in_shadow(tx: &Transaction<'_>, version: u32, expected: usize) -> Result<()> {
    let actual: i64 = tx.query_row("SELECT COUNT(*) FROM emitters_new", [], |row| row.get(0))?;
    if actual as usize != expected {
        return Err(StoreError::MigrationCheck {
            version,
            expected,
            actual: actual as usize,
        });
    }

    tx.execute_batch(
        "DROP TABLE emitters;
         ALTER TABLE emitters_new RENAME TO emitters;",
    )?;
    Ok(())
}

/// Get current schema version from database
///
/// A negative header value was not written by any release and is refused.
pub fn get_current_version(conn: &Connection) -> Result<u32> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(version).map_err(|_| StoreError::UnsupportedVersion {
        found: version,
        supported: LATEST_VERSION,
    })
}

/// Apply pending migrations up to [`LATEST_VERSION`]
pub fn apply_migrations(conn: &mut Connection) -> Result<u32> {
    apply_migrations_to(conn, LATEST_VERSION)
}

/// Apply pending migrations up to and including `target`
///
/// Returns the number of steps applied. Steps run in ascending order, each in
/// its own transaction.
pub fn apply_migrations_to(conn: &mut Connection, target: u32) -> Result<u32> {
    let current_version = get_current_version(conn)?;
    if current_version > LATEST_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: i64::from(current_version),
            supported: LATEST_VERSION,
        });
    }

    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version <= current_version || migration.version > target {
            continue;
        }

        tracing::info!(
            "Applying migration v{}: {}",
            migration.version,
            migration.description
        );

        run_step(conn, migration).map_err(|e| StoreError::Migration {
            version: migration.version,
            source: Box::new(e),
        })?;

        applied += 1;
    }

    Ok(applied)
}

fn run_step(conn: &mut Connection, migration: &Migration) -> Result<()> {
    let tx = conn.transaction()?;
    (migration.apply)(&tx)?;
    tx.pragma_update(None, "user_version", migration.version)?;
    tx.commit()?;
    Ok(())
}
