//! Storage Module
//!
//! SQLite-based storage layer with:
//! - Versioned schema migrations from every historical layout
//! - Band-aware primary keys and a spatial (lat, lon, type) index
//! - Atomic mutation batches that only commit real changes

mod batch;
mod config;
pub mod legacy;
mod migrations;
mod sqlite;

pub use batch::Batch;
pub use config::{default_data_dir, JournalMode, StoreConfig, Synchronous, DB_FILE_NAME};
pub use migrations::{
    apply_migrations, apply_migrations_to, get_current_version, Migration, LATEST_VERSION,
    MIGRATIONS, SPATIAL_INDEX, TABLE_SAMPLES,
};
pub use sqlite::{EmitterStore, Result, StoreError};
