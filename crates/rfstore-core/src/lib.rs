//! # rfstore Core
//!
//! Persistent store for geolocated RF emitter observations (WiFi access
//! points, cell towers) consumed by a location engine.
//!
//! - **Identity**: stable keys from a raw radio id and its emitter type, with
//!   per-band disambiguation for WiFi
//! - **Migrations**: every historical on-disk layout upgrades in order, one
//!   atomic step per version
//! - **Spatial queries**: bounding box + type lookups over a composite index
//! - **Batches**: atomic mutation scopes that commit only when something changed
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rfstore_core::{identify, BoundingBox, EmitterRecord, EmitterStore, EmitterType};
//!
//! # fn main() -> rfstore_core::Result<()> {
//! let mut store = EmitterStore::open_path("rf.db")?;
//!
//! let mut ap = EmitterRecord::new(identify("00:11:22:33:44:55", EmitterType::Wlan2));
//! ap.latitude = 52.52;
//! ap.longitude = 13.40;
//! ap.radius_ns = 50.0;
//! ap.radius_ew = 50.0;
//!
//! let mut batch = store.begin()?;
//! batch.insert(&ap)?;
//! batch.end()?;
//!
//! let nearby = store.get_emitters_in_box(
//!     &[EmitterType::Wlan2, EmitterType::Wlan5],
//!     &BoundingBox::around(52.52, 13.40, 500.0),
//! )?;
//! assert_eq!(nearby.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `bundled-sqlite` (default): compile SQLite into the crate

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod emitter;
pub mod storage;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Emitter types
pub use emitter::{identify, BoundingBox, EmitterRecord, EmitterType, RfIdentification};

// Storage layer
pub use storage::{
    Batch, EmitterStore, JournalMode, Result, StoreConfig, StoreError, Synchronous,
    LATEST_VERSION,
};

