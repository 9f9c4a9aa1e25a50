//! Store configuration
//!
//! Where the database file lives and how its connection is tuned.

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Deserialize;

use super::sqlite::{Result, StoreError};

/// Database file name inside the data directory
pub const DB_FILE_NAME: &str = "rf.db";

/// SQLite journal mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    #[default]
    Wal,
    Off,
}

impl JournalMode {
    /// Value for the PRAGMA statement
    pub fn as_str(&self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Truncate => "TRUNCATE",
            JournalMode::Persist => "PERSIST",
            JournalMode::Memory => "MEMORY",
            JournalMode::Wal => "WAL",
            JournalMode::Off => "OFF",
        }
    }
}

impl std::str::FromStr for JournalMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "delete" => Ok(JournalMode::Delete),
            "truncate" => Ok(JournalMode::Truncate),
            "persist" => Ok(JournalMode::Persist),
            "memory" => Ok(JournalMode::Memory),
            "wal" => Ok(JournalMode::Wal),
            "off" => Ok(JournalMode::Off),
            _ => Err(format!("Unknown journal mode: {}", s)),
        }
    }
}

/// SQLite `synchronous` level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Synchronous {
    Off,
    #[default]
    Normal,
    Full,
    Extra,
}

impl Synchronous {
    /// Value for the PRAGMA statement
    pub fn as_str(&self) -> &'static str {
        match self {
            Synchronous::Off => "OFF",
            Synchronous::Normal => "NORMAL",
            Synchronous::Full => "FULL",
            Synchronous::Extra => "EXTRA",
        }
    }
}

/// Configuration for opening an [`EmitterStore`](super::EmitterStore)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file. `None` uses the platform data directory.
    pub path: Option<PathBuf>,
    pub journal_mode: JournalMode,
    pub synchronous: Synchronous,
    pub busy_timeout_ms: u32,
    /// Page cache size in KiB
    pub cache_size_kib: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            journal_mode: JournalMode::default(),
            synchronous: Synchronous::default(),
            busy_timeout_ms: 5000,
            cache_size_kib: 8192,
        }
    }
}

impl StoreConfig {
    /// Config for a specific database file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Defaults overridden by `RFSTORE_DB_PATH` and `RFSTORE_JOURNAL_MODE`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("RFSTORE_DB_PATH")
            && !path.is_empty()
        {
            config.path = Some(PathBuf::from(path));
        }

        if let Ok(mode) = std::env::var("RFSTORE_JOURNAL_MODE") {
            match mode.parse() {
                Ok(mode) => config.journal_mode = mode,
                Err(e) => tracing::warn!("Ignoring RFSTORE_JOURNAL_MODE: {}", e),
            }
        }

        config
    }

    /// Resolve the database path, creating the default data directory if needed
    pub fn resolve_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }

        let data_dir = default_data_dir()?;
        std::fs::create_dir_all(&data_dir)?;
        // Restrict directory permissions to owner-only on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            let _ = std::fs::set_permissions(&data_dir, perms);
        }
        Ok(data_dir.join(DB_FILE_NAME))
    }

    /// PRAGMA block applied to every connection
    pub(super) fn pragmas(&self) -> String {
        format!(
            "PRAGMA journal_mode = {};
             PRAGMA synchronous = {};
             PRAGMA busy_timeout = {};
             PRAGMA cache_size = -{};
             PRAGMA temp_store = MEMORY;",
            self.journal_mode.as_str(),
            self.synchronous.as_str(),
            self.busy_timeout_ms,
            self.cache_size_kib,
        )
    }
}

/// Platform data directory for the store
pub fn default_data_dir() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("org", "rfstore", "rfstore").ok_or_else(|| {
        StoreError::Init("Could not determine project directories".to_string())
    })?;
    Ok(proj_dirs.data_dir().to_path_buf())
}
