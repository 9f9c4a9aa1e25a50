//! Emitter Record - a stored observation summary for one emitter

use serde::{Deserialize, Serialize};

use super::identity::{EmitterType, RfIdentification};

/// Everything the store knows about one emitter
///
/// Position is the centre of an asymmetric coverage ellipse: `radius_ns`
/// spans north-south and `radius_ew` east-west, both in metres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmitterRecord {
    pub id: RfIdentification,
    /// Confidence score, higher is more reliable
    pub trust: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_ns: f32,
    pub radius_ew: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl EmitterRecord {
    /// A record with default attributes for a freshly seen emitter
    pub fn new(id: RfIdentification) -> Self {
        Self {
            id,
            trust: 0,
            latitude: 0.0,
            longitude: 0.0,
            radius_ns: 0.0,
            radius_ew: 0.0,
            note: None,
        }
    }

    /// Type of the emitter
    pub fn rf_type(&self) -> EmitterType {
        self.id.rf_type
    }

    /// Logical identity, see [`RfIdentification::unique_key`]
    pub fn unique_key(&self) -> String {
        self.id.unique_key()
    }

    /// Row key on disk, see [`RfIdentification::storage_key`]
    pub fn storage_key(&self) -> String {
        self.id.storage_key()
    }

    /// Short form for debug logs
    pub fn log_string(&self) -> String {
        self.id.log_string()
    }
}
