//! Emitter Identity - how a radio source is named and keyed
//!
//! An emitter is identified by the raw id reported by the radio stack plus
//! its type. Two string forms are derived from that pair:
//! - the unique key, the logical identity used by callers
//! - the storage key, the primary key of the row on disk

use serde::{Deserialize, Serialize};

// ============================================================================
// EMITTER TYPES
// ============================================================================

/// Kinds of RF emitters the store knows about
///
/// The discriminant is the persisted ordinal of the `rfType` column. New
/// variants must be appended, never inserted, or existing files change meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum EmitterType {
    /// WiFi access point on the 2.4 GHz band
    Wlan2 = 0,
    /// WiFi access point on the 5 GHz band
    Wlan5 = 1,
    /// WiFi access point on the 6 GHz band
    Wlan6 = 2,
    /// GSM cell tower
    Gsm = 3,
    /// WCDMA (UMTS) cell tower
    Wcdma = 4,
    /// CDMA cell tower
    Cdma = 5,
    /// LTE cell tower
    Lte = 6,
    /// 5G NR cell tower
    Nr = 7,
    /// Bluetooth beacon
    Bt = 8,
    /// Mobile network id that is globally unique on its own
    Mobile = 9,
}

impl EmitterType {
    /// Every known type in ordinal order
    pub const ALL: [EmitterType; 10] = [
        EmitterType::Wlan2,
        EmitterType::Wlan5,
        EmitterType::Wlan6,
        EmitterType::Gsm,
        EmitterType::Wcdma,
        EmitterType::Cdma,
        EmitterType::Lte,
        EmitterType::Nr,
        EmitterType::Bt,
        EmitterType::Mobile,
    ];

    /// WiFi bands, whose storage keys carry a band prefix
    pub const WIFI: [EmitterType; 3] = [EmitterType::Wlan2, EmitterType::Wlan5, EmitterType::Wlan6];

    /// Cell technologies that older files lumped together as `MOBILE`
    pub const CELL: [EmitterType; 4] = [
        EmitterType::Gsm,
        EmitterType::Wcdma,
        EmitterType::Cdma,
        EmitterType::Lte,
    ];

    /// Canonical name, also used as the key prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            EmitterType::Wlan2 => "WLAN2",
            EmitterType::Wlan5 => "WLAN5",
            EmitterType::Wlan6 => "WLAN6",
            EmitterType::Gsm => "GSM",
            EmitterType::Wcdma => "WCDMA",
            EmitterType::Cdma => "CDMA",
            EmitterType::Lte => "LTE",
            EmitterType::Nr => "NR",
            EmitterType::Bt => "BT",
            EmitterType::Mobile => "MOBILE",
        }
    }

    /// Persisted ordinal
    pub fn ordinal(&self) -> i64 {
        *self as u8 as i64
    }

    /// Look up a type by its persisted ordinal
    pub fn from_ordinal(ordinal: i64) -> Option<Self> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// WiFi band, stored under a `TYPE/` prefixed key
    pub fn is_wifi(&self) -> bool {
        matches!(self, EmitterType::Wlan2 | EmitterType::Wlan5 | EmitterType::Wlan6)
    }

    /// Cellular technology with its own prefix in the raw id
    pub fn is_cell(&self) -> bool {
        matches!(
            self,
            EmitterType::Gsm | EmitterType::Wcdma | EmitterType::Cdma | EmitterType::Lte | EmitterType::Nr
        )
    }
}

impl std::fmt::Display for EmitterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EmitterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wlan2" | "wifi-2.4ghz" | "wlan_24ghz" => Ok(EmitterType::Wlan2),
            "wlan5" | "wifi-5ghz" | "wlan_5ghz" => Ok(EmitterType::Wlan5),
            "wlan6" | "wifi-6ghz" | "wlan_6ghz" => Ok(EmitterType::Wlan6),
            "gsm" => Ok(EmitterType::Gsm),
            "wcdma" | "umts" => Ok(EmitterType::Wcdma),
            "cdma" => Ok(EmitterType::Cdma),
            "lte" => Ok(EmitterType::Lte),
            "nr" | "5g" => Ok(EmitterType::Nr),
            "bt" | "bluetooth" => Ok(EmitterType::Bt),
            "mobile" => Ok(EmitterType::Mobile),
            _ => Err(format!("Unknown emitter type: {}", s)),
        }
    }
}

// ============================================================================
// IDENTIFICATION
// ============================================================================

/// Complete identification of an RF emitter
///
/// `rf_id` must be unique within its type. Ordering follows the unique key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RfIdentification {
    pub rf_id: String,
    pub rf_type: EmitterType,
}

impl RfIdentification {
    /// Pair a raw radio id with its type
    pub fn new(rf_id: impl Into<String>, rf_type: EmitterType) -> Self {
        Self {
            rf_id: rf_id.into(),
            rf_type,
        }
    }

    /// Logical identity: the raw id for `MOBILE`, `TYPE|rawId` otherwise
    pub fn unique_key(&self) -> String {
        match self.rf_type {
            EmitterType::Mobile => self.rf_id.clone(),
            t => format!("{}|{}", t.as_str(), self.rf_id),
        }
    }

    /// Row key on disk
    ///
    /// WiFi ids get a `TYPE/` band prefix so one MAC seen on two bands maps
    /// to two rows. Every other id is stored verbatim.
    pub fn storage_key(&self) -> String {
        if self.rf_type.is_wifi() {
            format!("{}/{}", self.rf_type.as_str(), self.rf_id)
        } else {
            self.rf_id.clone()
        }
    }

    /// Rebuild an identification from a stored key and its type column
    pub fn from_storage_key(key: &str, rf_type: EmitterType) -> Self {
        let rf_id = if rf_type.is_wifi() {
            key.split_once('/').map_or(key, |(_, id)| id)
        } else {
            key
        };
        Self::new(rf_id, rf_type)
    }

    /// Short form for debug logs
    pub fn log_string(&self) -> String {
        format!("{}({})", self.rf_type, self.rf_id)
    }
}

/// Build an identification from a raw radio id and its type
pub fn identify(rf_id: impl Into<String>, rf_type: EmitterType) -> RfIdentification {
    RfIdentification::new(rf_id, rf_type)
}

impl std::fmt::Display for RfIdentification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.unique_key())
    }
}

impl PartialOrd for RfIdentification {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RfIdentification {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.unique_key()
            .cmp(&other.unique_key())
            .then(self.rf_type.cmp(&other.rf_type))
    }
}
