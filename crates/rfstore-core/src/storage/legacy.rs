//! Historical table layouts
//!
//! One snapshot row type per schema generation, the readers that load them
//! from the live `emitters` table, and the pure transforms between them.
//! The transforms never touch the database so they can be checked against
//! fixture rows directly.

use std::collections::HashSet;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, Row};

use crate::emitter::EmitterType;

/// Type string v1-v3 used for every cell tower
pub const LEGACY_MOBILE: &str = "MOBILE";
/// Type string v1-v2 used for WiFi before bands were told apart
pub const LEGACY_WLAN: &str = "WLAN";
/// v3 WiFi sub-types
pub const LEGACY_WLAN_24GHZ: &str = "WLAN_24GHZ";
pub const LEGACY_WLAN_5GHZ: &str = "WLAN_5GHZ";

// ============================================================================
// SNAPSHOT ROWS
// ============================================================================

/// v1: single radius, string type, every column nullable
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowV1 {
    pub rf_id: Option<String>,
    pub rf_type: Option<String>,
    pub trust: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<f64>,
    pub note: Option<String>,
}

/// v2: radius split into north-south and east-west
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowV2 {
    pub rf_id: Option<String>,
    pub rf_type: Option<String>,
    pub trust: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_ns: Option<f64>,
    pub radius_ew: Option<f64>,
    pub note: Option<String>,
}

/// v3: content-hash primary key, WLAN renamed to WLAN_24GHZ
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowV3 {
    pub hash: String,
    pub rf_id: String,
    pub rf_type: String,
    pub trust: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_ns: Option<f64>,
    pub radius_ew: Option<f64>,
    pub note: Option<String>,
}

/// v4 (current): band-aware storage key, ordinal type, no nullable geometry
#[derive(Debug, Clone, PartialEq)]
pub struct RowV4 {
    pub key: String,
    pub rf_type: EmitterType,
    pub trust: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_ns: f64,
    pub radius_ew: f64,
    pub note: Option<String>,
}

// ============================================================================
// AFFINITY-TOLERANT COLUMN READERS
// ============================================================================
// v1/v2 declared STRING columns, which SQLite gives NUMERIC affinity, and v3
// bound every value as text. A column can hold any storage class.

fn text_value(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
    })
}

fn real_value(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<f64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        ValueRef::Text(t) => std::str::from_utf8(t).ok().and_then(|s| s.trim().parse().ok()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    })
}

fn int_value(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<i64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Integer(i) => Some(i),
        ValueRef::Real(f) => Some(f as i64),
        ValueRef::Text(t) => std::str::from_utf8(t).ok().and_then(|s| {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }),
        ValueRef::Null | ValueRef::Blob(_) => None,
    })
}

// ============================================================================
// LOADERS
// ============================================================================

pub fn load_v1(conn: &Connection) -> rusqlite::Result<Vec<RowV1>> {
    let mut stmt = conn.prepare(
        "SELECT rfID, rfType, trust, latitude, longitude, radius, note FROM emitters",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(RowV1 {
            rf_id: text_value(row, 0)?,
            rf_type: text_value(row, 1)?,
            trust: int_value(row, 2)?,
            latitude: real_value(row, 3)?,
            longitude: real_value(row, 4)?,
            radius: real_value(row, 5)?,
            note: text_value(row, 6)?,
        })
    })?;
    rows.collect()
}

pub fn load_v2(conn: &Connection) -> rusqlite::Result<Vec<RowV2>> {
    let mut stmt = conn.prepare(
        "SELECT rfID, rfType, trust, latitude, longitude, radius_ns, radius_ew, note FROM emitters",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(RowV2 {
            rf_id: text_value(row, 0)?,
            rf_type: text_value(row, 1)?,
            trust: int_value(row, 2)?,
            latitude: real_value(row, 3)?,
            longitude: real_value(row, 4)?,
            radius_ns: real_value(row, 5)?,
            radius_ew: real_value(row, 6)?,
            note: text_value(row, 7)?,
        })
    })?;
    rows.collect()
}

pub fn load_v3(conn: &Connection) -> rusqlite::Result<Vec<RowV3>> {
    let mut stmt = conn.prepare(
        "SELECT rfHash, rfID, rfType, trust, latitude, longitude, radius_ns, radius_ew, note
         FROM emitters",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(RowV3 {
            hash: text_value(row, 0)?.unwrap_or_default(),
            rf_id: text_value(row, 1)?.unwrap_or_default(),
            rf_type: text_value(row, 2)?.unwrap_or_default(),
            trust: int_value(row, 3)?,
            latitude: real_value(row, 4)?,
            longitude: real_value(row, 5)?,
            radius_ns: real_value(row, 6)?,
            radius_ew: real_value(row, 7)?,
            note: text_value(row, 8)?,
        })
    })?;
    rows.collect()
}

// ============================================================================
// TRANSFORMS
// ============================================================================

/// v1 → v2: the single radius becomes two identical radii
pub fn to_v2(rows: Vec<RowV1>) -> Vec<RowV2> {
    rows.into_iter()
        .map(|r| RowV2 {
            rf_id: r.rf_id,
            rf_type: r.rf_type,
            trust: r.trust,
            latitude: r.latitude,
            longitude: r.longitude,
            radius_ns: r.radius,
            radius_ew: r.radius,
            note: r.note,
        })
        .collect()
}

/// v2 → v3: add the hash key and rename bare `WLAN` to `WLAN_24GHZ`
///
/// Rows without an id cannot be keyed and are dropped.
pub fn to_v3(rows: Vec<RowV2>) -> Vec<RowV3> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(rows.len());

    for r in rows {
        let Some(rf_id) = r.rf_id else {
            tracing::warn!("Dropping emitter row without an id during v3 migration");
            continue;
        };
        let mut rf_type = r.rf_type.unwrap_or_default();
        if rf_type == LEGACY_WLAN {
            rf_type = LEGACY_WLAN_24GHZ.to_string();
        }
        // the hash is only a key, v4 removes it again
        let hash = format!("{}{}", rf_id, rf_type);
        if !seen.insert(hash.clone()) {
            tracing::warn!(rf_id = %rf_id, "Dropping duplicate emitter row during v3 migration");
            continue;
        }

        out.push(RowV3 {
            hash,
            rf_id,
            rf_type,
            trust: r.trust,
            latitude: r.latitude,
            longitude: r.longitude,
            radius_ns: r.radius_ns,
            radius_ew: r.radius_ew,
            note: r.note,
        });
    }

    out
}

/// Current type for a v3 row, `None` when the sub-type is not recognized
///
/// WiFi follows the stored sub-type. `MOBILE` rows are split by the
/// technology prefix of their id (case-insensitive, like SQL `LIKE`).
pub fn classify_v3(rf_type: &str, rf_id: &str) -> Option<EmitterType> {
    match rf_type {
        LEGACY_WLAN_24GHZ => Some(EmitterType::Wlan2),
        LEGACY_WLAN_5GHZ => Some(EmitterType::Wlan5),
        LEGACY_MOBILE => {
            let upper = rf_id.to_ascii_uppercase();
            EmitterType::CELL
                .into_iter()
                .find(|t| upper.starts_with(t.as_str()))
        }
        _ => None,
    }
}

/// v3 → v4: ordinal types, band-prefixed WiFi keys, hash column gone
///
/// Rows whose sub-type cannot be classified are dropped, as are rows missing
/// coordinates or radii. Missing trust becomes 0.
pub fn to_v4(rows: Vec<RowV3>) -> Vec<RowV4> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(rows.len());

    for r in rows {
        let Some(rf_type) = classify_v3(&r.rf_type, &r.rf_id) else {
            tracing::warn!(
                rf_id = %r.rf_id,
                rf_type = %r.rf_type,
                "Dropping emitter with unrecognized sub-type during v4 migration"
            );
            continue;
        };

        let (Some(latitude), Some(longitude), Some(radius_ns), Some(radius_ew)) =
            (r.latitude, r.longitude, r.radius_ns, r.radius_ew)
        else {
            tracing::warn!(rf_id = %r.rf_id, "Dropping emitter without position during v4 migration");
            continue;
        };

        let key = if rf_type.is_wifi() {
            format!("{}/{}", rf_type.as_str(), r.rf_id)
        } else {
            r.rf_id
        };
        if !seen.insert(key.clone()) {
            tracing::warn!(key = %key, "Dropping duplicate emitter row during v4 migration");
            continue;
        }

        out.push(RowV4 {
            key,
            rf_type,
            trust: r.trust.unwrap_or(0),
            latitude,
            longitude,
            radius_ns,
            radius_ew,
            note: r.note,
        });
    }

    out
}
