//! JSON serde for the persisted history layout.
//!
//! The layout uses PascalCase field names, a top-level `Collection` array,
//! the creation time as a string and the rotation as an `{x, y, z, w}`
//! object.

use serde::{Deserialize, Serialize};

use crate::history::{AnchorHistoryCollection, AnchorHistoryEntry};
use crate::quaternion::Quaternion;
use crate::time::{parse_timestamp, unix_to_iso8601};

// --- Wire format types ---

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct WireCollection {
    #[serde(rename = "Collection", default)]
    pub collection: Vec<WireEntry>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct WireEntry {
    #[serde(rename = "SerializedTime")]
    pub serialized_time: String,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Altitude")]
    pub altitude: f64,
    #[serde(rename = "Heading", default)]
    pub heading: f64,
    #[serde(rename = "EunRotation", default)]
    pub eun_rotation: Quaternion,
}

// --- Conversion: Wire <-> Domain ---

impl WireCollection {
    /// Convert to the domain collection. Records whose time cannot be parsed
    /// are dropped; the count of dropped records is returned alongside.
    pub fn into_collection(self) -> (AnchorHistoryCollection, usize) {
        let mut dropped = 0;
        let entries = self
            .collection
            .into_iter()
            .filter_map(|wire| {
                let entry = wire.into_entry();
                if entry.is_none() {
                    dropped += 1;
                }
                entry
            })
            .collect();
        (AnchorHistoryCollection::from_entries(entries), dropped)
    }

    pub fn from_collection(collection: &AnchorHistoryCollection) -> Self {
        Self {
            collection: collection.iter().map(WireEntry::from_entry).collect(),
        }
    }
}

impl WireEntry {
    fn into_entry(self) -> Option<AnchorHistoryEntry> {
        let created_at = parse_timestamp(&self.serialized_time)?;
        Some(AnchorHistoryEntry {
            created_at,
            latitude: self.latitude,
            longitude: self.longitude,
            altitude: self.altitude,
            heading: self.heading,
            eun_rotation: self.eun_rotation,
        })
    }

    fn from_entry(entry: &AnchorHistoryEntry) -> Self {
        Self {
            serialized_time: unix_to_iso8601(entry.created_at),
            latitude: entry.latitude,
            longitude: entry.longitude,
            altitude: entry.altitude,
            heading: entry.heading,
            eun_rotation: entry.eun_rotation,
        }
    }
}

/// Encode a collection in the persisted layout.
pub fn encode_history(collection: &AnchorHistoryCollection) -> serde_json::Result<String> {
    serde_json::to_string(&WireCollection::from_collection(collection))
}

/// Decode the persisted layout. Unparseable records are skipped.
pub fn decode_history(json: &str) -> serde_json::Result<AnchorHistoryCollection> {
    let wire: WireCollection = serde_json::from_str(json)?;
    let (collection, dropped) = wire.into_collection();
    if dropped > 0 {
        tracing::warn!("skipped {dropped} history record(s) with unreadable timestamps");
    }
    Ok(collection)
}
