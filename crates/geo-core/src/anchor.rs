use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::history::AnchorHistoryEntry;
use crate::quaternion::Quaternion;
use crate::resolution::ResolutionState;

/// Opaque identity the external resolver hands back for a requested anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnchorHandle(pub Uuid);

impl AnchorHandle {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for AnchorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// How anchors are placed by default.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnchorKind {
    /// Fixed altitude taken from the recorded pose.
    Standard,
    /// Altitude resolved against terrain, plus an offset in meters.
    Terrain { altitude_offset: f64 },
}

impl Default for AnchorKind {
    fn default() -> Self {
        AnchorKind::Terrain {
            altitude_offset: 0.0,
        }
    }
}

/// Vertical placement actually sent to the resolver.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum AnchorPlacement {
    Standard { altitude: f64 },
    Terrain { altitude_offset: f64 },
}

/// Resolution request for one anchor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnchorRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub placement: AnchorPlacement,
    pub rotation: Quaternion,
}

impl AnchorRequest {
    /// Build the request that recreates `entry`. Records without a stored
    /// rotation fall back to their heading.
    pub fn from_history(entry: &AnchorHistoryEntry, kind: AnchorKind) -> Self {
        let placement = match kind {
            AnchorKind::Standard => AnchorPlacement::Standard {
                altitude: entry.altitude,
            },
            AnchorKind::Terrain { altitude_offset } => AnchorPlacement::Terrain { altitude_offset },
        };
        Self {
            latitude: entry.latitude,
            longitude: entry.longitude,
            placement,
            rotation: entry.effective_rotation(),
        }
    }
}

/// An anchor tracked by the session.
///
/// The visual object lives in the presentation layer; the core only keeps
/// the handle and whether the presentation should currently show it.
#[derive(Clone, Debug, PartialEq)]
pub struct Anchor {
    pub handle: AnchorHandle,
    pub request: AnchorRequest,
    pub state: ResolutionState,
    pub active: bool,
}

impl Anchor {
    pub fn new(handle: AnchorHandle, request: AnchorRequest) -> Self {
        Self {
            handle,
            request,
            state: ResolutionState::InProgress,
            active: false,
        }
    }
}
