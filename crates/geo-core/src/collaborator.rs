//! Boundaries to the device, the external resolver and the presentation
//! layer. The core only reads from and writes to these; it never owns them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::anchor::{AnchorHandle, AnchorRequest};
use crate::pose::GeospatialPose;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureSupport {
    #[default]
    Unknown,
    Unsupported,
    Supported,
}

/// Readiness of the geospatial subsystem.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EarthState {
    #[default]
    Enabled,
    ErrorEarthNotReady,
    ErrorInternal,
    ErrorGeospatialModeDisabled,
    ErrorNotAuthorized,
    ErrorResourcesExhausted,
    ErrorPackageTooOld,
    ErrorSessionNotReady,
}

/// Answer of the visual positioning coverage check at the device location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VpsAvailability {
    Unknown,
    Available,
    Unavailable,
    ErrorInternal,
    ErrorNetwork,
    ErrorResourceExhausted,
}

impl fmt::Display for VpsAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VpsAvailability::Unknown => "Unknown",
            VpsAvailability::Available => "Available",
            VpsAvailability::Unavailable => "Unavailable",
            VpsAvailability::ErrorInternal => "ErrorInternal",
            VpsAvailability::ErrorNetwork => "ErrorNetwork",
            VpsAvailability::ErrorResourceExhausted => "ErrorResourceExhausted",
        };
        f.write_str(s)
    }
}

/// Status reported by the resolver for a submitted anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolverStatus {
    InProgress,
    Success,
    Failed,
}

/// Screen-space position of a tap, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScreenPosition {
    pub x: f64,
    pub y: f64,
}

/// What the user asked to place this tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum PlacementIntent {
    /// Hit-test the screen position and anchor at the hit.
    Tap(ScreenPosition),
    /// Anchor at the current camera pose.
    AtCamera,
}

/// Fatal environment conditions reported by the platform layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FatalSignal {
    /// The AR session entered an error state, named by the platform.
    SessionErrorState(String),
    /// Location permission denied or the location service failed to start.
    LocationServiceFailed,
    /// Required platform components are missing.
    MissingComponents,
}

impl FatalSignal {
    pub fn reason(&self) -> String {
        use crate::constants::messages;
        match self {
            FatalSignal::SessionErrorState(state) => format!(
                "Geospatial sample encountered an ARSession error state {state}.\n\
                 Please start the app again."
            ),
            FatalSignal::LocationServiceFailed => messages::LOCATION_FAILED.to_string(),
            FatalSignal::MissingComponents => messages::MISSING_COMPONENTS.to_string(),
        }
    }
}

/// Per-tick signals from the device.
pub trait DeviceSignals {
    fn current_pose(&self) -> Option<GeospatialPose>;
    fn is_earth_tracking(&self) -> bool;
    fn is_session_ready(&self) -> bool;
    fn feature_support(&self) -> FeatureSupport;

    fn earth_state(&self) -> EarthState {
        EarthState::Enabled
    }

    /// Whether geospatial mode is currently switched on in the session config.
    fn is_geospatial_mode_enabled(&self) -> bool {
        true
    }

    /// Switch geospatial mode on. Takes effect after a prepare delay.
    fn enable_geospatial_mode(&mut self) {}

    fn fatal_signal(&self) -> Option<FatalSignal> {
        None
    }

    /// Latest coverage answer for the current location, once a check has
    /// completed.
    fn vps_availability(&self) -> Option<VpsAvailability> {
        None
    }

    /// Raycast a screen position and convert the hit to a geospatial pose.
    fn hit_test(&self, position: ScreenPosition) -> Option<GeospatialPose>;
}

/// The external service that turns requests into tracked anchors.
pub trait AnchorResolver {
    fn request_anchor_resolution(&mut self, request: &AnchorRequest) -> Option<AnchorHandle>;
    fn poll_resolution_state(&self, handle: AnchorHandle) -> ResolverStatus;

    /// Release an anchor the session no longer tracks.
    fn detach(&mut self, _handle: AnchorHandle) {}
}
