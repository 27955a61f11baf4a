//! Point-in-time view of the session and device signals for a debug panel.

use std::fmt;

use serde::Serialize;

use crate::collaborator::{EarthState, FeatureSupport, VpsAvailability};
use crate::localization::LocalizationState;
use crate::pose::{GeospatialPose, pose_summary};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DebugSnapshot {
    /// Last coverage answer seen by the session.
    pub vps: Option<VpsAvailability>,
    pub is_returning: bool,
    pub is_localizing: bool,
    pub state: LocalizationState,
    pub session_ready: bool,
    pub feature_support: FeatureSupport,
    pub earth_state: EarthState,
    pub earth_tracking: bool,
    /// Only present while the earth is enabled and tracking.
    pub pose: Option<GeospatialPose>,
}

impl fmt::Display for DebugSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.vps {
            Some(vps) => writeln!(f, "VPS: {vps}")?,
            None => writeln!(f, "VPS: checking")?,
        }
        writeln!(f, "IsReturning: {}", self.is_returning)?;
        writeln!(f, "IsLocalizing: {}", self.is_localizing)?;
        writeln!(f, "State: {:?}", self.state)?;
        writeln!(f, "SessionReady: {}", self.session_ready)?;
        writeln!(f, "FeatureSupported: {:?}", self.feature_support)?;
        writeln!(f, "EarthState: {:?}", self.earth_state)?;
        let tracking = if self.earth_tracking {
            "Tracking"
        } else {
            "NotTracking"
        };
        writeln!(f, "EarthTrackingState: {tracking}")?;
        f.write_str(&pose_summary(self.pose.as_ref(), self.pose.is_some()))
    }
}
