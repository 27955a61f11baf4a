use serde::{Deserialize, Serialize};

use crate::constants::{HORIZONTAL_ACCURACY_THRESHOLD, YAW_ACCURACY_THRESHOLD};
use crate::quaternion::Quaternion;

/// Camera pose snapshot reported by the positioning service for one tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeospatialPose {
    /// Degrees.
    pub latitude: f64,
    /// Degrees.
    pub longitude: f64,
    /// Meters above the WGS84 ellipsoid.
    pub altitude: f64,
    /// Meters.
    pub horizontal_accuracy: f64,
    /// Meters.
    pub vertical_accuracy: f64,
    /// Degrees.
    pub orientation_yaw_accuracy: f64,
    pub eun_rotation: Quaternion,
}

impl GeospatialPose {
    /// Multi-line summary for an info panel.
    pub fn summary(&self) -> String {
        format!(
            "Latitude/Longitude: {:.6}°, {:.6}°\n\
             Horizontal Accuracy: {:.6}m\n\
             Altitude: {:.2}m\n\
             Vertical Accuracy: {:.2}m\n\
             Eun Rotation: ({:.1}, {:.1}, {:.1}, {:.1})\n\
             Orientation Yaw Accuracy: {:.1}°",
            self.latitude,
            self.longitude,
            self.horizontal_accuracy,
            self.altitude,
            self.vertical_accuracy,
            self.eun_rotation.x,
            self.eun_rotation.y,
            self.eun_rotation.z,
            self.eun_rotation.w,
            self.orientation_yaw_accuracy,
        )
    }
}

/// Info panel text, or the not-tracking placeholder.
pub fn pose_summary(pose: Option<&GeospatialPose>, earth_tracking: bool) -> String {
    match pose {
        Some(pose) if earth_tracking => pose.summary(),
        _ => "GEOSPATIAL POSE: not tracking".to_string(),
    }
}

/// Accuracy bounds a pose must meet to count as localized.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseThresholds {
    /// Degrees.
    pub max_yaw_accuracy: f64,
    /// Meters.
    pub max_horizontal_accuracy: f64,
}

impl Default for PoseThresholds {
    fn default() -> Self {
        Self {
            max_yaw_accuracy: YAW_ACCURACY_THRESHOLD,
            max_horizontal_accuracy: HORIZONTAL_ACCURACY_THRESHOLD,
        }
    }
}

/// Whether `pose` meets both accuracy bounds. Equality is within tolerance.
///
/// An absent pose or a NaN accuracy (on either side of the comparison) is
/// never within tolerance.
pub fn is_within_tolerance(pose: Option<&GeospatialPose>, thresholds: &PoseThresholds) -> bool {
    let Some(pose) = pose else {
        return false;
    };
    // `<=` is false whenever either operand is NaN
    pose.orientation_yaw_accuracy <= thresholds.max_yaw_accuracy
        && pose.horizontal_accuracy <= thresholds.max_horizontal_accuracy
}
