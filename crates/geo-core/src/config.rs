use serde::{Deserialize, Serialize};

use crate::anchor::AnchorKind;
use crate::constants::{
    ERROR_DISPLAY_DELAY, GEOSPATIAL_PREPARE_TIME, HISTORY_CAPACITY, HISTORY_MAX_AGE_SECS,
    LOCALIZATION_TIMEOUT, POLL_ATTEMPT_CAP, POLL_INTERVAL,
};
use crate::pose::PoseThresholds;

/// Tunables for one session. Every field has a default, so a partial TOML
/// table is enough to override a single value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub localization_timeout: f64,
    pub error_display_delay: f64,
    pub geospatial_prepare_time: f64,
    pub thresholds: PoseThresholds,
    pub resolution: ResolutionConfig,
    pub history: HistoryConfig,
    /// Kind used for anchors placed by the user and replayed from history.
    pub anchor_kind: AnchorKind,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            thresholds: PoseThresholds::default(),
            localization_timeout: LOCALIZATION_TIMEOUT,
            error_display_delay: ERROR_DISPLAY_DELAY,
            geospatial_prepare_time: GEOSPATIAL_PREPARE_TIME,
            resolution: ResolutionConfig::default(),
            history: HistoryConfig::default(),
            anchor_kind: AnchorKind::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    pub poll_interval: f64,
    pub attempt_cap: u32,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            attempt_cap: POLL_ATTEMPT_CAP,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
    pub max_age_secs: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: HISTORY_CAPACITY,
            max_age_secs: HISTORY_MAX_AGE_SECS,
        }
    }
}
