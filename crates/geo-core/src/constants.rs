/// Maximum orientation yaw accuracy (degrees) treated as localized.
pub const YAW_ACCURACY_THRESHOLD: f64 = 25.0;

/// Maximum horizontal accuracy (meters) treated as localized.
pub const HORIZONTAL_ACCURACY_THRESHOLD: f64 = 20.0;

/// Time budget for a single localization attempt before the session gives up.
pub const LOCALIZATION_TIMEOUT: f64 = 180.0;

/// How long a terminal reason stays on screen before teardown.
pub const ERROR_DISPLAY_DELAY: f64 = 3.0;

/// Wait after switching geospatial mode on before poses are trusted.
pub const GEOSPATIAL_PREPARE_TIME: f64 = 3.0;

/// Interval between resolver status polls.
pub const POLL_INTERVAL: f64 = 0.1;

/// Poll attempt cap. Reaching it raises the pending advisory; polling continues.
pub const POLL_ATTEMPT_CAP: u32 = 100;

/// Number of anchors kept in persisted history.
pub const HISTORY_CAPACITY: usize = 5;

/// History entries older than this (seconds) are purged on load.
pub const HISTORY_MAX_AGE_SECS: u64 = 24 * 60 * 60;

/// Key under which the history collection is persisted.
pub const HISTORY_STORAGE_KEY: &str = "PersistentGeospatialAnchors";

/// Numerical epsilon for near-zero comparisons
pub const EPSILON: f64 = 1e-10;

/// User-facing status strings.
pub mod messages {
    pub const LOCALIZING: &str = "Localizing your device to set anchor.";
    pub const INITIALIZING: &str = "Initializing Geospatial functionalities.";
    pub const INSTRUCTION: &str = "Point your camera at buildings, stores, and signs near you.";
    pub const LOCALIZATION_FAILURE: &str =
        "Localization not possible.\nClose and open the app to restart the session.";
    pub const LOCALIZATION_SUCCESS: &str = "Localization completed.";
    pub const RESOLVING_TIMEOUT: &str = "Still resolving the terrain anchor.\n\
         Please make sure you're in an area that has VPS coverage.";
    pub const PLACEMENT_FAILED: &str = "Failed to set a terrain anchor.";
    pub const ANCHORS_CLEARED: &str = "Anchor(s) cleared!";
    pub const FEATURE_UNSUPPORTED: &str = "Geospatial API is not supported by this device.";
    pub const LOCATION_FAILED: &str = "Geospatial sample failed to start location service.\n\
         Please start the app again and grant precise location permission.";
    pub const MISSING_COMPONENTS: &str = "Geospatial sample failed with missing AR Components.";
}
