//! Geospatial anchor session core.
//!
//! Tracks whether the device is localized against the earth well enough to
//! place anchors, drives each anchor's resolution by bounded polling, and
//! keeps a small time-pruned history of placed anchors that is replayed once
//! per session.
//!
//! Zero I/O. Everything runs one `tick` at a time on the caller's thread;
//! device, resolver, persistence and presentation sit behind traits.

pub mod anchor;
pub mod collaborator;
pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod history;
pub mod localization;
pub mod pose;
pub mod quaternion;
pub mod resolution;
pub mod serde_compat;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod time;

pub use anchor::{Anchor, AnchorHandle, AnchorKind, AnchorPlacement, AnchorRequest};
pub use collaborator::{
    AnchorResolver, DeviceSignals, EarthState, FatalSignal, FeatureSupport, PlacementIntent,
    ResolverStatus, ScreenPosition, VpsAvailability,
};
pub use config::{HistoryConfig, ResolutionConfig, SessionConfig};
pub use constants::{
    HISTORY_CAPACITY, HISTORY_MAX_AGE_SECS, HISTORY_STORAGE_KEY, HORIZONTAL_ACCURACY_THRESHOLD,
    LOCALIZATION_TIMEOUT, YAW_ACCURACY_THRESHOLD,
};
pub use diagnostics::DebugSnapshot;
pub use error::HistoryError;
pub use event::{Advisory, NullObserver, SessionEvent, SessionObserver};
pub use history::{
    AnchorHistoryCollection, AnchorHistoryEntry, AnchorHistoryStore, KeyValueStore, MemoryStore,
};
pub use localization::{LocalizationState, LocalizationStateMachine, TickInput};
pub use pose::{GeospatialPose, PoseThresholds, is_within_tolerance, pose_summary};
pub use quaternion::Quaternion;
pub use resolution::{AnchorResolutionTask, ResolutionState, TaskStep};
pub use serde_compat::{decode_history, encode_history};
