//! Deterministic stand-ins for the device and resolver.
//!
//! Used by the test suites and by the `geoanchor simulate` command. Every
//! field is public so callers can script a scenario tick by tick.

use std::cell::Cell;
use std::collections::{HashMap, VecDeque};

use crate::anchor::{AnchorHandle, AnchorRequest};
use crate::collaborator::{
    AnchorResolver, DeviceSignals, EarthState, FatalSignal, FeatureSupport, ResolverStatus,
    ScreenPosition, VpsAvailability,
};
use crate::pose::GeospatialPose;
use crate::quaternion::Quaternion;

/// A pose comfortably inside the default thresholds.
pub fn accurate_pose() -> GeospatialPose {
    GeospatialPose {
        latitude: 37.4220,
        longitude: -122.0841,
        altitude: 12.0,
        horizontal_accuracy: 3.0,
        vertical_accuracy: 2.0,
        orientation_yaw_accuracy: 5.0,
        eun_rotation: Quaternion::from_axis_angle([0.0, 1.0, 0.0], 30.0),
    }
}

/// A pose far outside the default thresholds.
pub fn inaccurate_pose() -> GeospatialPose {
    GeospatialPose {
        horizontal_accuracy: 60.0,
        orientation_yaw_accuracy: 70.0,
        ..accurate_pose()
    }
}

#[derive(Clone, Debug)]
pub struct SimulatedDevice {
    pub pose: Option<GeospatialPose>,
    pub earth_tracking: bool,
    pub session_ready: bool,
    pub feature_support: FeatureSupport,
    pub earth_state: EarthState,
    pub geospatial_mode_enabled: bool,
    pub fatal: Option<FatalSignal>,
    /// Returned for every hit test; `None` means the tap missed.
    pub hit: Option<GeospatialPose>,
    /// `None` until a coverage check has answered.
    pub vps: Option<VpsAvailability>,
    pub enable_calls: u32,
}

impl SimulatedDevice {
    /// Tracking with an accurate pose.
    pub fn localized() -> Self {
        Self {
            pose: Some(accurate_pose()),
            earth_tracking: true,
            session_ready: true,
            feature_support: FeatureSupport::Supported,
            earth_state: EarthState::Enabled,
            geospatial_mode_enabled: true,
            fatal: None,
            hit: Some(accurate_pose()),
            vps: None,
            enable_calls: 0,
        }
    }

    /// Ready and supported, but the pose never meets the thresholds.
    pub fn lost() -> Self {
        Self {
            pose: Some(inaccurate_pose()),
            ..Self::localized()
        }
    }

    pub fn set_accurate(&mut self, accurate: bool) {
        self.pose = Some(if accurate {
            accurate_pose()
        } else {
            inaccurate_pose()
        });
    }
}

impl DeviceSignals for SimulatedDevice {
    fn current_pose(&self) -> Option<GeospatialPose> {
        self.pose
    }

    fn is_earth_tracking(&self) -> bool {
        self.earth_tracking
    }

    fn is_session_ready(&self) -> bool {
        self.session_ready
    }

    fn feature_support(&self) -> FeatureSupport {
        self.feature_support
    }

    fn earth_state(&self) -> EarthState {
        self.earth_state
    }

    fn is_geospatial_mode_enabled(&self) -> bool {
        self.geospatial_mode_enabled
    }

    fn enable_geospatial_mode(&mut self) {
        self.enable_calls += 1;
        self.geospatial_mode_enabled = true;
    }

    fn fatal_signal(&self) -> Option<FatalSignal> {
        self.fatal.clone()
    }

    fn vps_availability(&self) -> Option<VpsAvailability> {
        self.vps
    }

    fn hit_test(&self, _position: ScreenPosition) -> Option<GeospatialPose> {
        self.hit
    }
}

/// Scripted outcome for one resolution request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Outcome {
    /// Polls answered with `InProgress` before `status` is reported.
    pub polls_before: u32,
    pub status: ResolverStatus,
}

impl Outcome {
    pub fn after(polls_before: u32, status: ResolverStatus) -> Self {
        Self {
            polls_before,
            status,
        }
    }
}

#[derive(Debug)]
struct Pending {
    polls: Cell<u32>,
    outcome: Outcome,
}

/// Resolver whose answers come from a queue of scripted outcomes, falling
/// back to `default_outcome` once the queue is empty.
#[derive(Debug)]
pub struct SimulatedResolver {
    pub default_outcome: Outcome,
    pub script: VecDeque<Outcome>,
    /// Refuse every request outright.
    pub refuse: bool,
    pub requests: Vec<AnchorRequest>,
    pub detached: Vec<AnchorHandle>,
    pending: HashMap<AnchorHandle, Pending>,
}

impl Default for SimulatedResolver {
    fn default() -> Self {
        Self::with_outcome(Outcome::after(0, ResolverStatus::Success))
    }
}

impl SimulatedResolver {
    pub fn with_outcome(default_outcome: Outcome) -> Self {
        Self {
            default_outcome,
            script: VecDeque::new(),
            refuse: false,
            requests: Vec::new(),
            detached: Vec::new(),
            pending: HashMap::new(),
        }
    }

    /// Outcome for the next accepted request.
    pub fn push_outcome(&mut self, outcome: Outcome) {
        self.script.push_back(outcome);
    }

    /// Total polls seen for `handle`.
    pub fn polls(&self, handle: AnchorHandle) -> u32 {
        self.pending.get(&handle).map_or(0, |p| p.polls.get())
    }
}

impl AnchorResolver for SimulatedResolver {
    fn request_anchor_resolution(&mut self, request: &AnchorRequest) -> Option<AnchorHandle> {
        if self.refuse {
            return None;
        }
        let outcome = self.script.pop_front().unwrap_or(self.default_outcome);
        let handle = AnchorHandle::new_v4();
        self.requests.push(*request);
        self.pending.insert(
            handle,
            Pending {
                polls: Cell::new(0),
                outcome,
            },
        );
        Some(handle)
    }

    fn poll_resolution_state(&self, handle: AnchorHandle) -> ResolverStatus {
        let Some(p) = self.pending.get(&handle) else {
            return ResolverStatus::Failed;
        };
        let n = p.polls.get();
        p.polls.set(n + 1);
        if n >= p.outcome.polls_before {
            p.outcome.status
        } else {
            ResolverStatus::InProgress
        }
    }

    fn detach(&mut self, handle: AnchorHandle) {
        self.detached.push(handle);
    }
}
