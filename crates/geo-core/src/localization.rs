//! Session-level localization state machine.
//!
//! One `tick` per frame. Within a tick the order is fixed: lifecycle checks,
//! the coverage answer, prerequisites, pose evaluation, anchor activation,
//! placement intent, history replay, then one step for every pending
//! resolution task. Later stages read what earlier ones wrote in the same
//! tick.

use serde::{Deserialize, Serialize};

use crate::anchor::{Anchor, AnchorHandle, AnchorRequest};
use crate::collaborator::{
    AnchorResolver, DeviceSignals, EarthState, FeatureSupport, PlacementIntent, VpsAvailability,
};
use crate::config::SessionConfig;
use crate::constants::messages;
use crate::diagnostics::DebugSnapshot;
use crate::event::{Advisory, SessionEvent, SessionObserver};
use crate::history::{AnchorHistoryEntry, AnchorHistoryStore, KeyValueStore};
use crate::pose::is_within_tolerance;
use crate::resolution::{AnchorResolutionTask, ResolutionState, TaskStep};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalizationState {
    Initializing,
    Localizing,
    Localized,
    TimedOut,
    SessionError,
}

impl LocalizationState {
    /// Terminal for the session; only a restart leaves these.
    pub fn is_terminal(self) -> bool {
        matches!(self, LocalizationState::TimedOut | LocalizationState::SessionError)
    }
}

/// Caller-provided input for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickInput {
    /// Time since the previous tick.
    pub dt: f64,
    /// Wall clock, stamped onto new history records.
    pub now_unix_secs: u64,
    pub intent: Option<PlacementIntent>,
}

pub struct LocalizationStateMachine<K> {
    config: SessionConfig,
    state: LocalizationState,
    /// Time spent in the current localization attempt.
    elapsed: f64,
    status: String,
    returning: bool,
    teardown_in: Option<f64>,
    torn_down: bool,
    /// Remaining prepare time after switching geospatial mode on.
    enabling: Option<f64>,
    vps: Option<VpsAvailability>,
    anchors: Vec<Anchor>,
    tasks: Vec<AnchorResolutionTask>,
    history: AnchorHistoryStore<K>,
}

impl<K: KeyValueStore> LocalizationStateMachine<K> {
    pub fn new(config: SessionConfig, backend: K) -> Self {
        let history = AnchorHistoryStore::new(backend, config.history);
        Self {
            config,
            state: LocalizationState::Initializing,
            elapsed: 0.0,
            status: String::new(),
            returning: false,
            teardown_in: None,
            torn_down: false,
            enabling: None,
            vps: None,
            anchors: Vec::new(),
            tasks: Vec::new(),
            history,
        }
    }

    /// Begin the session: load (and prune) history and arm replay.
    pub fn start(&mut self, now_unix_secs: u64, observer: &mut dyn SessionObserver) {
        let loaded = self.history.load(now_unix_secs).len();
        tracing::info!("session started with {loaded} history record(s)");
        self.set_status(messages::LOCALIZING, observer);
    }

    pub fn tick(
        &mut self,
        input: &TickInput,
        device: &mut dyn DeviceSignals,
        resolver: &mut dyn AnchorResolver,
        observer: &mut dyn SessionObserver,
    ) {
        if self.torn_down {
            return;
        }
        if self.returning {
            self.count_down_teardown(input.dt, observer);
            return;
        }

        if let Some(signal) = device.fatal_signal() {
            self.return_with_reason(LocalizationState::SessionError, signal.reason(), observer);
            return;
        }

        self.observe_vps(device, observer);

        if !self.prerequisites_met(input.dt, device, observer) {
            return;
        }

        if self.state == LocalizationState::Initializing {
            self.enter_localizing(observer);
        }

        // Pose evaluation and activation.
        let tracking = device.is_earth_tracking();
        let pose = if tracking { device.current_pose() } else { None };
        let localized = device.is_session_ready()
            && tracking
            && is_within_tolerance(pose.as_ref(), &self.config.thresholds);

        let mut just_localized = false;
        if !localized {
            if self.state == LocalizationState::Localized {
                tracing::info!("lost localization");
                self.enter_localizing(observer);
            }
            self.elapsed += input.dt;
            if self.elapsed > self.config.localization_timeout {
                tracing::error!("localization passed timeout after {:.1}", self.elapsed);
                self.return_with_reason(
                    LocalizationState::TimedOut,
                    messages::LOCALIZATION_FAILURE.to_string(),
                    observer,
                );
                return;
            }
            self.set_status(messages::INSTRUCTION, observer);
        } else if self.state == LocalizationState::Localizing {
            self.enter_localized(observer);
            just_localized = true;
        }

        if self.state == LocalizationState::Localized
            && let Some(intent) = input.intent
        {
            self.place_from_intent(intent, input.now_unix_secs, device, resolver, observer);
        }

        if just_localized {
            self.replay_history(resolver, observer);
        }

        self.step_tasks(input.dt, resolver, observer);
    }

    /// Remove one anchor from the session. Its resolution task, if still
    /// running, cancels on its next step.
    pub fn remove_anchor(
        &mut self,
        handle: AnchorHandle,
        resolver: &mut dyn AnchorResolver,
        observer: &mut dyn SessionObserver,
    ) -> bool {
        let Some(idx) = self.anchors.iter().position(|a| a.handle == handle) else {
            return false;
        };
        self.anchors.remove(idx);
        resolver.detach(handle);
        observer.notify(SessionEvent::AnchorRemoved(handle));
        true
    }

    /// Remove every anchor and forget the persisted history.
    pub fn clear_anchors(
        &mut self,
        resolver: &mut dyn AnchorResolver,
        observer: &mut dyn SessionObserver,
    ) {
        self.drop_all_anchors(resolver, observer);
        if let Err(e) = self.history.clear() {
            tracing::warn!("failed to clear anchor history: {e}");
        }
        self.set_status(messages::ANCHORS_CLEARED, observer);
    }

    /// Tear down anchors and flush history. The machine accepts no further
    /// ticks afterwards.
    pub fn end_session(
        &mut self,
        resolver: &mut dyn AnchorResolver,
        observer: &mut dyn SessionObserver,
    ) {
        self.drop_all_anchors(resolver, observer);
        self.tasks.clear();
        if let Err(e) = self.history.save() {
            tracing::warn!("failed to save anchor history: {e}");
        }
        self.torn_down = true;
        tracing::info!("session ended");
    }

    pub fn state(&self) -> LocalizationState {
        self.state
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn localization_elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Set once a terminal reason has been emitted.
    pub fn is_returning(&self) -> bool {
        self.returning
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    pub fn history(&self) -> &AnchorHistoryStore<K> {
        &self.history
    }

    pub fn into_history(self) -> AnchorHistoryStore<K> {
        self.history
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn vps_availability(&self) -> Option<VpsAvailability> {
        self.vps
    }

    /// Session flags alongside the device signals they were derived from.
    pub fn debug_snapshot(&self, device: &dyn DeviceSignals) -> DebugSnapshot {
        let earth_state = device.earth_state();
        let earth_tracking = device.is_earth_tracking();
        let pose = if earth_state == EarthState::Enabled && earth_tracking {
            device.current_pose()
        } else {
            None
        };
        DebugSnapshot {
            vps: self.vps,
            is_returning: self.returning,
            is_localizing: self.state == LocalizationState::Localizing,
            state: self.state,
            session_ready: device.is_session_ready(),
            feature_support: device.feature_support(),
            earth_state,
            earth_tracking,
            pose,
        }
    }

    // --- Stages ---

    /// Feature support, geospatial mode and earth state. Returns false while
    /// the tick should stop here.
    fn prerequisites_met(
        &mut self,
        dt: f64,
        device: &mut dyn DeviceSignals,
        observer: &mut dyn SessionObserver,
    ) -> bool {
        if !device.is_session_ready() && self.state == LocalizationState::Initializing {
            return false;
        }

        match device.feature_support() {
            FeatureSupport::Unknown => return false,
            FeatureSupport::Unsupported => {
                self.return_with_reason(
                    LocalizationState::SessionError,
                    messages::FEATURE_UNSUPPORTED.to_string(),
                    observer,
                );
                return false;
            }
            FeatureSupport::Supported => {
                if !device.is_geospatial_mode_enabled() && self.enabling.is_none() {
                    tracing::info!("switching geospatial mode on");
                    device.enable_geospatial_mode();
                    self.enabling = Some(self.config.geospatial_prepare_time);
                    return false;
                }
            }
        }

        // Waiting for the new configuration to take effect.
        if let Some(remaining) = self.enabling {
            let remaining = remaining - dt;
            if remaining < 0.0 {
                self.enabling = None;
            } else {
                self.enabling = Some(remaining);
                return false;
            }
        }

        match device.earth_state() {
            EarthState::Enabled => true,
            EarthState::ErrorEarthNotReady => {
                self.set_status(messages::INITIALIZING, observer);
                false
            }
            other => {
                let msg = format!("Geospatial sample encountered an EarthState error: {other:?}");
                tracing::warn!("{msg}");
                self.set_status(&msg, observer);
                false
            }
        }
    }

    fn observe_vps(&mut self, device: &dyn DeviceSignals, observer: &mut dyn SessionObserver) {
        let Some(vps) = device.vps_availability() else {
            return;
        };
        if self.vps == Some(vps) {
            return;
        }
        match device.current_pose() {
            Some(p) => tracing::info!(
                "VPS availability at ({:.6}, {:.6}): {vps}",
                p.latitude,
                p.longitude
            ),
            None => tracing::info!("VPS availability: {vps}"),
        }
        self.vps = Some(vps);
        observer.notify(SessionEvent::VpsAvailability(vps));
    }

    fn enter_localizing(&mut self, observer: &mut dyn SessionObserver) {
        self.transition(LocalizationState::Localizing, observer);
        self.elapsed = 0.0;
        for anchor in self.anchors.iter_mut().filter(|a| a.active) {
            anchor.active = false;
            observer.notify(SessionEvent::AnchorActivation {
                handle: anchor.handle,
                active: false,
            });
        }
    }

    fn enter_localized(&mut self, observer: &mut dyn SessionObserver) {
        self.transition(LocalizationState::Localized, observer);
        self.elapsed = 0.0;
        self.set_status(messages::LOCALIZATION_SUCCESS, observer);
        // Anchors still resolving or failed stay hidden.
        for anchor in self
            .anchors
            .iter_mut()
            .filter(|a| a.state == ResolutionState::Success && !a.active)
        {
            anchor.active = true;
            observer.notify(SessionEvent::AnchorActivation {
                handle: anchor.handle,
                active: true,
            });
        }
    }

    fn place_from_intent(
        &mut self,
        intent: PlacementIntent,
        now_unix_secs: u64,
        device: &dyn DeviceSignals,
        resolver: &mut dyn AnchorResolver,
        observer: &mut dyn SessionObserver,
    ) {
        let pose = match intent {
            PlacementIntent::Tap(position) => device.hit_test(position),
            PlacementIntent::AtCamera => device.current_pose(),
        };
        let Some(pose) = pose else {
            tracing::debug!("no geospatial pose for {intent:?}");
            return;
        };

        let entry = AnchorHistoryEntry::from_pose(&pose, now_unix_secs);
        if self.place(&entry, resolver, observer).is_some() {
            self.history.append(entry);
            if let Err(e) = self.history.save() {
                tracing::warn!("failed to save anchor history: {e}");
            }
        }
    }

    fn replay_history(
        &mut self,
        resolver: &mut dyn AnchorResolver,
        observer: &mut dyn SessionObserver,
    ) {
        let mut entries = Vec::new();
        let Some(count) = self.history.replay_all(|e| entries.push(e.clone())) else {
            return;
        };
        for entry in &entries {
            self.place(entry, resolver, observer);
        }
        tracing::info!("replayed {count} history record(s)");
        let msg = format!("{} anchor(s) set from history.", self.anchors.len());
        self.set_status(&msg, observer);
    }

    /// Submit a resolution request for `entry` and track the anchor.
    fn place(
        &mut self,
        entry: &AnchorHistoryEntry,
        resolver: &mut dyn AnchorResolver,
        observer: &mut dyn SessionObserver,
    ) -> Option<AnchorHandle> {
        let request = AnchorRequest::from_history(entry, self.config.anchor_kind);
        let mut task = AnchorResolutionTask::new(request, self.config.resolution);
        let Some(handle) = task.submit(resolver) else {
            self.set_status(messages::PLACEMENT_FAILED, observer);
            return None;
        };

        self.anchors.push(Anchor::new(handle, request));
        self.tasks.push(task);
        observer.notify(SessionEvent::AnchorAdded(handle));
        let msg = format!("{} Anchor(s) Set!", self.anchors.len());
        self.set_status(&msg, observer);
        Some(handle)
    }

    fn step_tasks(
        &mut self,
        dt: f64,
        resolver: &mut dyn AnchorResolver,
        observer: &mut dyn SessionObserver,
    ) {
        let mut outcomes = Vec::new();
        for task in &mut self.tasks {
            let Some(handle) = task.handle() else {
                continue;
            };
            let tracked = self.anchors.iter().any(|a| a.handle == handle);
            match task.step(dt, tracked, resolver) {
                TaskStep::Dormant | TaskStep::Waiting | TaskStep::Pending => {}
                step => outcomes.push((handle, step)),
            }
        }
        self.tasks.retain(|t| !t.state().is_terminal());

        for (handle, step) in outcomes {
            match step {
                TaskStep::StillPending => self.on_still_pending(handle, observer),
                TaskStep::Finished(state) => self.on_resolved(handle, state, resolver, observer),
                _ => {}
            }
        }
    }

    fn on_still_pending(&mut self, handle: AnchorHandle, observer: &mut dyn SessionObserver) {
        tracing::warn!("anchor {handle} still resolving after attempt cap");
        observer.notify(SessionEvent::Advisory(Advisory::ResolutionPending(handle)));
        if self.is_latest(handle) {
            self.set_status(messages::RESOLVING_TIMEOUT, observer);
        }
    }

    fn on_resolved(
        &mut self,
        handle: AnchorHandle,
        state: ResolutionState,
        resolver: &mut dyn AnchorResolver,
        observer: &mut dyn SessionObserver,
    ) {
        if state == ResolutionState::Cancelled {
            // Removal was already reported; the status line stays as is.
            tracing::debug!("anchor {handle} resolution cancelled");
            return;
        }
        let latest = self.is_latest(handle);
        let localized = self.state == LocalizationState::Localized;
        let Some(idx) = self.anchors.iter().position(|a| a.handle == handle) else {
            return;
        };

        observer.notify(SessionEvent::AnchorResolved { handle, state });
        match state {
            ResolutionState::Success => {
                tracing::info!("anchor {handle} resolved");
                let anchor = &mut self.anchors[idx];
                anchor.state = ResolutionState::Success;
                if localized {
                    anchor.active = true;
                    observer.notify(SessionEvent::AnchorActivation {
                        handle,
                        active: true,
                    });
                }
            }
            _ => {
                tracing::warn!("anchor {handle} failed to resolve");
                self.anchors.remove(idx);
                resolver.detach(handle);
                observer.notify(SessionEvent::AnchorRemoved(handle));
                observer.notify(SessionEvent::Advisory(Advisory::ResolutionFailed(handle)));
            }
        }
        if latest {
            let msg = format!("Terrain anchor state: {state}");
            self.set_status(&msg, observer);
        }
    }

    // --- Helpers ---

    fn is_latest(&self, handle: AnchorHandle) -> bool {
        self.anchors.last().is_some_and(|a| a.handle == handle)
    }

    fn drop_all_anchors(
        &mut self,
        resolver: &mut dyn AnchorResolver,
        observer: &mut dyn SessionObserver,
    ) {
        for anchor in self.anchors.drain(..) {
            resolver.detach(anchor.handle);
            observer.notify(SessionEvent::AnchorRemoved(anchor.handle));
        }
    }

    /// Single exit path for every fatal condition.
    fn return_with_reason(
        &mut self,
        to: LocalizationState,
        reason: String,
        observer: &mut dyn SessionObserver,
    ) {
        if self.returning || reason.is_empty() {
            return;
        }
        tracing::error!("{reason}");
        self.returning = true;
        self.transition(to, observer);
        self.set_status(&reason, observer);
        observer.notify(SessionEvent::ReturnRequested { reason });
        self.teardown_in = Some(self.config.error_display_delay);
    }

    fn count_down_teardown(&mut self, dt: f64, observer: &mut dyn SessionObserver) {
        let Some(remaining) = self.teardown_in else {
            return;
        };
        let remaining = remaining - dt;
        if remaining <= 0.0 {
            self.teardown_in = None;
            self.torn_down = true;
            tracing::info!("session teardown");
            observer.notify(SessionEvent::Teardown);
        } else {
            self.teardown_in = Some(remaining);
        }
    }

    fn transition(&mut self, to: LocalizationState, observer: &mut dyn SessionObserver) {
        if self.state == to {
            return;
        }
        let from = self.state;
        tracing::info!("localization {from:?} -> {to:?}");
        self.state = to;
        observer.notify(SessionEvent::StateChanged { from, to });
    }

    fn set_status(&mut self, msg: &str, observer: &mut dyn SessionObserver) {
        if self.status == msg {
            return;
        }
        self.status = msg.to_string();
        observer.notify(SessionEvent::Status(self.status.clone()));
    }
}
