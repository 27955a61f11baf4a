use std::fmt;

use serde::{Deserialize, Serialize};

use crate::anchor::{AnchorHandle, AnchorRequest};
use crate::collaborator::{AnchorResolver, ResolverStatus};
use crate::config::ResolutionConfig;

/// Lifecycle of one anchor's resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionState {
    Requested,
    InProgress,
    Success,
    Failed,
    Cancelled,
}

impl ResolutionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ResolutionState::Success | ResolutionState::Failed | ResolutionState::Cancelled
        )
    }
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResolutionState::Requested => "Requested",
            ResolutionState::InProgress => "TaskInProgress",
            ResolutionState::Success => "Success",
            ResolutionState::Failed => "Failed",
            ResolutionState::Cancelled => "Cancelled",
        };
        f.write_str(s)
    }
}

/// What a single `step` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStep {
    /// Task is already terminal; nothing happened.
    Dormant,
    /// Between polls.
    Waiting,
    /// Polled, still in progress.
    Pending,
    /// Polled, still in progress, and the attempt cap was just reached.
    StillPending,
    /// Reached a terminal state on this step.
    Finished(ResolutionState),
}

/// Drives one anchor's resolution by polling the resolver, one step per tick.
#[derive(Clone, Debug)]
pub struct AnchorResolutionTask {
    request: AnchorRequest,
    handle: Option<AnchorHandle>,
    state: ResolutionState,
    attempts: u32,
    since_poll: f64,
    polled: bool,
    advisory_raised: bool,
    config: ResolutionConfig,
}

impl AnchorResolutionTask {
    pub fn new(request: AnchorRequest, config: ResolutionConfig) -> Self {
        Self {
            request,
            handle: None,
            state: ResolutionState::Requested,
            attempts: 0,
            since_poll: 0.0,
            polled: false,
            advisory_raised: false,
            config,
        }
    }

    /// Hand the request to the resolver. On acceptance the task is
    /// `InProgress`; a refused request ends it as `Failed`.
    pub fn submit(&mut self, resolver: &mut dyn AnchorResolver) -> Option<AnchorHandle> {
        if self.state != ResolutionState::Requested {
            return self.handle;
        }
        match resolver.request_anchor_resolution(&self.request) {
            Some(handle) => {
                tracing::debug!("anchor {handle} submitted for resolution");
                self.handle = Some(handle);
                self.state = ResolutionState::InProgress;
                Some(handle)
            }
            None => {
                tracing::warn!(
                    "resolver refused anchor at ({}, {})",
                    self.request.latitude,
                    self.request.longitude
                );
                self.state = ResolutionState::Failed;
                None
            }
        }
    }

    /// Advance by `dt`. `tracked` is whether the anchor is still in the
    /// session's anchor set; once it is not, the task cancels without
    /// polling again.
    pub fn step(&mut self, dt: f64, tracked: bool, resolver: &dyn AnchorResolver) -> TaskStep {
        if self.state != ResolutionState::InProgress {
            return TaskStep::Dormant;
        }
        let Some(handle) = self.handle else {
            return TaskStep::Dormant;
        };

        if !tracked {
            tracing::debug!("{handle} has been removed, exit resolution state check");
            self.state = ResolutionState::Cancelled;
            return TaskStep::Finished(ResolutionState::Cancelled);
        }

        self.since_poll += dt;
        if self.polled && self.since_poll < self.config.poll_interval {
            return TaskStep::Waiting;
        }
        self.polled = true;
        self.since_poll = 0.0;

        match resolver.poll_resolution_state(handle) {
            ResolverStatus::Success => {
                self.state = ResolutionState::Success;
                TaskStep::Finished(ResolutionState::Success)
            }
            ResolverStatus::Failed => {
                self.state = ResolutionState::Failed;
                TaskStep::Finished(ResolutionState::Failed)
            }
            ResolverStatus::InProgress => {
                self.attempts = (self.attempts + 1).min(self.config.attempt_cap);
                tracing::trace!("{handle} still resolving, attempt {}", self.attempts);
                if self.attempts >= self.config.attempt_cap && !self.advisory_raised {
                    self.advisory_raised = true;
                    TaskStep::StillPending
                } else {
                    TaskStep::Pending
                }
            }
        }
    }

    pub fn handle(&self) -> Option<AnchorHandle> {
        self.handle
    }

    pub fn state(&self) -> ResolutionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::anchor::AnchorPlacement;
    use crate::quaternion::Quaternion;

    /// Reports InProgress until `resolve_after` polls, then `outcome`.
    struct CountingResolver {
        polls: Cell<u32>,
        resolve_after: Option<u32>,
        outcome: ResolverStatus,
        accept: bool,
    }

    impl CountingResolver {
        fn new(resolve_after: Option<u32>, outcome: ResolverStatus) -> Self {
            Self {
                polls: Cell::new(0),
                resolve_after,
                outcome,
                accept: true,
            }
        }
    }

    impl AnchorResolver for CountingResolver {
        fn request_anchor_resolution(&mut self, _request: &AnchorRequest) -> Option<AnchorHandle> {
            self.accept.then(AnchorHandle::new_v4)
        }

        fn poll_resolution_state(&self, _handle: AnchorHandle) -> ResolverStatus {
            let n = self.polls.get() + 1;
            self.polls.set(n);
            match self.resolve_after {
                Some(after) if n >= after => self.outcome,
                _ => ResolverStatus::InProgress,
            }
        }
    }

    fn request() -> AnchorRequest {
        AnchorRequest {
            latitude: 48.858,
            longitude: 2.294,
            placement: AnchorPlacement::Terrain {
                altitude_offset: 0.0,
            },
            rotation: Quaternion::identity(),
        }
    }

    fn submitted(resolver: &mut CountingResolver) -> AnchorResolutionTask {
        let mut task = AnchorResolutionTask::new(request(), ResolutionConfig::default());
        assert_eq!(task.state(), ResolutionState::Requested);
        assert!(task.submit(resolver).is_some());
        assert_eq!(task.state(), ResolutionState::InProgress);
        task
    }

    #[test]
    fn test_refused_request_fails() {
        let mut resolver = CountingResolver::new(None, ResolverStatus::Success);
        resolver.accept = false;
        let mut task = AnchorResolutionTask::new(request(), ResolutionConfig::default());
        assert!(task.submit(&mut resolver).is_none());
        assert_eq!(task.state(), ResolutionState::Failed);
        assert_eq!(task.step(0.1, true, &resolver), TaskStep::Dormant);
    }

    #[test]
    fn test_first_step_polls_immediately() {
        let mut resolver = CountingResolver::new(Some(1), ResolverStatus::Success);
        let mut task = submitted(&mut resolver);
        assert_eq!(
            task.step(0.0, true, &resolver),
            TaskStep::Finished(ResolutionState::Success)
        );
        assert_eq!(resolver.polls.get(), 1);
    }

    #[test]
    fn test_polls_respect_interval() {
        let mut resolver = CountingResolver::new(None, ResolverStatus::Success);
        let mut task = submitted(&mut resolver);
        assert_eq!(task.step(0.04, true, &resolver), TaskStep::Pending);
        assert_eq!(task.step(0.04, true, &resolver), TaskStep::Waiting);
        assert_eq!(task.step(0.04, true, &resolver), TaskStep::Waiting);
        assert_eq!(task.step(0.04, true, &resolver), TaskStep::Pending);
        assert_eq!(resolver.polls.get(), 2);
    }

    #[test]
    fn test_failure_is_terminal() {
        let mut resolver = CountingResolver::new(Some(3), ResolverStatus::Failed);
        let mut task = submitted(&mut resolver);
        let mut last = TaskStep::Dormant;
        for _ in 0..3 {
            last = task.step(0.1, true, &resolver);
        }
        assert_eq!(last, TaskStep::Finished(ResolutionState::Failed));
        assert_eq!(task.step(0.1, true, &resolver), TaskStep::Dormant);
        assert_eq!(resolver.polls.get(), 3);
    }

    #[test]
    fn test_advisory_raised_once_at_cap_then_keeps_polling() {
        let mut resolver = CountingResolver::new(Some(150), ResolverStatus::Success);
        let mut task = submitted(&mut resolver);
        let mut advisories = 0;
        let mut finished_at = None;
        for i in 1..=200 {
            match task.step(0.1, true, &resolver) {
                TaskStep::StillPending => {
                    advisories += 1;
                    assert_eq!(i, 100);
                }
                TaskStep::Finished(state) => {
                    finished_at = Some((i, state));
                    break;
                }
                _ => {}
            }
        }
        assert_eq!(advisories, 1);
        assert_eq!(finished_at, Some((150, ResolutionState::Success)));
        assert_eq!(task.attempts(), 100);
    }

    #[test]
    fn test_cancel_stops_polling() {
        let mut resolver = CountingResolver::new(None, ResolverStatus::Success);
        let mut task = submitted(&mut resolver);
        task.step(0.1, true, &resolver);
        assert_eq!(
            task.step(0.1, false, &resolver),
            TaskStep::Finished(ResolutionState::Cancelled)
        );
        for _ in 0..50 {
            assert_eq!(task.step(0.1, false, &resolver), TaskStep::Dormant);
            assert_eq!(task.step(0.1, true, &resolver), TaskStep::Dormant);
        }
        assert_eq!(task.state(), ResolutionState::Cancelled);
        assert_eq!(resolver.polls.get(), 1);
    }
}
