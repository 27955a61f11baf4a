use serde::Serialize;

use crate::anchor::AnchorHandle;
use crate::collaborator::VpsAvailability;
use crate::localization::LocalizationState;
use crate::resolution::ResolutionState;

/// Non-fatal notices about individual anchors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Advisory {
    /// The resolver has not finished after the attempt cap; still polling.
    ResolutionPending(AnchorHandle),
    /// The resolver refused or failed the anchor; it was discarded.
    ResolutionFailed(AnchorHandle),
}

/// Everything the session reports outward.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum SessionEvent {
    StateChanged {
        from: LocalizationState,
        to: LocalizationState,
    },
    /// Human-readable status line.
    Status(String),
    AnchorAdded(AnchorHandle),
    /// Show or hide an anchor's visual.
    AnchorActivation { handle: AnchorHandle, active: bool },
    AnchorResolved {
        handle: AnchorHandle,
        state: ResolutionState,
    },
    AnchorRemoved(AnchorHandle),
    Advisory(Advisory),
    /// Coverage at the device location changed. Informational only.
    VpsAvailability(VpsAvailability),
    /// The session is ending; emitted once, carrying the reason.
    ReturnRequested { reason: String },
    /// The display delay after `ReturnRequested` has elapsed.
    Teardown,
}

/// Output channel the session writes to.
pub trait SessionObserver {
    fn notify(&mut self, event: SessionEvent);
}

impl SessionObserver for Vec<SessionEvent> {
    fn notify(&mut self, event: SessionEvent) {
        self.push(event);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl SessionObserver for NullObserver {
    fn notify(&mut self, _event: SessionEvent) {}
}
