//! Presentation and cross-frame broadcast
//!
//! The engine drives these collaborators but does not own their rendering or
//! transport.

use std::fmt;

use lens_a11y::AccessibilityInfo;
use lens_dom::NodeId;
use serde::{Deserialize, Serialize};

/// Consumer of final snapshots.
///
/// Calls are made only for the element currently of interest. `hide` with
/// nothing shown must be a no-op.
pub trait Presenter {
    fn show_loading(&self, target: NodeId);

    fn show(&self, info: &AccessibilityInfo, target: NodeId);

    fn hide(&self);

    /// Root of the presenter's own surface in the document, if it has one.
    /// Focus moving inside it is not tracked.
    fn surface(&self) -> Option<NodeId> {
        None
    }
}

/// Frame identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(pub u64);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame{}", self.0)
    }
}

/// Fire-and-forget "tooltip shown in frame X" notification
pub trait FrameBroadcast {
    fn announce_shown(&self, frame: FrameId);
}
