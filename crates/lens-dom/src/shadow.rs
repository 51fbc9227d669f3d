//! Shadow DOM
//!
//! Shadow roots attached to host elements. Id lookups and mutation
//! subscriptions never cross a shadow boundary.

use crate::NodeId;

/// Shadow root mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadowRootMode {
    #[default]
    Open,
    Closed,
}

/// Shadow root
#[derive(Debug, Clone)]
pub struct ShadowRoot {
    pub host: NodeId,
    pub mode: ShadowRootMode,
    pub(crate) children: Vec<NodeId>,
}

impl ShadowRoot {
    /// Create a new shadow root
    pub fn new(host: NodeId, mode: ShadowRootMode) -> Self {
        Self {
            host,
            mode,
            children: Vec::new(),
        }
    }

    /// Get children
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}
