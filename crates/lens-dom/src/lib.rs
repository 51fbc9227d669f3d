//! Lens DOM - Document Object Model
//!
//! Arena-backed DOM model used by the synchronization engine.
//!
//! Nodes are addressed by generational [`NodeId`] handles: a handle stays
//! valid while its node is alive and never aliases a node allocated later in
//! the same slot. Caches and registries elsewhere key on these handles by
//! identity instead of on derived selector strings.

mod arena;
mod document;
mod node;
mod observer;
mod shadow;

pub use document::{Ancestors, Document, TreeScope};
pub use node::{Attribute, ElementData, NodeKind};
pub use observer::{AttributeChanged, MutationCallback, MutationObserverInit, SubscriptionId};
pub use shadow::{ShadowRoot, ShadowRootMode};

use std::fmt;

/// Node identifier (slot index plus generation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Slot index in the arena
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was issued
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node{}.{}", self.index, self.generation)
    }
}

/// DOM error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("stale node handle {0}")]
    StaleNode(NodeId),

    #[error("{0} is not an element")]
    NotAnElement(NodeId),

    #[error("hierarchy request error: {0}")]
    HierarchyRequest(String),

    #[error("{0} already hosts a shadow root")]
    ShadowRootExists(NodeId),

    #[error("{0} does not host a shadow root")]
    NoShadowRoot(NodeId),
}
