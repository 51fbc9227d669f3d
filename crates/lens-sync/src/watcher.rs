//! Mutation Watcher
//!
//! Attribute observation on the tracked container and debounce bookkeeping.
//! Delivery is asynchronous: subscription callbacks only enqueue records, and
//! the engine classifies them here once the document is no longer borrowed.

use std::collections::HashMap;
use std::mem;

use lens_a11y::aria::is_multi_select;
use lens_dom::{AttributeChanged, Document, DomError, MutationCallback, MutationObserverInit, NodeId, SubscriptionId};
use smol::Task;

/// Attributes whose change can alter a snapshot
pub const OBSERVED_ATTRIBUTES: &[&str] = &[
    // ARIA states
    "aria-busy",
    "aria-checked",
    "aria-current",
    "aria-disabled",
    "aria-expanded",
    "aria-grabbed",
    "aria-hidden",
    "aria-invalid",
    "aria-pressed",
    "aria-selected",
    // ARIA properties
    "aria-activedescendant",
    "aria-autocomplete",
    "aria-colcount",
    "aria-colindex",
    "aria-controls",
    "aria-description",
    "aria-errormessage",
    "aria-haspopup",
    "aria-label",
    "aria-labelledby",
    "aria-level",
    "aria-live",
    "aria-modal",
    "aria-multiline",
    "aria-multiselectable",
    "aria-orientation",
    "aria-placeholder",
    "aria-posinset",
    "aria-readonly",
    "aria-required",
    "aria-roledescription",
    "aria-rowcount",
    "aria-rowindex",
    "aria-setsize",
    "aria-sort",
    "aria-valuemax",
    "aria-valuemin",
    "aria-valuenow",
    "aria-valuetext",
    // HTML
    "disabled",
    "checked",
    "selected",
    "required",
    "readonly",
    "value",
];

/// Option attributes watched under a multi-select container
const OPTION_ATTRIBUTES: &[&str] = &["selected", "aria-selected"];

/// Debounce slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebounceKey {
    /// Follow an `aria-activedescendant` change on the container
    Redirect(NodeId),
    /// Forced re-fetch of the inspected element
    Refresh(NodeId),
}

/// What a mutation calls for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationAction {
    Ignore,
    Redirect { container: NodeId },
    Refresh { element: NodeId },
}

/// Mutation watcher
#[derive(Debug, Default)]
pub struct MutationWatcher {
    container: Option<NodeId>,
    inspected: Option<NodeId>,
    subscriptions: Vec<SubscriptionId>,
    pending: HashMap<DebounceKey, Task<()>>,
}

impl MutationWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe `container` (and `inspected` when it differs).
    ///
    /// Replaces any previous observation and cancels pending timers.
    pub fn attach(
        &mut self,
        doc: &mut Document,
        container: NodeId,
        inspected: NodeId,
        callback: MutationCallback,
    ) -> Result<(), DomError> {
        self.detach(doc);

        let init = MutationObserverInit::attributes(OBSERVED_ATTRIBUTES);
        self.subscriptions
            .push(doc.observe(container, init.clone(), callback.clone())?);
        if inspected != container {
            self.subscriptions.push(doc.observe(inspected, init, callback.clone())?);
        }
        if is_multi_select(doc, container) {
            let options = MutationObserverInit::attributes(OPTION_ATTRIBUTES).with_subtree();
            self.subscriptions.push(doc.observe(container, options, callback)?);
        }

        self.container = Some(container);
        self.inspected = Some(inspected);
        tracing::debug!(
            container = %container,
            inspected = %inspected,
            subscriptions = self.subscriptions.len(),
            "watching for attribute mutations"
        );
        Ok(())
    }

    /// Drop every subscription and cancel pending timers
    pub fn detach(&mut self, doc: &mut Document) {
        for id in self.subscriptions.drain(..) {
            doc.unsubscribe(id);
        }
        self.container = None;
        self.inspected = None;
        self.cancel_pending();
    }

    pub fn cancel_pending(&mut self) {
        let pending = mem::take(&mut self.pending);
        if !pending.is_empty() {
            tracing::trace!(timers = pending.len(), "cancelling debounce timers");
        }
        drop(pending);
    }

    pub fn container(&self) -> Option<NodeId> {
        self.container
    }

    pub fn is_attached(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    pub fn classify(&self, record: &AttributeChanged) -> MutationAction {
        let Some(inspected) = self.inspected else {
            return MutationAction::Ignore;
        };
        if !self.subscriptions.contains(&record.subscription) {
            return MutationAction::Ignore;
        }
        if record.attribute_name == "aria-activedescendant" && Some(record.target) == self.container {
            if let Some(container) = self.container {
                return MutationAction::Redirect { container };
            }
        }
        MutationAction::Refresh { element: inspected }
    }

    /// Arm the timer for `key`, cancelling the one it replaces
    pub fn debounce(&mut self, key: DebounceKey, task: Task<()>) {
        if self.pending.insert(key, task).is_some() {
            tracing::debug!(?key, "debounce timer restarted");
        }
    }

    /// Timers armed and not yet cancelled (fired ones included)
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
