//! Attribute Mutation Subscriptions
//!
//! `observe(element, filter) -> SubscriptionId`, `unsubscribe(id)`, and a
//! typed [`AttributeChanged`] record delivered to the subscriber callback.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::NodeId;

/// Subscription handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Attribute mutation record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeChanged {
    /// Element whose attribute changed
    pub target: NodeId,
    /// Element the subscription was registered on
    pub observed: NodeId,
    pub attribute_name: String,
    pub old_value: Option<String>,
    pub subscription: SubscriptionId,
}

/// Subscriber callback. Invoked synchronously from the mutating call, so it
/// must not reach back into the document.
pub type MutationCallback = Rc<dyn Fn(AttributeChanged)>;

/// Observation options
#[derive(Debug, Clone, Default)]
pub struct MutationObserverInit {
    /// Also report mutations on descendants (light tree only)
    pub subtree: bool,
    /// Only report these attributes; `None` reports all
    pub attribute_filter: Option<Vec<String>>,
}

impl MutationObserverInit {
    pub fn attributes(filter: &[&str]) -> Self {
        Self {
            subtree: false,
            attribute_filter: Some(filter.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn with_subtree(mut self) -> Self {
        self.subtree = true;
        self
    }

    fn passes(&self, attribute: &str) -> bool {
        self.attribute_filter
            .as_ref()
            .map_or(true, |f| f.iter().any(|a| a == attribute))
    }
}

pub(crate) struct Observation {
    pub target: NodeId,
    pub init: MutationObserverInit,
    pub callback: MutationCallback,
}

impl fmt::Debug for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observation")
            .field("target", &self.target)
            .field("init", &self.init)
            .finish_non_exhaustive()
    }
}

/// Registry of live observations
#[derive(Debug, Default)]
pub(crate) struct ObserverRegistry {
    next_id: u64,
    observations: HashMap<SubscriptionId, Observation>,
}

impl ObserverRegistry {
    pub fn add(&mut self, target: NodeId, init: MutationObserverInit, callback: MutationCallback) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.observations.insert(id, Observation { target, init, callback });
        id
    }

    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        self.observations.remove(&id).is_some()
    }

    pub fn retain_targets(&mut self, mut live: impl FnMut(NodeId) -> bool) {
        self.observations.retain(|_, o| live(o.target));
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Collect the records to deliver for a mutation on `target`.
    ///
    /// `is_inclusive_ancestor(a, b)` answers whether `a` is `b` or a light-tree
    /// ancestor of it.
    pub fn matching(
        &self,
        target: NodeId,
        attribute: &str,
        old_value: Option<&str>,
        is_inclusive_ancestor: impl Fn(NodeId, NodeId) -> bool,
    ) -> Vec<(MutationCallback, AttributeChanged)> {
        self.observations
            .iter()
            .filter(|(_, o)| {
                let matches_target = o.target == target || (o.init.subtree && is_inclusive_ancestor(o.target, target));
                matches_target && o.init.passes(attribute)
            })
            .map(|(&id, o)| {
                (
                    Rc::clone(&o.callback),
                    AttributeChanged {
                        target,
                        observed: o.target,
                        attribute_name: attribute.to_string(),
                        old_value: old_value.map(str::to_string),
                        subscription: id,
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_filter() {
        let init = MutationObserverInit::attributes(&["aria-pressed", "disabled"]);
        assert!(init.passes("aria-pressed"));
        assert!(!init.passes("class"));
        assert!(MutationObserverInit::default().passes("class"));
    }
}
