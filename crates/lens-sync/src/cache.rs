//! Accessibility Cache
//!
//! Last known-good snapshot per element, keyed by element identity.

use std::collections::HashMap;

use lens_a11y::AccessibilityInfo;
use lens_dom::{Document, NodeId};

/// Identity-keyed snapshot cache
#[derive(Debug, Default)]
pub struct AccessibilityCache {
    entries: HashMap<NodeId, AccessibilityInfo>,
}

impl AccessibilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, element: NodeId) -> Option<&AccessibilityInfo> {
        self.entries.get(&element)
    }

    pub fn set(&mut self, element: NodeId, info: AccessibilityInfo) {
        self.entries.insert(element, info);
    }

    pub fn delete(&mut self, element: NodeId) -> bool {
        self.entries.remove(&element).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries for elements no longer in the document
    pub fn prune(&mut self, doc: &Document) -> usize {
        let before = self.entries.len();
        self.entries.retain(|&id, _| doc.contains(id));
        let pruned = before - self.entries.len();
        if pruned > 0 {
            tracing::trace!(pruned, "pruned cache entries for removed elements");
        }
        pruned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_keys_do_not_alias() {
        let mut doc = Document::new();
        let first = doc.create_element("button");
        doc.append_child(doc.body(), first).unwrap();

        let mut cache = AccessibilityCache::new();
        let mut info = AccessibilityInfo::empty();
        info.role = "button".into();
        cache.set(first, info);

        doc.remove(first).unwrap();
        let second = doc.create_element("button");
        doc.append_child(doc.body(), second).unwrap();

        assert!(cache.get(second).is_none());
        assert_eq!(cache.prune(&doc), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_delete_and_clear() {
        let mut doc = Document::new();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        let mut cache = AccessibilityCache::new();
        cache.set(a, AccessibilityInfo::empty());
        cache.set(b, AccessibilityInfo::empty());

        assert!(cache.delete(a));
        assert!(!cache.delete(a));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.get(b).is_none());
    }
}
