//! Document
//!
//! Owns the node arena, the focused element, and attribute subscriptions.

use crate::arena::NodeArena;
use crate::node::{ElementData, Node, NodeKind};
use crate::observer::{MutationCallback, MutationObserverInit, ObserverRegistry, SubscriptionId};
use crate::shadow::{ShadowRoot, ShadowRootMode};
use crate::{DomError, NodeId};

/// Tree a node belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeScope {
    /// Connected to the document tree
    Document,
    /// Inside the shadow tree hosted by the given element
    Shadow(NodeId),
    /// Not attached; carries the top of the detached subtree
    Detached(NodeId),
}

/// DOM document
#[derive(Debug)]
pub struct Document {
    nodes: NodeArena<Node>,
    root: NodeId,
    body: NodeId,
    active: Option<NodeId>,
    observers: ObserverRegistry,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document with an empty `<body>`
    pub fn new() -> Self {
        let mut nodes = NodeArena::new();
        let root = nodes.insert(Node::new(NodeKind::Document));
        let body = nodes.insert(Node::new(NodeKind::Element(ElementData::new("body"))));
        if let Some(node) = nodes.get_mut(body) {
            node.parent = Some(root);
        }
        if let Some(node) = nodes.get_mut(root) {
            node.children.push(body);
        }
        Self {
            nodes,
            root,
            body,
            active: None,
            observers: ObserverRegistry::default(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the handle still resolves to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some()
    }

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id).ok_or(DomError::StaleNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes.get_mut(id).ok_or(DomError::StaleNode(id))
    }

    /// Element data for a live element
    pub fn element(&self, id: NodeId) -> Result<&ElementData, DomError> {
        self.node(id)?.as_element().ok_or(DomError::NotAnElement(id))
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        self.node_mut(id)?.as_element_mut().ok_or(DomError::NotAnElement(id))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_ok()
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.insert(Node::new(NodeKind::Element(ElementData::new(tag))))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.nodes.insert(Node::new(NodeKind::Text(text.to_string())))
    }

    /// Append a detached node as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insertable(parent, child)?;
        if matches!(self.node(parent)?.kind, NodeKind::Text(_)) {
            return Err(DomError::HierarchyRequest(format!("{parent} is a text node")));
        }
        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Attach a shadow root to `host`
    pub fn attach_shadow(&mut self, host: NodeId, mode: ShadowRootMode) -> Result<(), DomError> {
        let element = self.element_mut(host)?;
        if element.shadow_root.is_some() {
            return Err(DomError::ShadowRootExists(host));
        }
        element.shadow_root = Some(ShadowRoot::new(host, mode));
        Ok(())
    }

    /// Append a detached node to the shadow root hosted by `host`
    pub fn append_shadow_child(&mut self, host: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insertable(host, child)?;
        self.element_mut(host)?
            .shadow_root
            .as_mut()
            .ok_or(DomError::NoShadowRoot(host))?
            .children
            .push(child);
        self.node_mut(child)?.shadow_host = Some(host);
        Ok(())
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.node(parent)?;
        let node = self.node(child)?;
        if child == self.root {
            return Err(DomError::HierarchyRequest("cannot insert the document node".into()));
        }
        if node.parent.is_some() || node.shadow_host.is_some() {
            return Err(DomError::HierarchyRequest(format!("{child} already has a parent")));
        }
        if self.is_composed_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest(format!("{child} contains {parent}")));
        }
        Ok(())
    }

    /// Detach `id` and free its whole subtree, shadow trees included.
    ///
    /// Every handle into the subtree stops resolving and subscriptions
    /// registered on removed nodes are dropped.
    pub fn remove(&mut self, id: NodeId) -> Result<(), DomError> {
        if id == self.root {
            return Err(DomError::HierarchyRequest("cannot remove the document node".into()));
        }
        let (parent, host) = {
            let node = self.node(id)?;
            (node.parent, node.shadow_host)
        };
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.retain(|&c| c != id);
        }
        if let Some(host) = host {
            if let Some(shadow) = self.element_mut(host)?.shadow_root.as_mut() {
                shadow.children.retain(|&c| c != id);
            }
        }

        let mut stack = vec![id];
        let mut removed = 0usize;
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(current) {
                removed += 1;
                if let Some(shadow) = node.as_element().and_then(|e| e.shadow_root.as_ref()) {
                    stack.extend(shadow.children.iter().copied());
                }
                stack.extend(node.children);
            }
        }
        if self.active.is_some_and(|a| !self.contains(a)) {
            self.active = None;
        }
        let nodes = &self.nodes;
        self.observers.retain_targets(|target| nodes.get(target).is_some());
        tracing::trace!(node = %id, removed, "removed subtree");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Attributes and properties
    // ------------------------------------------------------------------

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).ok().map(|e| &*e.tag)
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).ok()?.get_attribute(name)
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    /// Attributes in insertion order (empty for non-elements)
    pub fn attributes(&self, id: NodeId) -> impl Iterator<Item = (&str, &str)> {
        self.element(id)
            .ok()
            .into_iter()
            .flat_map(|e| e.attributes.iter().map(|a| (a.name.as_str(), a.value.as_str())))
    }

    /// Set an attribute and notify matching subscriptions
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let name = name.to_ascii_lowercase();
        let old = self.element_mut(id)?.set_attribute(&name, value);
        self.notify(id, &name, old.as_deref());
        Ok(())
    }

    /// Remove an attribute; notifies only when the attribute was present
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<(), DomError> {
        let name = name.to_ascii_lowercase();
        if let Some(old) = self.element_mut(id)?.remove_attribute(&name) {
            self.notify(id, &name, Some(&old));
        }
        Ok(())
    }

    fn notify(&self, target: NodeId, name: &str, old_value: Option<&str>) {
        let records = self
            .observers
            .matching(target, name, old_value, |a, b| self.is_light_inclusive_ancestor(a, b));
        for (callback, record) in records {
            tracing::trace!(element = %record.target, attribute = %record.attribute_name, "attribute mutation");
            callback(record);
        }
    }

    pub fn checked(&self, id: NodeId) -> bool {
        self.element(id).is_ok_and(|e| e.checked)
    }

    pub fn set_checked(&mut self, id: NodeId, checked: bool) -> Result<(), DomError> {
        self.element_mut(id)?.checked = checked;
        Ok(())
    }

    pub fn indeterminate(&self, id: NodeId) -> bool {
        self.element(id).is_ok_and(|e| e.indeterminate)
    }

    pub fn set_indeterminate(&mut self, id: NodeId, indeterminate: bool) -> Result<(), DomError> {
        self.element_mut(id)?.indeterminate = indeterminate;
        Ok(())
    }

    /// Current value property, falling back to the `value` attribute
    pub fn value(&self, id: NodeId) -> Option<&str> {
        let element = self.element(id).ok()?;
        element.value.as_deref().or_else(|| element.get_attribute("value"))
    }

    pub fn set_value(&mut self, id: NodeId, value: &str) -> Result<(), DomError> {
        self.element_mut(id)?.value = Some(value.to_string());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tree traversal
    // ------------------------------------------------------------------

    /// Light-tree parent
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id)?.parent
    }

    /// Parent in the composed tree (shadow children report their host)
    pub fn composed_parent(&self, id: NodeId) -> Option<NodeId> {
        let node = self.nodes.get(id)?;
        node.parent.or(node.shadow_host)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(&[], |n| n.children.as_slice())
    }

    pub fn shadow_root(&self, host: NodeId) -> Option<&ShadowRoot> {
        self.element(host).ok()?.shadow_root.as_ref()
    }

    /// Composed-tree ancestors, nearest first, excluding `id`
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.composed_parent(id),
        }
    }

    fn is_light_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Whether `ancestor` is `node` or one of its composed-tree ancestors
    pub fn is_composed_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    fn top(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Tree scope of a live node
    pub fn scope(&self, id: NodeId) -> Result<TreeScope, DomError> {
        self.node(id)?;
        let top = self.top(id);
        if top == self.root {
            return Ok(TreeScope::Document);
        }
        match self.nodes.get(top).and_then(|n| n.shadow_host) {
            Some(host) => Ok(TreeScope::Shadow(host)),
            None => Ok(TreeScope::Detached(top)),
        }
    }

    pub fn is_in_shadow_tree(&self, id: NodeId) -> bool {
        matches!(self.scope(id), Ok(TreeScope::Shadow(_)))
    }

    /// Whether the node is reachable from the document through the composed tree
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            match self.scope(current) {
                Ok(TreeScope::Document) => return true,
                Ok(TreeScope::Shadow(host)) => current = host,
                _ => return false,
            }
        }
    }

    /// Light-tree descendants in document order, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        out
    }

    /// Resolve an id within the tree scope `context` belongs to.
    ///
    /// Lookups from inside a shadow tree only see that shadow tree, and
    /// lookups from the document never see into shadow trees.
    pub fn get_element_by_id(&self, context: NodeId, element_id: &str) -> Option<NodeId> {
        if element_id.is_empty() {
            return None;
        }
        self.tree_nodes(context)
            .into_iter()
            .find(|&n| self.attribute(n, "id") == Some(element_id))
    }

    /// Every node of the tree scope `context` belongs to, in tree order
    pub fn tree_nodes(&self, context: NodeId) -> Vec<NodeId> {
        let tops: Vec<NodeId> = match self.scope(context) {
            Ok(TreeScope::Document) => vec![self.root],
            Ok(TreeScope::Shadow(host)) => self
                .shadow_root(host)
                .map(|s| s.children.clone())
                .unwrap_or_default(),
            Ok(TreeScope::Detached(top)) => vec![top],
            Err(_) => Vec::new(),
        };
        tops.into_iter()
            .flat_map(|top| std::iter::once(top).chain(self.descendants(top)))
            .collect()
    }

    /// Text of all descendant text nodes, whitespace-collapsed
    pub fn text_content(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        if let Some(NodeKind::Text(text)) = self.nodes.get(id).map(|n| &n.kind) {
            parts.push(text.as_str());
        }
        for node in self.descendants(id) {
            if let Some(NodeKind::Text(text)) = self.nodes.get(node).map(|n| &n.kind) {
                parts.push(text.as_str());
            }
        }
        parts
            .iter()
            .flat_map(|p| p.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `<iframe>` / `<frame>` elements own their own browsing context
    pub fn is_frame_boundary(&self, id: NodeId) -> bool {
        matches!(self.tag_name(id), Some("iframe" | "frame"))
    }

    /// Short human-readable selector (`tag#id.class`); not unique, never a key
    pub fn selector_hint(&self, id: NodeId) -> String {
        let Some(tag) = self.tag_name(id) else {
            return id.to_string();
        };
        let mut hint = tag.to_string();
        if let Some(element_id) = self.attribute(id, "id").filter(|v| !v.is_empty()) {
            hint.push('#');
            hint.push_str(element_id);
        }
        if let Some(class) = self.attribute(id, "class") {
            for token in class.split_whitespace() {
                hint.push('.');
                hint.push_str(token);
            }
        }
        hint
    }

    // ------------------------------------------------------------------
    // Focus
    // ------------------------------------------------------------------

    /// Move DOM focus; only connected elements can be focused
    pub fn focus(&mut self, id: NodeId) -> Result<(), DomError> {
        self.element(id)?;
        if !self.is_connected(id) {
            return Err(DomError::HierarchyRequest(format!("{id} is not connected")));
        }
        self.active = Some(id);
        Ok(())
    }

    pub fn blur(&mut self) {
        self.active = None;
    }

    pub fn active_element(&self) -> Option<NodeId> {
        self.active.filter(|&a| self.contains(a))
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    /// Subscribe to attribute mutations on `target`
    pub fn observe(
        &mut self,
        target: NodeId,
        init: MutationObserverInit,
        callback: MutationCallback,
    ) -> Result<SubscriptionId, DomError> {
        self.element(target)?;
        Ok(self.observers.add(target, init, callback))
    }

    /// Drop a subscription; returns false when it was already gone
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.remove(id)
    }

    pub fn subscription_count(&self) -> usize {
        self.observers.len()
    }
}

/// Composed-tree ancestor iterator
#[derive(Debug)]
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.composed_parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_and_lookup() {
        let mut doc = Document::new();
        let host = doc.create_element("x-widget");
        doc.append_child(doc.body(), host).unwrap();
        doc.attach_shadow(host, ShadowRootMode::Open).unwrap();
        let inner = doc.create_element("button");
        doc.set_attribute(inner, "id", "inner").unwrap();
        doc.append_shadow_child(host, inner).unwrap();

        assert_eq!(doc.scope(host).unwrap(), TreeScope::Document);
        assert_eq!(doc.scope(inner).unwrap(), TreeScope::Shadow(host));
        assert!(doc.is_connected(inner));
        assert_eq!(doc.get_element_by_id(doc.body(), "inner"), None);
        assert_eq!(doc.get_element_by_id(inner, "inner"), Some(inner));
    }

    #[test]
    fn test_remove_invalidates_subtree() {
        let mut doc = Document::new();
        let list = doc.create_element("ul");
        let item = doc.create_element("li");
        doc.append_child(doc.body(), list).unwrap();
        doc.append_child(list, item).unwrap();
        doc.focus(item).unwrap();

        doc.remove(list).unwrap();
        assert!(!doc.contains(list));
        assert!(!doc.contains(item));
        assert_eq!(doc.active_element(), None);
        assert!(doc.children(doc.body()).is_empty());
    }

    #[test]
    fn test_cycle_rejected() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append_child(outer, inner).unwrap();
        assert!(matches!(doc.append_child(inner, outer), Err(DomError::HierarchyRequest(_))));
    }

    #[test]
    fn test_text_content_collapses_whitespace() {
        let mut doc = Document::new();
        let button = doc.create_element("button");
        let a = doc.create_text("  Save \n");
        let b = doc.create_text(" draft ");
        doc.append_child(button, a).unwrap();
        doc.append_child(button, b).unwrap();
        assert_eq!(doc.text_content(button), "Save draft");
    }

    #[test]
    fn test_selector_hint() {
        let mut doc = Document::new();
        let el = doc.create_element("INPUT");
        doc.set_attribute(el, "id", "email").unwrap();
        doc.set_attribute(el, "class", "field wide").unwrap();
        assert_eq!(doc.selector_hint(el), "input#email.field.wide");
    }
}
