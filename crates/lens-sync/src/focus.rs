//! Focus Tracking
//!
//! State machine owning the element currently of interest. It filters focus
//! churn (presenter self-focus, frame boundaries, the engine's own programmatic
//! refocus) and resolves the active-descendant pattern. Side effects are left
//! to the caller through the returned [`FocusTransition`].

use lens_dom::{Document, NodeId};

/// Tracked focus state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FocusState {
    /// Element holding DOM focus
    pub last_focused: Option<NodeId>,
    /// Element whose snapshot is fetched and shown
    pub inspected: Option<NodeId>,
    /// Swallow the next focus-in (set before a programmatic refocus)
    pub suppress_next_focus_in: bool,
}

/// Phase derived from [`FocusState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPhase {
    Idle,
    Focused(NodeId),
    FocusedComposite {
        container: NodeId,
        active_descendant: NodeId,
    },
}

impl FocusState {
    pub fn phase(&self) -> FocusPhase {
        match (self.last_focused, self.inspected) {
            (Some(container), Some(active_descendant)) if container != active_descendant => {
                FocusPhase::FocusedComposite {
                    container,
                    active_descendant,
                }
            }
            (_, Some(target)) => FocusPhase::Focused(target),
            (_, None) => FocusPhase::Idle,
        }
    }
}

/// Keyboard input relevant to tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Escape,
    ShiftEscape,
    Other,
}

/// What the caller must do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTransition {
    /// Nothing changed
    Unchanged,
    /// Start inspecting `target`; observe `container`
    Enter { container: NodeId, target: NodeId },
    /// Back to idle: hide, cancel timers, detach observation
    Leave,
}

/// Focus tracker
#[derive(Debug, Default)]
pub struct FocusTracker {
    state: FocusState,
}

impl FocusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FocusState {
        self.state
    }

    pub fn phase(&self) -> FocusPhase {
        self.state.phase()
    }

    pub fn inspected(&self) -> Option<NodeId> {
        self.state.inspected
    }

    pub fn last_focused(&self) -> Option<NodeId> {
        self.state.last_focused
    }

    /// Whether a result for `element` may still be presented
    pub fn is_current(&self, element: NodeId) -> bool {
        self.state.inspected == Some(element)
    }

    /// Swallow the next focus-in
    pub fn suppress_next_focus_in(&mut self) {
        self.state.suppress_next_focus_in = true;
    }

    pub fn reset(&mut self) {
        self.state = FocusState::default();
    }

    /// Focus moved to `element`
    pub fn focus_in(&mut self, doc: &Document, element: NodeId, surface: Option<NodeId>) -> FocusTransition {
        if surface.is_some_and(|s| doc.is_composed_inclusive_ancestor(s, element)) {
            tracing::trace!(element = %element, "focus inside presenter surface ignored");
            return FocusTransition::Unchanged;
        }
        if doc.is_frame_boundary(element) {
            tracing::debug!(element = %element, "focus entered a child frame");
            self.state.last_focused = None;
            self.state.inspected = None;
            return FocusTransition::Leave;
        }
        if self.state.suppress_next_focus_in {
            self.state.suppress_next_focus_in = false;
            tracing::debug!(element = %element, "suppressed focus-in after programmatic refocus");
            return FocusTransition::Unchanged;
        }
        self.enter(doc, element)
    }

    /// Focus left `element`; `related` is where it went, if anywhere
    pub fn focus_out(&mut self, related: Option<NodeId>) -> FocusTransition {
        if related.is_some() {
            // The matching focus-in drives the transition.
            return FocusTransition::Unchanged;
        }
        self.state.last_focused = None;
        self.state.inspected = None;
        FocusTransition::Leave
    }

    pub fn key(&mut self, doc: &Document, key: KeyInput, surface: Option<NodeId>) -> FocusTransition {
        match key {
            KeyInput::Escape => {
                self.state.inspected = None;
                FocusTransition::Leave
            }
            KeyInput::ShiftEscape => {
                let in_surface = |id: NodeId| surface.is_some_and(|s| doc.is_composed_inclusive_ancestor(s, id));
                let target = doc
                    .active_element()
                    .filter(|&id| !in_surface(id))
                    .or(self.state.last_focused)
                    .filter(|&id| doc.is_element(id) && !doc.is_frame_boundary(id));
                match target {
                    Some(element) => self.enter(doc, element),
                    None => FocusTransition::Unchanged,
                }
            }
            KeyInput::Other => FocusTransition::Unchanged,
        }
    }

    /// `aria-activedescendant` changed on `container`
    pub fn redirect(&mut self, doc: &Document, container: NodeId) -> FocusTransition {
        if self.state.last_focused != Some(container) || self.state.inspected.is_none() {
            return FocusTransition::Unchanged;
        }
        let target = resolve_active_descendant(doc, container).unwrap_or(container);
        if self.state.inspected == Some(target) {
            return FocusTransition::Unchanged;
        }
        tracing::debug!(container = %container, target = %target, "active descendant changed");
        self.state.inspected = Some(target);
        FocusTransition::Enter { container, target }
    }

    fn enter(&mut self, doc: &Document, container: NodeId) -> FocusTransition {
        let target = resolve_active_descendant(doc, container).unwrap_or(container);
        self.state.last_focused = Some(container);
        self.state.inspected = Some(target);
        FocusTransition::Enter { container, target }
    }
}

/// Resolve `aria-activedescendant` within the container's tree scope
pub fn resolve_active_descendant(doc: &Document, container: NodeId) -> Option<NodeId> {
    let id = doc.attribute(container, "aria-activedescendant")?.trim();
    if id.is_empty() {
        return None;
    }
    doc.get_element_by_id(container, id).filter(|&el| doc.is_element(el))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lens_dom::ShadowRootMode;

    fn listbox(doc: &mut Document) -> (NodeId, NodeId, NodeId) {
        let list = doc.create_element("div");
        doc.set_attribute(list, "role", "listbox").unwrap();
        let first = doc.create_element("div");
        doc.set_attribute(first, "id", "opt-1").unwrap();
        let second = doc.create_element("div");
        doc.set_attribute(second, "id", "opt-2").unwrap();
        doc.append_child(doc.body(), list).unwrap();
        doc.append_child(list, first).unwrap();
        doc.append_child(list, second).unwrap();
        (list, first, second)
    }

    #[test]
    fn test_plain_focus() {
        let mut doc = Document::new();
        let button = doc.create_element("button");
        doc.append_child(doc.body(), button).unwrap();

        let mut tracker = FocusTracker::new();
        assert_eq!(tracker.phase(), FocusPhase::Idle);
        assert_eq!(
            tracker.focus_in(&doc, button, None),
            FocusTransition::Enter {
                container: button,
                target: button
            }
        );
        assert_eq!(tracker.phase(), FocusPhase::Focused(button));
        assert!(tracker.is_current(button));
    }

    #[test]
    fn test_active_descendant_resolution() {
        let mut doc = Document::new();
        let (list, first, second) = listbox(&mut doc);
        doc.set_attribute(list, "aria-activedescendant", "opt-1").unwrap();

        let mut tracker = FocusTracker::new();
        tracker.focus_in(&doc, list, None);
        assert_eq!(
            tracker.phase(),
            FocusPhase::FocusedComposite {
                container: list,
                active_descendant: first
            }
        );

        doc.set_attribute(list, "aria-activedescendant", "opt-2").unwrap();
        assert_eq!(
            tracker.redirect(&doc, list),
            FocusTransition::Enter {
                container: list,
                target: second
            }
        );
        assert_eq!(tracker.redirect(&doc, list), FocusTransition::Unchanged);
    }

    #[test]
    fn test_unresolvable_descendant_falls_back_to_container() {
        let mut doc = Document::new();
        let (list, _, _) = listbox(&mut doc);
        doc.set_attribute(list, "aria-activedescendant", "missing").unwrap();

        let mut tracker = FocusTracker::new();
        tracker.focus_in(&doc, list, None);
        assert_eq!(tracker.phase(), FocusPhase::Focused(list));
    }

    #[test]
    fn test_descendant_resolved_in_shadow_scope() {
        let mut doc = Document::new();
        let host = doc.create_element("x-combo");
        doc.append_child(doc.body(), host).unwrap();
        doc.attach_shadow(host, ShadowRootMode::Open).unwrap();
        let input = doc.create_element("input");
        doc.set_attribute(input, "aria-activedescendant", "opt").unwrap();
        let option = doc.create_element("div");
        doc.set_attribute(option, "id", "opt").unwrap();
        doc.append_shadow_child(host, input).unwrap();
        doc.append_shadow_child(host, option).unwrap();

        let decoy = doc.create_element("div");
        doc.set_attribute(decoy, "id", "opt").unwrap();
        doc.append_child(doc.body(), decoy).unwrap();

        assert_eq!(resolve_active_descendant(&doc, input), Some(option));
    }

    #[test]
    fn test_surface_and_frame_filtering() {
        let mut doc = Document::new();
        let button = doc.create_element("button");
        let tooltip = doc.create_element("div");
        let close = doc.create_element("button");
        let frame = doc.create_element("iframe");
        doc.append_child(doc.body(), button).unwrap();
        doc.append_child(doc.body(), tooltip).unwrap();
        doc.append_child(tooltip, close).unwrap();
        doc.append_child(doc.body(), frame).unwrap();

        let mut tracker = FocusTracker::new();
        tracker.focus_in(&doc, button, Some(tooltip));
        assert_eq!(tracker.focus_in(&doc, close, Some(tooltip)), FocusTransition::Unchanged);
        assert!(tracker.is_current(button));

        assert_eq!(tracker.focus_in(&doc, frame, Some(tooltip)), FocusTransition::Leave);
        assert_eq!(tracker.phase(), FocusPhase::Idle);
    }

    #[test]
    fn test_suppression_consumed_once() {
        let mut doc = Document::new();
        let button = doc.create_element("button");
        doc.append_child(doc.body(), button).unwrap();

        let mut tracker = FocusTracker::new();
        tracker.suppress_next_focus_in();
        assert_eq!(tracker.focus_in(&doc, button, None), FocusTransition::Unchanged);
        assert!(!tracker.state().suppress_next_focus_in);
        assert!(matches!(tracker.focus_in(&doc, button, None), FocusTransition::Enter { .. }));
    }

    #[test]
    fn test_focus_out_and_escape() {
        let mut doc = Document::new();
        let a = doc.create_element("button");
        let b = doc.create_element("button");
        doc.append_child(doc.body(), a).unwrap();
        doc.append_child(doc.body(), b).unwrap();

        let mut tracker = FocusTracker::new();
        tracker.focus_in(&doc, a, None);
        assert_eq!(tracker.focus_out(Some(b)), FocusTransition::Unchanged);
        assert!(tracker.is_current(a));

        assert_eq!(tracker.key(&doc, KeyInput::Escape, None), FocusTransition::Leave);
        assert_eq!(tracker.phase(), FocusPhase::Idle);
        assert_eq!(tracker.last_focused(), Some(a));

        // Shift+Escape falls back to the last tracked element.
        assert_eq!(
            tracker.key(&doc, KeyInput::ShiftEscape, None),
            FocusTransition::Enter { container: a, target: a }
        );

        assert_eq!(tracker.focus_out(None), FocusTransition::Leave);
        assert_eq!(tracker.state(), FocusState::default());
    }

    #[test]
    fn test_shift_escape_prefers_active_element() {
        let mut doc = Document::new();
        let a = doc.create_element("button");
        let b = doc.create_element("button");
        doc.append_child(doc.body(), a).unwrap();
        doc.append_child(doc.body(), b).unwrap();
        doc.focus(b).unwrap();

        let mut tracker = FocusTracker::new();
        tracker.focus_in(&doc, a, None);
        tracker.key(&doc, KeyInput::Escape, None);
        assert_eq!(
            tracker.key(&doc, KeyInput::ShiftEscape, None),
            FocusTransition::Enter { container: b, target: b }
        );
    }
}
