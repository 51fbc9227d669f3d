//! Normalization
//!
//! Reconciles a provider result with the live DOM before it is cached or
//! presented.

use std::collections::BTreeMap;

use lens_dom::{Document, NodeId};

use crate::aria::is_native_checkbox;
use crate::info::{AccessibilityInfo, StateValue};
use crate::inspect::derive_group;
use crate::response::ProviderResponse;

/// States dropped from every snapshot
const STRIPPED_STATES: [&str; 2] = ["describedby", "url"];

/// ARIA properties dropped from every snapshot
const STRIPPED_PROPERTIES: [&str; 1] = ["aria-describedby"];

/// Remove fields that lead to recursive description lookups
pub fn strip_recursive_fields(info: &mut AccessibilityInfo) {
    for state in STRIPPED_STATES {
        info.states.remove(state);
    }
    for property in STRIPPED_PROPERTIES {
        info.aria_properties.remove(property);
    }
}

/// `states.expanded` if present, else `aria-expanded`, else `None`
pub fn normalized_expanded(
    states: &BTreeMap<String, StateValue>,
    aria_properties: &BTreeMap<String, String>,
) -> Option<bool> {
    if let Some(StateValue::Bool(expanded)) = states.get("expanded") {
        return Some(*expanded);
    }
    match aria_properties.get("aria-expanded").map(|v| v.trim()) {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    }
}

/// Overwrite `checked` on native checkboxes with the live DOM properties.
///
/// `indeterminate` wins over `checked`. A reflected `aria-checked` is
/// rewritten to agree so the snapshot never carries both values.
pub fn apply_native_checkbox(doc: &Document, element: NodeId, info: &mut AccessibilityInfo) {
    if !is_native_checkbox(doc, element) {
        return;
    }
    let checked = if doc.indeterminate(element) {
        StateValue::Mixed
    } else {
        StateValue::Bool(doc.checked(element))
    };
    info.states.insert("checked".into(), checked);
    if let Some(reflected) = info.aria_properties.get_mut("aria-checked") {
        *reflected = checked.as_token().to_string();
    }
}

/// Full pipeline for a successful provider response
pub fn normalize_provider_result(doc: &Document, element: NodeId, response: &ProviderResponse) -> AccessibilityInfo {
    let mut info = response.to_info();
    strip_recursive_fields(&mut info);
    info.normalized_expanded = normalized_expanded(&info.states, &info.aria_properties);
    apply_native_checkbox(doc, element, &mut info);
    if info.group.is_none() {
        info.group = derive_group(doc, element);
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expanded_prefers_states() {
        let mut states = BTreeMap::new();
        let mut props = BTreeMap::new();
        props.insert("aria-expanded".to_string(), "true".to_string());
        assert_eq!(normalized_expanded(&states, &props), Some(true));

        states.insert("expanded".to_string(), StateValue::Bool(false));
        assert_eq!(normalized_expanded(&states, &props), Some(false));

        assert_eq!(normalized_expanded(&BTreeMap::new(), &BTreeMap::new()), None);
    }

    #[test]
    fn test_strip_recursive_fields() {
        let mut info = AccessibilityInfo::empty();
        info.states.insert("describedby".into(), StateValue::Bool(true));
        info.states.insert("url".into(), StateValue::Bool(true));
        info.states.insert("disabled".into(), StateValue::Bool(true));
        info.aria_properties.insert("aria-describedby".into(), "hint".into());

        strip_recursive_fields(&mut info);
        assert_eq!(info.states.len(), 1);
        assert!(info.aria_properties.is_empty());
    }
}
