//! Local DOM Inspection
//!
//! Best-effort snapshot computed from the DOM alone. Used for targets the
//! provider cannot reach (shadow trees without a bridge) and when every
//! provider attempt failed.
//!
//! Role: explicit `role` → implicit by tag/type.
//! Name: `aria-labelledby` / `aria-label` → associated `<label>` → text
//! content → `alt` / `title`.

use std::collections::BTreeMap;

use lens_dom::{Document, NodeId};

use crate::aria::{effective_role, is_multi_select, AriaRole};
use crate::info::{or_sentinel, AccessibilityInfo, GroupInfo, StateValue, NO_DESCRIPTION, NO_NAME, NO_ROLE, NO_VALUE};
use crate::normalize::{apply_native_checkbox, normalized_expanded, strip_recursive_fields};
use crate::InspectError;

/// Inspect a live element
pub fn inspect_element(doc: &Document, element: NodeId) -> Result<AccessibilityInfo, InspectError> {
    if !doc.contains(element) {
        return Err(InspectError::Detached(element));
    }
    if !doc.is_element(element) {
        return Err(InspectError::NotAnElement(element));
    }

    let role = effective_role(doc, element);
    let (name, name_from_title) = match accessible_name(doc, element, role) {
        Some((name, source)) => (Some(name), source == NameSource::Title),
        None => (None, false),
    };
    let description = accessible_description(doc, element, name_from_title);

    let mut info = AccessibilityInfo {
        role: role.map_or_else(|| NO_ROLE.to_string(), |r| r.as_str().to_string()),
        name: or_sentinel(name.as_deref(), NO_NAME),
        description: or_sentinel(description.as_deref(), NO_DESCRIPTION),
        value: or_sentinel(element_value(doc, element, role).as_deref(), NO_VALUE),
        states: collect_states(doc, element, role),
        aria_properties: reflected_aria(doc, element),
        normalized_expanded: None,
        ignored: false,
        ignored_reasons: Vec::new(),
        group: derive_group(doc, element),
    };

    if doc.attribute(element, "aria-hidden") == Some("true") {
        info.ignored_reasons.push("ariaHiddenElement".into());
    }
    if doc.has_attribute(element, "hidden") {
        info.ignored_reasons.push("notRendered".into());
    }
    if role == Some(AriaRole::Presentation) {
        info.ignored_reasons.push("presentationalRole".into());
    }
    info.ignored = !info.ignored_reasons.is_empty();

    strip_recursive_fields(&mut info);
    info.normalized_expanded = normalized_expanded(&info.states, &info.aria_properties);
    apply_native_checkbox(doc, element, &mut info);
    Ok(info)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameSource {
    Aria,
    Label,
    Content,
    Alt,
    Title,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Text of the elements referenced by an IDREF list, resolved in `context`'s tree
fn referenced_text(doc: &Document, context: NodeId, idrefs: &str) -> Option<String> {
    let parts: Vec<String> = idrefs
        .split_whitespace()
        .filter_map(|id| doc.get_element_by_id(context, id))
        .filter_map(|target| {
            non_empty(doc.attribute(target, "aria-label")).or_else(|| non_empty(Some(doc.text_content(target).as_str())))
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join(" "))
}

fn associated_label(doc: &Document, element: NodeId) -> Option<String> {
    if let Some(id) = doc.attribute(element, "id").filter(|id| !id.is_empty()) {
        let label = doc
            .tree_nodes(element)
            .into_iter()
            .find(|&n| doc.tag_name(n) == Some("label") && doc.attribute(n, "for") == Some(id));
        if let Some(text) = label.and_then(|l| non_empty(Some(doc.text_content(l).as_str()))) {
            return Some(text);
        }
    }
    let wrapping = std::iter::successors(doc.parent(element), |&n| doc.parent(n))
        .find(|&n| doc.tag_name(n) == Some("label"))?;
    non_empty(Some(doc.text_content(wrapping).as_str()))
}

fn accessible_name(doc: &Document, element: NodeId, role: Option<AriaRole>) -> Option<(String, NameSource)> {
    if let Some(name) = doc
        .attribute(element, "aria-labelledby")
        .and_then(|ids| referenced_text(doc, element, ids))
    {
        return Some((name, NameSource::Aria));
    }
    if let Some(name) = non_empty(doc.attribute(element, "aria-label")) {
        return Some((name, NameSource::Aria));
    }
    let labelable = matches!(
        doc.tag_name(element),
        Some("input" | "select" | "textarea" | "button" | "meter" | "progress")
    );
    if labelable {
        if let Some(name) = associated_label(doc, element) {
            return Some((name, NameSource::Label));
        }
    }
    if doc.tag_name(element) == Some("input") {
        let input_type = doc.attribute(element, "type").unwrap_or("").trim().to_ascii_lowercase();
        let fallback = match input_type.as_str() {
            "submit" => Some("Submit"),
            "reset" => Some("Reset"),
            _ => None,
        };
        if matches!(input_type.as_str(), "button" | "submit" | "reset") {
            if let Some(name) = non_empty(doc.attribute(element, "value")).or(fallback.map(str::to_string)) {
                return Some((name, NameSource::Content));
            }
        }
    }
    if role.map_or(true, |r| r.name_from_content()) {
        if let Some(name) = non_empty(Some(doc.text_content(element).as_str())) {
            return Some((name, NameSource::Content));
        }
    }
    if let Some(name) = non_empty(doc.attribute(element, "alt")) {
        return Some((name, NameSource::Alt));
    }
    if let Some(name) = non_empty(doc.attribute(element, "title")) {
        return Some((name, NameSource::Title));
    }
    non_empty(doc.attribute(element, "placeholder")).map(|p| (p, NameSource::Title))
}

fn accessible_description(doc: &Document, element: NodeId, title_used_for_name: bool) -> Option<String> {
    doc.attribute(element, "aria-describedby")
        .and_then(|ids| referenced_text(doc, element, ids))
        .or_else(|| non_empty(doc.attribute(element, "aria-description")))
        .or_else(|| {
            if title_used_for_name {
                None
            } else {
                non_empty(doc.attribute(element, "title"))
            }
        })
}

fn element_value(doc: &Document, element: NodeId, role: Option<AriaRole>) -> Option<String> {
    if role.is_some_and(|r| r.is_range()) {
        if let Some(text) = non_empty(doc.attribute(element, "aria-valuetext")) {
            return Some(text);
        }
        if let Some(now) = non_empty(doc.attribute(element, "aria-valuenow")) {
            return Some(now);
        }
    }
    match doc.tag_name(element)? {
        "select" => {
            let selected: Vec<String> = doc
                .descendants(element)
                .into_iter()
                .filter(|&n| doc.tag_name(n) == Some("option") && doc.has_attribute(n, "selected"))
                .filter_map(|n| non_empty(Some(doc.text_content(n).as_str())))
                .collect();
            (!selected.is_empty()).then(|| selected.join(", "))
        }
        "input" => {
            let input_type = doc.attribute(element, "type").unwrap_or("").trim().to_ascii_lowercase();
            if matches!(
                input_type.as_str(),
                "checkbox" | "radio" | "button" | "submit" | "reset" | "image" | "hidden"
            ) {
                None
            } else {
                non_empty(doc.value(element))
            }
        }
        "textarea" | "progress" | "meter" => non_empty(doc.value(element)),
        _ => None,
    }
}

fn aria_flag(doc: &Document, element: NodeId, attribute: &str) -> bool {
    doc.attribute(element, attribute).is_some_and(|v| v.trim() == "true")
}

fn collect_states(doc: &Document, element: NodeId, role: Option<AriaRole>) -> BTreeMap<String, StateValue> {
    let mut states = BTreeMap::new();
    let mut flag = |name: &str, on: bool| {
        if on {
            states.insert(name.to_string(), StateValue::Bool(true));
        }
    };
    flag("disabled", doc.has_attribute(element, "disabled") || aria_flag(doc, element, "aria-disabled"));
    flag("required", doc.has_attribute(element, "required") || aria_flag(doc, element, "aria-required"));
    flag("readonly", doc.has_attribute(element, "readonly") || aria_flag(doc, element, "aria-readonly"));
    flag("busy", aria_flag(doc, element, "aria-busy"));
    flag("multiselectable", is_multi_select(doc, element));
    flag(
        "selected",
        aria_flag(doc, element, "aria-selected")
            || (doc.tag_name(element) == Some("option") && doc.has_attribute(element, "selected")),
    );
    flag(
        "invalid",
        doc.attribute(element, "aria-invalid")
            .is_some_and(|v| !matches!(v.trim(), "" | "false")),
    );

    let native_checkable = doc.tag_name(element) == Some("input")
        && doc
            .attribute(element, "type")
            .is_some_and(|t| matches!(t.trim().to_ascii_lowercase().as_str(), "checkbox" | "radio"));
    if native_checkable {
        states.insert("checked".into(), StateValue::Bool(doc.checked(element)));
    } else if let Some(checked) = doc.attribute(element, "aria-checked").and_then(StateValue::parse) {
        states.insert("checked".into(), checked);
    } else if role.is_some_and(|r| r.is_checkable()) {
        states.insert("checked".into(), StateValue::Bool(false));
    }
    if let Some(pressed) = doc.attribute(element, "aria-pressed").and_then(StateValue::parse) {
        states.insert("pressed".into(), pressed);
    }
    if let Some(expanded) = doc.attribute(element, "aria-expanded").and_then(StateValue::parse) {
        states.insert("expanded".into(), expanded);
    }
    states
}

fn reflected_aria(doc: &Document, element: NodeId) -> BTreeMap<String, String> {
    doc.attributes(element)
        .filter(|(name, _)| name.starts_with("aria-"))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// Nearest grouping ancestor: `<fieldset>` (labelled by its `<legend>`) or
/// an element with role `group` / `radiogroup`.
pub fn derive_group(doc: &Document, element: NodeId) -> Option<GroupInfo> {
    for ancestor in doc.ancestors(element) {
        if !doc.is_element(ancestor) {
            continue;
        }
        if doc.tag_name(ancestor) == Some("fieldset") && doc.attribute(ancestor, "role").is_none() {
            let label = doc
                .children(ancestor)
                .iter()
                .find(|&&c| doc.tag_name(c) == Some("legend"))
                .and_then(|&legend| non_empty(Some(doc.text_content(legend).as_str())))
                .or_else(|| non_empty(doc.attribute(ancestor, "aria-label")));
            return Some(GroupInfo {
                role: AriaRole::Group.as_str().to_string(),
                label,
            });
        }
        if let Some(role) = crate::aria::explicit_role(doc, ancestor).filter(|r| r.is_grouping()) {
            let label = doc
                .attribute(ancestor, "aria-labelledby")
                .and_then(|ids| referenced_text(doc, ancestor, ids))
                .or_else(|| non_empty(doc.attribute(ancestor, "aria-label")));
            return Some(GroupInfo {
                role: role.as_str().to_string(),
                label,
            });
        }
    }
    None
}
