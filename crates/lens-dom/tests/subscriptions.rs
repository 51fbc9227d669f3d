//! Attribute subscription tests for lens-dom

use std::cell::RefCell;
use std::rc::Rc;

use lens_dom::*;

fn recorder() -> (Rc<RefCell<Vec<AttributeChanged>>>, MutationCallback) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    (log, Rc::new(move |record| sink.borrow_mut().push(record)))
}

// ============================================================================
// FILTERING
// ============================================================================

#[test]
fn test_filtered_attributes_are_delivered() {
    let mut doc = Document::new();
    let button = doc.create_element("button");
    doc.append_child(doc.body(), button).unwrap();

    let (log, callback) = recorder();
    doc.observe(button, MutationObserverInit::attributes(&["aria-pressed"]), callback)
        .unwrap();

    doc.set_attribute(button, "class", "primary").unwrap();
    doc.set_attribute(button, "aria-pressed", "true").unwrap();

    let records = log.borrow();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].target, button);
    assert_eq!(records[0].attribute_name, "aria-pressed");
    assert_eq!(records[0].old_value, None);
}

#[test]
fn test_old_value_reported() {
    let mut doc = Document::new();
    let button = doc.create_element("button");
    doc.set_attribute(button, "aria-pressed", "false").unwrap();

    let (log, callback) = recorder();
    doc.observe(button, MutationObserverInit::default(), callback).unwrap();
    doc.set_attribute(button, "aria-pressed", "true").unwrap();
    doc.remove_attribute(button, "aria-pressed").unwrap();
    doc.remove_attribute(button, "aria-pressed").unwrap();

    let records = log.borrow();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].old_value.as_deref(), Some("false"));
    assert_eq!(records[1].old_value.as_deref(), Some("true"));
}

// ============================================================================
// SUBTREE
// ============================================================================

#[test]
fn test_subtree_observation_sees_descendants() {
    let mut doc = Document::new();
    let select = doc.create_element("select");
    let option = doc.create_element("option");
    doc.append_child(doc.body(), select).unwrap();
    doc.append_child(select, option).unwrap();

    let (flat_log, flat) = recorder();
    let (deep_log, deep) = recorder();
    doc.observe(select, MutationObserverInit::attributes(&["selected"]), flat).unwrap();
    doc.observe(select, MutationObserverInit::attributes(&["selected"]).with_subtree(), deep)
        .unwrap();

    doc.set_attribute(option, "selected", "").unwrap();

    assert!(flat_log.borrow().is_empty());
    let deep = deep_log.borrow();
    assert_eq!(deep.len(), 1);
    assert_eq!(deep[0].target, option);
    assert_eq!(deep[0].observed, select);
}

// ============================================================================
// LIFECYCLE
// ============================================================================

#[test]
fn test_unsubscribe_stops_delivery() {
    let mut doc = Document::new();
    let input = doc.create_element("input");
    let (log, callback) = recorder();
    let id = doc.observe(input, MutationObserverInit::default(), callback).unwrap();

    assert!(doc.unsubscribe(id));
    assert!(!doc.unsubscribe(id));
    doc.set_attribute(input, "disabled", "").unwrap();
    assert!(log.borrow().is_empty());
}

#[test]
fn test_removal_drops_subscriptions() {
    let mut doc = Document::new();
    let input = doc.create_element("input");
    doc.append_child(doc.body(), input).unwrap();
    let (_log, callback) = recorder();
    doc.observe(input, MutationObserverInit::default(), callback).unwrap();
    assert_eq!(doc.subscription_count(), 1);

    doc.remove(input).unwrap();
    assert_eq!(doc.subscription_count(), 0);
    assert_eq!(doc.set_attribute(input, "disabled", ""), Err(DomError::StaleNode(input)));
}
