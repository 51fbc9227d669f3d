//! Scenario format
//!
//! ```json
//! {
//!   "config": { "mutation_debounce": 150 },
//!   "document": [
//!     { "tag": "button", "ref": "save", "attributes": { "aria-pressed": "false" }, "children": ["Save"] }
//!   ],
//!   "steps": [
//!     { "type": "focus", "target": "save" },
//!     { "type": "wait", "ms": 200 },
//!     { "type": "set-attribute", "target": "save", "name": "aria-pressed", "value": "true" }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result, anyhow};
use lens_dom::{Document, NodeId, ShadowRootMode};
use lens_sync::SyncConfig;
use serde::Deserialize;

/// Replay scenario
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: SyncConfig,
    /// This document's frame id
    #[serde(default)]
    pub frame: u64,
    /// Simulated provider latency per call
    #[serde(default)]
    pub provider_latency_ms: u64,
    /// Children of `<body>`
    pub document: Vec<NodeSpec>,
    pub steps: Vec<Step>,
    /// Executor time after the last step
    #[serde(default = "default_trailing_wait")]
    pub trailing_wait_ms: u64,
}

fn default_trailing_wait() -> u64 {
    500
}

/// Node in the initial document
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    Text(String),
    Element(ElementSpec),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ElementSpec {
    pub tag: String,
    /// Name steps use to address this element
    #[serde(default, rename = "ref")]
    pub handle: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
    /// Open shadow root content
    #[serde(default)]
    pub shadow: Option<Vec<NodeSpec>>,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub indeterminate: bool,
    #[serde(default)]
    pub value: Option<String>,
}

/// Key names accepted by `key` steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum KeyName {
    Escape,
    #[serde(rename = "Shift+Escape")]
    ShiftEscape,
    #[serde(other)]
    Other,
}

/// Scenario step
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Step {
    /// Move DOM focus and deliver focus-in
    Focus { target: String },
    /// Deliver focus-out; no `related` means focus left the document
    Blur {
        #[serde(default)]
        related: Option<String>,
    },
    Key { key: KeyName },
    SetAttribute { target: String, name: String, value: String },
    RemoveAttribute { target: String, name: String },
    SetChecked { target: String, checked: bool },
    SetIndeterminate { target: String, indeterminate: bool },
    Remove { target: String },
    Wait { ms: u64 },
    Dismiss,
    RemoteShown { frame: u64 },
    Enable,
    Disable,
    /// Call `get_accessible_info` directly and record the result
    Query {
        target: String,
        #[serde(default)]
        force: bool,
    },
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid scenario")
    }
}

/// Document built from a scenario with its element names
#[derive(Debug)]
pub struct BuiltDocument {
    pub document: Document,
    handles: HashMap<String, NodeId>,
}

impl BuiltDocument {
    pub fn build(nodes: &[NodeSpec]) -> Result<Self> {
        let mut built = Self {
            document: Document::new(),
            handles: HashMap::new(),
        };
        let body = built.document.body();
        for node in nodes {
            let id = built.create(node)?;
            built.document.append_child(body, id)?;
        }
        Ok(built)
    }

    fn create(&mut self, spec: &NodeSpec) -> Result<NodeId> {
        let element = match spec {
            NodeSpec::Text(text) => return Ok(self.document.create_text(text)),
            NodeSpec::Element(element) => element,
        };
        let doc = &mut self.document;
        let id = doc.create_element(&element.tag);
        for (name, value) in &element.attributes {
            doc.set_attribute(id, name, value)?;
        }
        if element.checked {
            doc.set_checked(id, true)?;
        }
        if element.indeterminate {
            doc.set_indeterminate(id, true)?;
        }
        if let Some(value) = &element.value {
            doc.set_value(id, value)?;
        }

        for child in &element.children {
            let child = self.create(child)?;
            self.document.append_child(id, child)?;
        }
        if let Some(shadow) = &element.shadow {
            self.document.attach_shadow(id, ShadowRootMode::Open)?;
            for child in shadow {
                let child = self.create(child)?;
                self.document.append_shadow_child(id, child)?;
            }
        }

        if let Some(handle) = &element.handle {
            if self.handles.insert(handle.clone(), id).is_some() {
                return Err(anyhow!("duplicate ref {handle:?}"));
            }
        }
        Ok(id)
    }

    pub fn resolve(&self, target: &str) -> Result<NodeId> {
        self.targets().resolve(&self.document, target)
    }

    fn targets(&self) -> Targets {
        Targets {
            by_name: self.handles.clone(),
            by_node: self.handles.iter().map(|(name, &id)| (id, name.clone())).collect(),
        }
    }

    pub fn into_parts(self) -> (Document, Targets) {
        let targets = self.targets();
        (self.document, targets)
    }
}

/// Step target names
#[derive(Debug, Clone, Default)]
pub struct Targets {
    by_name: HashMap<String, NodeId>,
    by_node: HashMap<NodeId, String>,
}

impl Targets {
    /// A `ref` name, else `#id` in the document scope
    pub fn resolve(&self, doc: &Document, target: &str) -> Result<NodeId> {
        if let Some(&id) = self.by_name.get(target) {
            return Ok(id);
        }
        target
            .strip_prefix('#')
            .and_then(|id| doc.get_element_by_id(doc.root(), id))
            .ok_or_else(|| anyhow!("unknown target {target:?}"))
    }

    /// Output label: the `ref` name, else a selector hint
    pub fn label(&self, doc: &Document, id: NodeId) -> String {
        match self.by_node.get(&id) {
            Some(name) => name.clone(),
            None => doc.selector_hint(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r##"{
        "config": { "mutation_debounce": 20 },
        "document": [
            { "tag": "button", "ref": "save", "attributes": { "id": "save-btn" }, "children": ["Save"] },
            { "tag": "x-widget", "shadow": [ { "tag": "input", "ref": "inner", "attributes": { "type": "checkbox" }, "checked": true } ] }
        ],
        "steps": [
            { "type": "focus", "target": "save" },
            { "type": "key", "key": "Shift+Escape" },
            { "type": "blur" },
            { "type": "wait", "ms": 10 }
        ]
    }"##;

    #[test]
    fn test_parse_and_build() {
        let scenario = Scenario::from_json(SCENARIO).unwrap();
        assert_eq!(scenario.config.mutation_debounce.as_millis(), 20);
        assert_eq!(scenario.trailing_wait_ms, 500);
        assert!(matches!(scenario.steps[1], Step::Key { key: KeyName::ShiftEscape }));
        assert!(matches!(scenario.steps[2], Step::Blur { related: None }));

        let built = BuiltDocument::build(&scenario.document).unwrap();
        let save = built.resolve("save").unwrap();
        assert_eq!(built.resolve("#save-btn").unwrap(), save);
        let inner = built.resolve("inner").unwrap();
        assert!(built.document.is_in_shadow_tree(inner));
        assert!(built.document.checked(inner));
        assert!(built.resolve("missing").is_err());
    }

    #[test]
    fn test_duplicate_ref_rejected() {
        let nodes: Vec<NodeSpec> = serde_json::from_str(
            r#"[ { "tag": "a", "ref": "x" }, { "tag": "b", "ref": "x" } ]"#,
        )
        .unwrap();
        assert!(BuiltDocument::build(&nodes).is_err());
    }
}
