//! Accessibility snapshot

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Role sentinel
pub const NO_ROLE: &str = "(no role)";
/// Name sentinel
pub const NO_NAME: &str = "(no accessible name)";
/// Description sentinel
pub const NO_DESCRIPTION: &str = "(no description)";
/// Value sentinel
pub const NO_VALUE: &str = "(no value)";

/// State flag value: boolean or tri-state `"mixed"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawState", into = "RawState")]
pub enum StateValue {
    Bool(bool),
    Mixed,
}

impl StateValue {
    /// Parse an ARIA tri-state token (`true`, `false`, `mixed`)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "true" => Some(Self::Bool(true)),
            "false" => Some(Self::Bool(false)),
            "mixed" => Some(Self::Mixed),
            _ => None,
        }
    }

    /// Attribute spelling of this value
    pub fn as_token(&self) -> &'static str {
        match self {
            Self::Bool(true) => "true",
            Self::Bool(false) => "false",
            Self::Mixed => "mixed",
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Self::Bool(true))
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawState {
    Bool(bool),
    Text(String),
}

impl TryFrom<RawState> for StateValue {
    type Error = String;

    fn try_from(raw: RawState) -> Result<Self, Self::Error> {
        match raw {
            RawState::Bool(b) => Ok(Self::Bool(b)),
            RawState::Text(s) => Self::parse(&s).ok_or_else(|| format!("invalid state value: {s}")),
        }
    }
}

impl From<StateValue> for RawState {
    fn from(value: StateValue) -> Self {
        match value {
            StateValue::Bool(b) => RawState::Bool(b),
            StateValue::Mixed => RawState::Text("mixed".into()),
        }
    }
}

/// Nearest grouping ancestor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Immutable snapshot of one element's computed accessibility data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityInfo {
    pub role: String,
    pub name: String,
    pub description: String,
    pub value: String,
    pub states: BTreeMap<String, StateValue>,
    pub aria_properties: BTreeMap<String, String>,
    pub normalized_expanded: Option<bool>,
    pub ignored: bool,
    pub ignored_reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupInfo>,
}

impl Default for AccessibilityInfo {
    fn default() -> Self {
        Self::empty()
    }
}

impl AccessibilityInfo {
    /// Snapshot with every text field set to its sentinel
    pub fn empty() -> Self {
        Self {
            role: NO_ROLE.to_string(),
            name: NO_NAME.to_string(),
            description: NO_DESCRIPTION.to_string(),
            value: NO_VALUE.to_string(),
            states: BTreeMap::new(),
            aria_properties: BTreeMap::new(),
            normalized_expanded: None,
            ignored: false,
            ignored_reasons: Vec::new(),
            group: None,
        }
    }

    pub fn has_role(&self) -> bool {
        !self.role.is_empty() && self.role != NO_ROLE
    }

    pub fn has_name(&self) -> bool {
        !self.name.is_empty() && self.name != NO_NAME
    }

    /// Role, name, or at least one state or ARIA property.
    ///
    /// Snapshots failing this are retried by the fetch loop and never cached.
    pub fn is_meaningful(&self) -> bool {
        self.has_role() || self.has_name() || !self.states.is_empty() || !self.aria_properties.is_empty()
    }

    pub fn state(&self, name: &str) -> Option<StateValue> {
        self.states.get(name).copied()
    }

    /// Whether the element reports a transient busy state
    pub fn is_busy(&self) -> bool {
        self.state("busy").is_some_and(|s| s.is_true())
            || self.aria_properties.get("aria-busy").is_some_and(|v| v == "true")
    }
}

/// Replace a missing or blank text field with its sentinel
pub(crate) fn or_sentinel(value: Option<&str>, sentinel: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => sentinel.to_string(),
    }
}
