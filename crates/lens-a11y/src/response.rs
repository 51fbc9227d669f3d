//! Provider wire response
//!
//! `{ role?, name?, description?, value?, states?, ariaProperties?, group?,
//! ignored?, ignoredReasons?, error?, errorCode? }`

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::info::{or_sentinel, AccessibilityInfo, GroupInfo, StateValue, NO_DESCRIPTION, NO_NAME, NO_ROLE, NO_VALUE};

/// Raw response from an accessibility data provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderResponse {
    pub role: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub value: Option<String>,
    pub states: BTreeMap<String, StateValue>,
    pub aria_properties: BTreeMap<String, String>,
    pub group: Option<GroupInfo>,
    pub ignored: bool,
    pub ignored_reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl ProviderResponse {
    /// Response carrying an error; callers must treat it as a failure
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some() || self.error_code.is_some()
    }

    /// Convert to a snapshot, filling sentinels. Does not normalize.
    pub fn to_info(&self) -> AccessibilityInfo {
        AccessibilityInfo {
            role: or_sentinel(self.role.as_deref(), NO_ROLE),
            name: or_sentinel(self.name.as_deref(), NO_NAME),
            description: or_sentinel(self.description.as_deref(), NO_DESCRIPTION),
            value: or_sentinel(self.value.as_deref(), NO_VALUE),
            states: self.states.clone(),
            aria_properties: self.aria_properties.clone(),
            normalized_expanded: None,
            ignored: self.ignored,
            ignored_reasons: self.ignored_reasons.clone(),
            group: self.group.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_become_sentinels() {
        let response = ProviderResponse {
            role: Some("button".into()),
            name: Some("   ".into()),
            ..Default::default()
        };
        let info = response.to_info();
        assert_eq!(info.role, "button");
        assert_eq!(info.name, NO_NAME);
        assert_eq!(info.value, NO_VALUE);
        assert!(!response.is_error());
    }
}
