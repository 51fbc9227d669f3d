//! Accessibility Data Provider
//!
//! The engine treats the provider as a black box: given a stable element
//! reference it returns a [`ProviderResponse`] or a [`ProviderError`].

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use lens_a11y::{inspect_element, AccessibilityInfo, ProviderResponse};
use lens_dom::{Document, NodeId};

use crate::error::ProviderError;

/// Provider request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRequest {
    /// Stable element reference
    pub element: NodeId,
    /// Human-readable selector for providers that address elements by
    /// selector. Not unique; never used as a key.
    pub selector: String,
    pub force_update: bool,
}

/// Accessibility data provider
#[async_trait(?Send)]
pub trait AccessibilityProvider {
    /// Fetch one element's accessibility data.
    ///
    /// A response carrying `error` is converted to a failure by the caller.
    async fn fetch(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;
}

/// Provider answering from the DOM model through local inspection
#[derive(Debug, Clone)]
pub struct LocalInspectionProvider {
    document: Rc<RefCell<Document>>,
}

impl LocalInspectionProvider {
    pub fn new(document: Rc<RefCell<Document>>) -> Self {
        Self { document }
    }
}

#[async_trait(?Send)]
impl AccessibilityProvider for LocalInspectionProvider {
    async fn fetch(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let doc = self.document.borrow();
        let info = inspect_element(&doc, request.element)
            .map_err(|err| ProviderError::TargetNotFound(format!("Node not found: {err}")))?;
        Ok(response_from_info(&info))
    }
}

fn present(value: &str, has: bool) -> Option<String> {
    has.then(|| value.to_string())
}

/// Wire form of a snapshot; sentinel fields become absent
pub fn response_from_info(info: &AccessibilityInfo) -> ProviderResponse {
    ProviderResponse {
        role: present(&info.role, info.has_role()),
        name: present(&info.name, info.has_name()),
        description: present(&info.description, info.description != lens_a11y::NO_DESCRIPTION),
        value: present(&info.value, info.value != lens_a11y::NO_VALUE),
        states: info.states.clone(),
        aria_properties: info.aria_properties.clone(),
        group: info.group.clone(),
        ignored: info.ignored,
        ignored_reasons: info.ignored_reasons.clone(),
        error: None,
        error_code: None,
    }
}
