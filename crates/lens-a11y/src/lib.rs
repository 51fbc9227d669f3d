//! Lens Accessibility
//!
//! The accessibility snapshot model shared by the synchronization engine.
//!
//! Features:
//! - `AccessibilityInfo` snapshots with sentinel-filled text fields
//! - Provider wire types
//! - Normalization of provider results against the live DOM
//! - Local DOM inspection used when no provider result is available

pub mod aria;
pub mod info;
pub mod inspect;
pub mod normalize;
pub mod response;

pub use aria::AriaRole;
pub use info::{AccessibilityInfo, GroupInfo, StateValue, NO_DESCRIPTION, NO_NAME, NO_ROLE, NO_VALUE};
pub use inspect::{derive_group, inspect_element};
pub use normalize::{apply_native_checkbox, normalize_provider_result, normalized_expanded, strip_recursive_fields};
pub use response::ProviderResponse;

use lens_dom::NodeId;

/// Local inspection error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InspectError {
    #[error("{0} is no longer a live node")]
    Detached(NodeId),

    #[error("{0} is not an element")]
    NotAnElement(NodeId),
}
