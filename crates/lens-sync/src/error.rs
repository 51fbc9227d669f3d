//! Error taxonomy

use lens_a11y::ProviderResponse;
use lens_dom::NodeId;

/// Failure reported by an accessibility data provider
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("provider timed out")]
    TransportTimeout,

    #[error("provider disconnected: {0}")]
    TransportDisconnected(String),

    #[error("target not found: {0}")]
    TargetNotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("provider error: {0}")]
    Other(String),

    #[error("request superseded")]
    Cancelled,
}

impl ProviderError {
    /// Classify a provider error message
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("node not found") || lower.contains("not attached") {
            Self::TargetNotFound(message.to_string())
        } else if lower.contains("permission denied") {
            Self::PermissionDenied(message.to_string())
        } else if lower.contains("invalid target") {
            Self::InvalidTarget(message.to_string())
        } else if lower.contains("timeout") || lower.contains("timed out") {
            Self::TransportTimeout
        } else if lower.contains("disconnected") || lower.contains("connection lost") {
            Self::TransportDisconnected(message.to_string())
        } else {
            Self::Other(message.to_string())
        }
    }

    /// Aborts the retry loop immediately
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::TargetNotFound(_) | Self::PermissionDenied(_) | Self::InvalidTarget(_) | Self::Cancelled
        )
    }

    /// Transport failures back off exponentially
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::TransportTimeout | Self::TransportDisconnected(_))
    }
}

/// Treat a response carrying `error` / `errorCode` as a failure
pub fn into_result(response: ProviderResponse) -> Result<ProviderResponse, ProviderError> {
    match (&response.error, &response.error_code) {
        (Some(message), _) => Err(ProviderError::from_message(message)),
        (None, Some(code)) => Err(ProviderError::from_message(code)),
        (None, None) => Ok(response),
    }
}

/// Error raised by `get_accessible_info`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("{0} is no longer a live element")]
    Detached(NodeId),

    #[error("{0} is not an element")]
    NotAnElement(NodeId),

    #[error("engine is disabled")]
    Disabled,

    #[error("request was cancelled before it settled")]
    Cancelled,
}

impl From<lens_a11y::InspectError> for SyncError {
    fn from(err: lens_a11y::InspectError) -> Self {
        match err {
            lens_a11y::InspectError::Detached(id) => Self::Detached(id),
            lens_a11y::InspectError::NotAnElement(id) => Self::NotAnElement(id),
        }
    }
}
