//! Error types for the lead-capture workflow.

use thiserror::Error;

use crate::domain::validation::ValidationErrors;

/// Result type alias using the leadcapture error type.
pub type Result<T> = std::result::Result<T, LeadCaptureError>;

/// Main error type for the lead-capture workflow.
#[derive(Error, Debug)]
pub enum LeadCaptureError {
    /// One or more form fields failed validation
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// The lead could not be durably stored
    #[error("Failed to persist lead: {0}")]
    Persistence(String),

    /// The confirmation email could not be triggered
    #[error("Confirmation notification failed{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Notification {
        status: Option<u16>,
        message: String,
    },

    /// A submission is already running for this orchestrator
    #[error("A submission is already in flight")]
    SubmissionInFlight,

    /// Local key-value storage could not be read or written
    #[error("Session storage unavailable: {0}")]
    SessionStorage(String),

    /// Configuration could not be parsed or is inconsistent
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// HTTP client error
    #[error("HTTP request failed: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// General error from anyhow
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_error_with_status() {
        let err = LeadCaptureError::Notification {
            status: Some(502),
            message: "bad gateway".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Confirmation notification failed (status 502): bad gateway"
        );
    }

    #[test]
    fn test_notification_error_without_status() {
        let err = LeadCaptureError::Notification {
            status: None,
            message: "timed out".to_string(),
        };
        assert_eq!(err.to_string(), "Confirmation notification failed: timed out");
    }
}
