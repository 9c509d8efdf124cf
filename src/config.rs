//! Configuration for the lead-capture workflow.
//!
//! Every section has defaults and unknown sections fall back to them, so a
//! deployment only has to supply the backend location and key.

use serde::{Deserialize, Serialize};

use crate::domain::validation::ValidationPolicy;
use crate::error::{LeadCaptureError, Result};
use crate::session::SessionConfig;

/// Location and credentials of the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend project
    pub base_url: String,

    /// Public API key sent as `apikey` and `Authorization: Bearer`
    pub api_key: String,

    /// Table leads are inserted into
    pub leads_table: String,

    /// Name of the function that sends the confirmation email
    pub confirmation_function: String,

    /// Timeout for each backend call in milliseconds
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            leads_table: "leads".to_string(),
            confirmation_function: "send-confirmation".to_string(),
            timeout_ms: 10_000,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadCaptureConfig {
    pub validation: ValidationPolicy,
    pub session: SessionConfig,
    pub backend: BackendConfig,
}

impl LeadCaptureConfig {
    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| LeadCaptureError::Config(format!("failed to parse config: {e}")))?;
        if config.backend.leads_table.trim().is_empty() {
            return Err(LeadCaptureError::Config(
                "backend.leads_table must not be empty".to_string(),
            ));
        }
        if config.session.storage_key.trim().is_empty() {
            return Err(LeadCaptureError::Config(
                "session.storage_key must not be empty".to_string(),
            ));
        }
        Ok(config)
    }
}
