//! Lead capture for marketing forms.
//!
//! This crate validates a name/email/industry form, tags the lead with a stable
//! per-client session identifier, stores it through a [`LeadStore`], and then
//! asks a [`Notifier`] to send a confirmation email. Storage is the durability
//! boundary: a failed insert fails the submission, a failed confirmation does
//! not.
//!
//! The [`SubmissionOrchestrator`] drives one form and records successes in a
//! [`SubmissionStateStore`] that the rest of the application can read or
//! subscribe to.

pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod monitoring;
pub mod notify;
pub mod orchestrator;
pub mod session;
pub mod storage;
pub mod submission_state;

// Re-export commonly used types
pub use config::{BackendConfig, LeadCaptureConfig};
pub use domain::lead::{Industry, Lead, LeadFields, LeadId, NewLead};
pub use domain::submission::SubmissionPhase;
pub use domain::validation::{
    Field, ValidationError, ValidationErrorKind, ValidationErrors, ValidationPolicy, Validator,
    validate,
};
pub use error::{LeadCaptureError, Result};
pub use http::{HttpClient, HttpRequest, HttpResponse, MockHttpClient, ReqwestHttpClient};
#[cfg(feature = "metrics")]
pub use monitoring::LeadCaptureMetrics;
pub use notify::{ConfirmationRequest, FunctionNotifier, NotificationOutcome, Notifier};
pub use orchestrator::{LeadForm, SubmissionOrchestrator, SubmitOutcome};
pub use session::{
    FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, SessionConfig, SessionId,
    SessionIdentityProvider, StorageFallback,
};
#[cfg(feature = "postgres")]
pub use storage::postgres::{PostgresLeadStore, migrator};
pub use storage::{LeadStore, MemoryLeadStore, RestLeadStore};
pub use submission_state::{SubmissionSnapshot, SubmissionStateStore};
