//! Submission states.
//!
//! A single form submission moves through typed states so that a lead can only
//! be stored after validation and only be confirmed after it is stored.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::lead::{Lead, LeadFields};
use crate::domain::validation::ValidFields;
use crate::notify::NotificationOutcome;

/// Marker trait for valid submission states.
pub trait SubmissionState: Send + Sync {}

/// One attempt at submitting the form.
///
/// The generic parameter `T` represents the current state of the attempt.
#[derive(Debug, Clone)]
pub struct Submission<T: SubmissionState> {
    /// The current state of the attempt.
    pub state: T,
    /// The raw values as entered.
    pub fields: LeadFields,
}

/// Fields captured, nothing checked yet.
#[derive(Debug, Clone)]
pub struct Draft {
    pub started_at: DateTime<Utc>,
}

impl SubmissionState for Draft {}

/// Every field passed validation.
#[derive(Debug, Clone)]
pub struct Validated {
    pub started_at: DateTime<Utc>,
    pub valid: ValidFields,
}

impl SubmissionState for Validated {}

/// The lead is durably stored.
#[derive(Debug, Clone)]
pub struct Persisted {
    pub started_at: DateTime<Utc>,
    pub lead: Lead,
}

impl SubmissionState for Persisted {}

/// The confirmation was attempted; the submission is over.
#[derive(Debug, Clone)]
pub struct Completed {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub lead: Lead,
    pub notification: NotificationOutcome,
}

impl SubmissionState for Completed {}

/// Where the orchestrator is in its cycle, for driving the UI.
///
/// `Succeeded` and `Failed` are resting states: they stay visible until the
/// next submit, which starts from them exactly as it would from `Idle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionPhase {
    #[default]
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}
