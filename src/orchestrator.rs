//! Submission orchestrator: validation, session lookup, persistence and
//! confirmation for one form.
//!
//! ```text
//! Idle ──submit──> Validating ──errors──> Idle
//!                      │
//!                      └──ok──> Submitting ──stored──> Succeeded
//!                                    │
//!                                    └──store failed──> Failed
//! ```
//!
//! `Succeeded` and `Failed` are where the cycle rests: the outcome stays
//! visible until the next submit, which begins at `Validating` from either of
//! them just as it does from `Idle`.
//!
//! Only one submission runs at a time per orchestrator. A submit request that
//! arrives while another is in flight is turned away with
//! [`LeadCaptureError::SubmissionInFlight`]; there is no queueing and no
//! content-based de-duplication.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use metrics::counter;
use tokio::sync::watch;

use crate::config::LeadCaptureConfig;
use crate::domain::lead::{Lead, LeadFields};
use crate::domain::submission::{Submission, SubmissionPhase};
use crate::domain::validation::{Field, ValidationErrors, Validator};
use crate::error::{LeadCaptureError, Result};
use crate::http::HttpClient;
use crate::notify::{FunctionNotifier, NotificationOutcome, Notifier};
use crate::session::{KeyValueStore, SessionId, SessionIdentityProvider};
use crate::storage::{LeadStore, RestLeadStore};
use crate::submission_state::SubmissionStateStore;

#[cfg(feature = "metrics")]
use crate::monitoring::LeadCaptureMetrics;

/// Message shown when a submission fails for reasons the user cannot fix.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Form values plus the feedback rendered next to them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadForm {
    fields: LeadFields,
    errors: ValidationErrors,
    failure: Option<String>,
}

impl LeadForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fields(fields: LeadFields) -> Self {
        Self {
            fields,
            ..Default::default()
        }
    }

    pub fn fields(&self) -> &LeadFields {
        &self.fields
    }

    /// Inline errors from the last validation.
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// General failure message from the last submit, if it failed.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Update one field, dropping the stale error for it.
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Name => self.fields.name = value,
            Field::Email => self.fields.email = value,
            Field::Industry => self.fields.industry = value,
        }
        self.errors.clear(field);
    }

    /// Empty every field and all feedback.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Result of a submit call that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Validation failed; nothing was sent anywhere.
    Rejected(ValidationErrors),
    /// The lead is stored. `notification` reports the confirmation email.
    Submitted {
        lead: Lead,
        notification: NotificationOutcome,
    },
}

impl SubmitOutcome {
    pub fn lead(&self) -> Option<&Lead> {
        match self {
            SubmitOutcome::Submitted { lead, .. } => Some(lead),
            SubmitOutcome::Rejected(_) => None,
        }
    }

    /// The stored lead, or the validation errors as a [`LeadCaptureError::Validation`].
    pub fn into_lead(self) -> Result<Lead> {
        match self {
            SubmitOutcome::Submitted { lead, .. } => Ok(lead),
            SubmitOutcome::Rejected(errors) => Err(LeadCaptureError::Validation(errors)),
        }
    }
}

/// Clears the in-flight flag when the submit call ends, however it ends.
struct InFlightGuard<'a> {
    in_flight: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }
}

/// Coordinates one form's submissions.
pub struct SubmissionOrchestrator<S, N, K>
where
    S: LeadStore,
    N: Notifier,
    K: KeyValueStore,
{
    validator: Validator,
    store: S,
    notifier: N,
    sessions: SessionIdentityProvider<K>,
    state: SubmissionStateStore,
    phase: watch::Sender<SubmissionPhase>,
    in_flight: AtomicBool,
    #[cfg(feature = "metrics")]
    metrics: Option<LeadCaptureMetrics>,
}

impl<H, K> SubmissionOrchestrator<RestLeadStore<H>, FunctionNotifier<H>, K>
where
    H: HttpClient,
    K: KeyValueStore,
{
    /// Wire an orchestrator against the hosted backend described by `config`.
    pub fn from_config(
        config: &LeadCaptureConfig,
        http_client: H,
        key_value_store: K,
        state: SubmissionStateStore,
    ) -> Result<Self> {
        let validator = Validator::new(config.validation.clone())?;
        let sessions =
            SessionIdentityProvider::with_config(key_value_store, config.session.clone());
        Ok(Self::new(
            RestLeadStore::new(http_client.clone(), config.backend.clone()),
            FunctionNotifier::new(http_client, config.backend.clone()),
            sessions,
            state,
        )
        .with_validator(validator))
    }
}

impl<S, N, K> SubmissionOrchestrator<S, N, K>
where
    S: LeadStore,
    N: Notifier,
    K: KeyValueStore,
{
    pub fn new(
        store: S,
        notifier: N,
        sessions: SessionIdentityProvider<K>,
        state: SubmissionStateStore,
    ) -> Self {
        let (phase, _rx) = watch::channel(SubmissionPhase::Idle);
        Self {
            validator: Validator::default(),
            store,
            notifier,
            sessions,
            state,
            phase,
            in_flight: AtomicBool::new(false),
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Replace the default validation policy.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Record into a Prometheus registry as well.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, metrics: LeadCaptureMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> &SubmissionStateStore {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sessions(&self) -> &SessionIdentityProvider<K> {
        &self.sessions
    }

    pub fn phase(&self) -> SubmissionPhase {
        *self.phase.borrow()
    }

    /// Watch phase changes, e.g. to toggle a spinner.
    pub fn subscribe_phase(&self) -> watch::Receiver<SubmissionPhase> {
        self.phase.subscribe()
    }

    /// True while a submission is running; the submit control should be disabled.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// The current session identifier, created if needed.
    pub fn session_id(&self) -> Result<SessionId> {
        self.sessions.get_or_create_session_id()
    }

    /// Leads the backend holds for the current session.
    pub async fn stored_session_leads(&self) -> Result<Vec<Lead>> {
        let session_id = self.sessions.get_or_create_session_id()?;
        self.store.list_session_leads(&session_id).await
    }

    /// Run one submission of `form`.
    ///
    /// - Invalid fields: the form gets per-field errors and
    ///   [`SubmitOutcome::Rejected`] is returned. No remote call is made.
    /// - Storage failure: the form keeps its values and gets a general failure
    ///   message; the error is returned and the shared state is untouched.
    /// - Stored: the shared state records the lead, the form is cleared and
    ///   [`SubmitOutcome::Submitted`] is returned, whatever the confirmation
    ///   email outcome.
    ///
    /// # Errors
    /// [`LeadCaptureError::SubmissionInFlight`] if another submission is
    /// running, otherwise the session or persistence error that ended the attempt.
    #[tracing::instrument(skip(self, form), fields(industry = %form.fields().industry))]
    pub async fn submit(&self, form: &mut LeadForm) -> Result<SubmitOutcome> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            counter!("leadcapture_submissions_total", "outcome" => "ignored").increment(1);
            tracing::debug!("Submit ignored: another submission is in flight");
            return Err(LeadCaptureError::SubmissionInFlight);
        }
        let _guard = InFlightGuard {
            in_flight: &self.in_flight,
        };
        let started = Instant::now();

        let result = self.run_submission(form).await;

        let outcome = match &result {
            Ok(SubmitOutcome::Submitted { .. }) => "succeeded",
            Ok(SubmitOutcome::Rejected(_)) => "rejected",
            Err(_) => "failed",
        };
        counter!("leadcapture_submissions_total", "outcome" => outcome).increment(1);
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_submission(outcome, started.elapsed());
            if let Ok(SubmitOutcome::Submitted {
                lead,
                notification: NotificationOutcome::Failed { .. },
            }) = &result
            {
                metrics.record_notification_failure(lead.industry.as_str());
            }
        }
        tracing::debug!(
            outcome,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Submission finished"
        );

        result
    }

    async fn run_submission(&self, form: &mut LeadForm) -> Result<SubmitOutcome> {
        self.set_phase(SubmissionPhase::Validating);
        form.failure = None;

        let validated = match Submission::new(form.fields.clone()).validate(&self.validator) {
            Ok(validated) => validated,
            Err(errors) => {
                tracing::debug!(invalid_fields = errors.len(), "Submission rejected by validation");
                form.errors = errors.clone();
                self.set_phase(SubmissionPhase::Idle);
                return Ok(SubmitOutcome::Rejected(errors));
            }
        };
        form.errors = ValidationErrors::default();

        self.set_phase(SubmissionPhase::Submitting);

        let persisted = match self.sessions.get_or_create_session_id() {
            Ok(session_id) => validated.persist(session_id, &self.store).await,
            Err(e) => Err(e),
        };
        let persisted = match persisted {
            Ok(persisted) => persisted,
            Err(e) => {
                form.failure = Some(GENERIC_FAILURE_MESSAGE.to_string());
                self.set_phase(SubmissionPhase::Failed);
                return Err(e);
            }
        };

        let completed = persisted.notify(&self.notifier).await;
        let lead = completed.state.lead;

        self.state.record_success(lead.clone());
        form.reset();
        self.set_phase(SubmissionPhase::Succeeded);

        tracing::info!(
            lead_id = %lead.id,
            session_id = %lead.session_id,
            notified = completed.state.notification.is_sent(),
            "Lead submitted"
        );

        Ok(SubmitOutcome::Submitted {
            lead,
            notification: completed.state.notification,
        })
    }

    fn set_phase(&self, phase: SubmissionPhase) {
        self.phase.send_if_modified(|current| {
            let changed = *current != phase;
            *current = phase;
            changed
        });
    }
}
