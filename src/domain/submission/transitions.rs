//! State transitions for a single submission.
//!
//! ```text
//! Submission<Draft> ──validate()──> Submission<Validated> ──persist()──> Submission<Persisted>
//!        │                                   │                                  │
//!        └──> ValidationErrors               └──> Err(Persistence)              └──notify()──> Submission<Completed>
//! ```
//!
//! `persist` is the durability boundary: an error there ends the attempt with
//! nothing stored. `notify` cannot fail; a notification problem is recorded in
//! [`Completed::notification`] and logged.

use chrono::Utc;
use metrics::counter;

use super::state::{Completed, Draft, Persisted, Submission, Validated};
use crate::domain::lead::{LeadFields, NewLead};
use crate::domain::validation::{ValidationErrors, Validator};
use crate::error::Result;
use crate::notify::{ConfirmationRequest, NotificationOutcome, Notifier};
use crate::session::SessionId;
use crate::storage::LeadStore;

impl Submission<Draft> {
    pub fn new(fields: LeadFields) -> Self {
        Submission {
            fields,
            state: Draft {
                started_at: Utc::now(),
            },
        }
    }

    /// Check the fields. On failure the per-field errors are returned and no
    /// further transition is possible.
    pub fn validate(
        self,
        validator: &Validator,
    ) -> std::result::Result<Submission<Validated>, ValidationErrors> {
        let valid = validator.normalize(&self.fields)?;
        Ok(Submission {
            fields: self.fields,
            state: Validated {
                started_at: self.state.started_at,
                valid,
            },
        })
    }
}

impl Submission<Validated> {
    /// Stamp the lead with its session and submission time and store it.
    pub async fn persist<S: LeadStore + ?Sized>(
        self,
        session_id: SessionId,
        store: &S,
    ) -> Result<Submission<Persisted>> {
        let new_lead = NewLead {
            name: self.state.valid.name,
            email: self.state.valid.email,
            industry: self.state.valid.industry,
            session_id,
            submitted_at: Utc::now(),
        };

        let lead = store.insert_lead(&new_lead).await.inspect_err(|e| {
            counter!("leadcapture_persist_failures_total").increment(1);
            tracing::error!(
                session_id = %new_lead.session_id,
                error = %e,
                "Lead could not be stored"
            );
        })?;

        Ok(Submission {
            fields: self.fields,
            state: Persisted {
                started_at: self.state.started_at,
                lead,
            },
        })
    }
}

impl Submission<Persisted> {
    /// Trigger the confirmation email. Always completes.
    pub async fn notify<N: Notifier + ?Sized>(self, notifier: &N) -> Submission<Completed> {
        let request = ConfirmationRequest::from(&self.state.lead);
        let outcome = NotificationOutcome::from(notifier.send_confirmation(&request).await);

        match &outcome {
            NotificationOutcome::Sent => {
                counter!("leadcapture_notifications_total", "outcome" => "sent").increment(1);
            }
            NotificationOutcome::Failed { status, message } => {
                counter!("leadcapture_notifications_total", "outcome" => "failed").increment(1);
                tracing::warn!(
                    lead_id = %self.state.lead.id,
                    status = ?status,
                    error = %message,
                    "Confirmation notification failed; lead remains stored"
                );
            }
        }

        Submission {
            fields: self.fields,
            state: Completed {
                started_at: self.state.started_at,
                completed_at: Utc::now(),
                lead: self.state.lead,
                notification: outcome,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LeadCaptureError;
    use crate::domain::lead::Industry;
    use crate::domain::validation::Field;
    use crate::storage::MemoryLeadStore;
    use async_trait::async_trait;

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn send_confirmation(&self, _request: &ConfirmationRequest) -> Result<()> {
            Err(LeadCaptureError::Notification {
                status: Some(503),
                message: "unavailable".to_string(),
            })
        }
    }

    struct OkNotifier;

    #[async_trait]
    impl Notifier for OkNotifier {
        async fn send_confirmation(&self, _request: &ConfirmationRequest) -> Result<()> {
            Ok(())
        }
    }

    fn valid_fields() -> LeadFields {
        LeadFields::new(" Ana ", "Ana@X.com", "technology")
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let errors = Submission::new(LeadFields::new("", "bad", ""))
            .validate(&Validator::default())
            .unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(Field::Email));
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let store = MemoryLeadStore::new();
        let session = SessionId::generate();

        let validated = Submission::new(valid_fields())
            .validate(&Validator::default())
            .unwrap();
        assert_eq!(validated.state.valid.name, "Ana");

        let persisted = validated.persist(session.clone(), &store).await.unwrap();
        assert_eq!(persisted.state.lead.session_id, session);
        assert_eq!(persisted.state.lead.email, "ana@x.com");
        assert_eq!(persisted.state.lead.industry, Industry::Technology);
        assert!(persisted.state.lead.submitted_at >= persisted.state.started_at);

        let completed = persisted.notify(&OkNotifier).await;
        assert!(completed.state.notification.is_sent());
        assert_eq!(completed.fields, valid_fields());
        assert_eq!(store.leads().len(), 1);
    }

    #[tokio::test]
    async fn test_persist_failure_stores_nothing() {
        let store = MemoryLeadStore::new();
        store.set_unavailable(true);

        let result = Submission::new(valid_fields())
            .validate(&Validator::default())
            .unwrap()
            .persist(SessionId::generate(), &store)
            .await;

        assert!(matches!(result, Err(LeadCaptureError::Persistence(_))));
        assert!(store.leads().is_empty());
    }

    #[tokio::test]
    async fn test_notify_failure_still_completes() {
        let store = MemoryLeadStore::new();
        let completed = Submission::new(valid_fields())
            .validate(&Validator::default())
            .unwrap()
            .persist(SessionId::generate(), &store)
            .await
            .unwrap()
            .notify(&FailingNotifier)
            .await;

        assert_eq!(
            completed.state.notification,
            NotificationOutcome::Failed {
                status: Some(503),
                message: "unavailable".to_string(),
            }
        );
        assert_eq!(store.leads().len(), 1);
    }
}
