//! Shared record of what has been submitted during this process lifetime.
//!
//! [`SubmissionStateStore`] is a cloneable handle: the orchestrator writes to
//! it after a lead is stored, and any number of readers either poll it or
//! [`subscribe`](SubmissionStateStore::subscribe) for changes. Nothing is
//! persisted; the state starts empty with every new store.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::domain::lead::Lead;

/// Point-in-time view of the submission state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubmissionSnapshot {
    /// Whether any submission succeeded
    pub submitted: bool,
    /// Leads submitted so far, oldest first
    pub session_leads: Vec<Lead>,
}

/// Handle to the shared submission state. Clones observe the same state.
#[derive(Debug, Clone)]
pub struct SubmissionStateStore {
    tx: Arc<watch::Sender<SubmissionSnapshot>>,
}

impl Default for SubmissionStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionStateStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SubmissionSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn submitted(&self) -> bool {
        self.tx.borrow().submitted
    }

    pub fn session_leads(&self) -> Vec<Lead> {
        self.tx.borrow().session_leads.clone()
    }

    pub fn snapshot(&self) -> SubmissionSnapshot {
        self.tx.borrow().clone()
    }

    /// Receive a notification every time the state changes.
    pub fn subscribe(&self) -> watch::Receiver<SubmissionSnapshot> {
        self.tx.subscribe()
    }

    pub fn set_submitted(&self, submitted: bool) {
        self.tx.send_if_modified(|state| {
            let changed = state.submitted != submitted;
            state.submitted = submitted;
            changed
        });
    }

    pub fn add_lead(&self, lead: Lead) {
        self.tx.send_modify(|state| state.session_leads.push(lead));
    }

    /// Append a stored lead and raise the submitted flag as one change, so
    /// subscribers never observe one without the other.
    pub(crate) fn record_success(&self, lead: Lead) {
        self.tx.send_modify(|state| {
            state.session_leads.push(lead);
            state.submitted = true;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lead::{Industry, LeadId};
    use crate::session::SessionId;

    fn lead(name: &str) -> Lead {
        Lead {
            id: LeadId::from(uuid::Uuid::new_v4()),
            name: name.to_string(),
            email: "a@x.com".to_string(),
            industry: Industry::Retail,
            session_id: SessionId::parse("s1").unwrap(),
            submitted_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_starts_empty() {
        let store = SubmissionStateStore::new();
        assert!(!store.submitted());
        assert!(store.session_leads().is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let store = SubmissionStateStore::new();
        let reader = store.clone();
        store.add_lead(lead("Ana"));
        store.add_lead(lead("Bo"));
        store.set_submitted(true);

        assert!(reader.submitted());
        let names: Vec<String> = reader.session_leads().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["Ana", "Bo"]);
    }

    #[tokio::test]
    async fn test_subscribers_see_recorded_success() {
        let store = SubmissionStateStore::new();
        let mut rx = store.subscribe();

        store.record_success(lead("Ana"));

        rx.changed().await.unwrap();
        let snapshot = rx.borrow_and_update().clone();
        assert!(snapshot.submitted);
        assert_eq!(snapshot.session_leads.len(), 1);
    }

    #[tokio::test]
    async fn test_unchanged_flag_does_not_notify() {
        let store = SubmissionStateStore::new();
        let rx = store.subscribe();
        store.set_submitted(false);
        assert!(!rx.has_changed().unwrap());
    }
}
