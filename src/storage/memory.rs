//! In-process lead store, used for local development and tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use super::LeadStore;
use crate::domain::lead::{Lead, LeadId, NewLead};
use crate::error::{LeadCaptureError, Result};
use crate::session::SessionId;

/// Keeps leads in a vector. Cloning shares the contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryLeadStore {
    leads: Arc<Mutex<Vec<Lead>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail until reset, simulating an outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of every stored lead, in insertion order.
    pub fn leads(&self) -> Vec<Lead> {
        self.leads.lock().clone()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LeadCaptureError::Persistence(
                "lead store unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LeadStore for MemoryLeadStore {
    async fn insert_lead(&self, lead: &NewLead) -> Result<Lead> {
        self.check_available()?;
        let stored = Lead::from_new(LeadId::from(Uuid::new_v4()), lead.clone());
        self.leads.lock().push(stored.clone());
        Ok(stored)
    }

    async fn list_session_leads(&self, session_id: &SessionId) -> Result<Vec<Lead>> {
        self.check_available()?;
        let mut leads: Vec<Lead> = self
            .leads
            .lock()
            .iter()
            .filter(|l| &l.session_id == session_id)
            .cloned()
            .collect();
        leads.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(leads)
    }
}
