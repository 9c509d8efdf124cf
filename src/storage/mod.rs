//! Persistence of submitted leads.
//!
//! The [`LeadStore`] trait is the durability boundary of a submission: once
//! `insert_lead` returns `Ok`, the lead is considered captured regardless of
//! what happens afterwards.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::lead::{Lead, NewLead};
use crate::error::Result;
use crate::session::SessionId;

mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
mod rest;

pub use memory::MemoryLeadStore;
pub use rest::RestLeadStore;

/// Storage for leads.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Insert a validated lead and return the stored row.
    ///
    /// # Errors
    /// Any failure is reported as [`crate::LeadCaptureError::Persistence`]; the
    /// lead must be treated as not stored.
    async fn insert_lead(&self, lead: &NewLead) -> Result<Lead>;

    /// Leads stored for `session_id`, newest first.
    async fn list_session_leads(&self, session_id: &SessionId) -> Result<Vec<Lead>>;
}

#[async_trait]
impl<S: LeadStore + ?Sized> LeadStore for Arc<S> {
    async fn insert_lead(&self, lead: &NewLead) -> Result<Lead> {
        (**self).insert_lead(lead).await
    }

    async fn list_session_leads(&self, session_id: &SessionId) -> Result<Vec<Lead>> {
        (**self).list_session_leads(session_id).await
    }
}
