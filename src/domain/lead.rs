//! Lead records and the form fields they are built from.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::SessionId;

/// Unique identifier for a stored lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(pub Uuid);

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Display only first 8 characters for readability in logs
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl From<Uuid> for LeadId {
    fn from(uuid: Uuid) -> Self {
        LeadId(uuid)
    }
}

impl std::ops::Deref for LeadId {
    type Target = Uuid;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Industry categories offered by the form.
///
/// The string form is the lower-case label stored in the `industry` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Industry {
    Technology,
    Finance,
    Healthcare,
    Education,
    Retail,
    Manufacturing,
    Marketing,
    Other,
}

impl Industry {
    /// Every category, in display order.
    pub const ALL: [Industry; 8] = [
        Industry::Technology,
        Industry::Finance,
        Industry::Healthcare,
        Industry::Education,
        Industry::Retail,
        Industry::Manufacturing,
        Industry::Marketing,
        Industry::Other,
    ];

    /// Value used to backfill rows stored before the column existed.
    pub const DEFAULT: Industry = Industry::Other;

    /// The stored label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Industry::Technology => "technology",
            Industry::Finance => "finance",
            Industry::Healthcare => "healthcare",
            Industry::Education => "education",
            Industry::Retail => "retail",
            Industry::Manufacturing => "manufacturing",
            Industry::Marketing => "marketing",
            Industry::Other => "other",
        }
    }
}

impl fmt::Display for Industry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known industry label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown industry: '{0}'")]
pub struct UnknownIndustry(pub String);

impl FromStr for Industry {
    type Err = UnknownIndustry;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Industry::ALL
            .into_iter()
            .find(|industry| industry.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownIndustry(s.to_string()))
    }
}

/// Raw values as typed into the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadFields {
    pub name: String,
    pub email: String,
    pub industry: String,
}

impl LeadFields {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        industry: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            industry: industry.into(),
        }
    }

    /// True when every field is an empty string.
    pub fn is_blank(&self) -> bool {
        self.name.is_empty() && self.email.is_empty() && self.industry.is_empty()
    }
}

/// A lead that passed validation and is ready to be inserted.
///
/// Only produced by [`crate::domain::submission`] transitions, so every
/// instance carries normalized fields and a non-empty session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewLead {
    pub name: String,
    pub email: String,
    pub industry: Industry,
    pub session_id: SessionId,
    pub submitted_at: DateTime<Utc>,
}

/// A lead as stored by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub name: String,
    pub email: String,
    pub industry: Industry,
    pub session_id: SessionId,
    pub submitted_at: DateTime<Utc>,
}

impl Lead {
    /// Attach a store-assigned identifier to a new lead.
    pub fn from_new(id: LeadId, lead: NewLead) -> Self {
        Self {
            id,
            name: lead.name,
            email: lead.email,
            industry: lead.industry,
            session_id: lead.session_id,
            submitted_at: lead.submitted_at,
        }
    }
}

/// Mask an email address for logging, keeping the first character and the domain.
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{first}***@{domain}")
        }
        None => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_industry_parses_case_insensitively() {
        assert_eq!("Technology".parse::<Industry>(), Ok(Industry::Technology));
        assert_eq!(" finance ".parse::<Industry>(), Ok(Industry::Finance));
        assert!("".parse::<Industry>().is_err());
        assert!("farming".parse::<Industry>().is_err());
    }

    #[test]
    fn test_industry_serializes_as_label() {
        let json = serde_json::to_string(&Industry::Healthcare).unwrap();
        assert_eq!(json, r#""healthcare""#);
        let back: Industry = serde_json::from_str(r#""retail""#).unwrap();
        assert_eq!(back, Industry::Retail);
    }

    #[test]
    fn test_backfill_default_is_other() {
        assert_eq!(Industry::DEFAULT.as_str(), "other");
    }

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("ana@x.com"), "a***@x.com");
        assert_eq!(mask_email("@x.com"), "***@x.com");
        assert_eq!(mask_email("not-an-email"), "***");
    }

    #[test]
    fn test_lead_fields_blank() {
        assert!(LeadFields::default().is_blank());
        assert!(!LeadFields::new("Ana", "", "").is_blank());
    }
}
