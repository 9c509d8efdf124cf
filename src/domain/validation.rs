//! Field-level validation of the lead form.
//!
//! Validation is pure: a [`Validator`] maps [`LeadFields`] to a set of
//! [`ValidationError`]s, at most one per field. Thresholds and the email grammar
//! come from a [`ValidationPolicy`] so deployments can tighten them without a
//! code change.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::lead::{Industry, LeadFields};
use crate::error::{LeadCaptureError, Result};

/// Default email grammar: something, an `@`, something, a dot, something.
pub const DEFAULT_EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// Thresholds applied by the [`Validator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    /// Minimum number of characters in the trimmed name
    pub name_min_chars: usize,
    /// Maximum number of characters in the trimmed name
    pub name_max_chars: usize,
    /// Maximum number of characters in the trimmed email
    pub email_max_chars: usize,
    /// Regular expression the trimmed email must match
    pub email_pattern: String,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            name_min_chars: 1,
            name_max_chars: 100,
            email_max_chars: 254,
            email_pattern: DEFAULT_EMAIL_PATTERN.to_string(),
        }
    }
}

/// The form field an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Name,
    Email,
    Industry,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Industry => "industry",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which rule a field broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    Required,
    Format,
    TooShort,
    TooLong,
}

/// A single field-level failure with a message suitable for inline display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: Field,
    pub kind: ValidationErrorKind,
    pub message: String,
}

impl ValidationError {
    fn new(field: Field, kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            field,
            kind,
            message: message.into(),
        }
    }
}

/// The errors produced by one validation pass, addressable by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The error recorded for `field`, if any.
    pub fn get(&self, field: Field) -> Option<&ValidationError> {
        self.0.iter().find(|e| e.field == field)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.get(field).is_some()
    }

    /// Drop the error for `field`, e.g. once the user edits it.
    pub fn clear(&mut self, field: Field) {
        self.0.retain(|e| e.field != field);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Normalized values extracted from fields that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidFields {
    pub name: String,
    pub email: String,
    pub industry: Industry,
}

/// Applies a [`ValidationPolicy`] to form fields.
#[derive(Debug, Clone)]
pub struct Validator {
    policy: ValidationPolicy,
    email_pattern: Regex,
}

static DEFAULT_VALIDATOR: LazyLock<Validator> = LazyLock::new(|| Validator {
    policy: ValidationPolicy::default(),
    email_pattern: Regex::new(DEFAULT_EMAIL_PATTERN).expect("default email pattern compiles"),
});

impl Validator {
    /// Build a validator, compiling the policy's email pattern.
    pub fn new(policy: ValidationPolicy) -> Result<Self> {
        if policy.name_min_chars > policy.name_max_chars {
            return Err(LeadCaptureError::Config(format!(
                "name_min_chars ({}) exceeds name_max_chars ({})",
                policy.name_min_chars, policy.name_max_chars
            )));
        }
        let email_pattern = Regex::new(&policy.email_pattern).map_err(|e| {
            LeadCaptureError::Config(format!(
                "invalid email_pattern '{}': {}",
                policy.email_pattern, e
            ))
        })?;
        Ok(Self {
            policy,
            email_pattern,
        })
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Check every field and return the failures, one per failing field.
    pub fn validate(&self, fields: &LeadFields) -> ValidationErrors {
        let mut errors = ValidationErrors::default();
        if let Err(e) = self.check_name(&fields.name) {
            errors.push(e);
        }
        if let Err(e) = self.check_email(&fields.email) {
            errors.push(e);
        }
        if let Err(e) = check_industry(&fields.industry) {
            errors.push(e);
        }
        errors
    }

    /// Validate and normalize in one step.
    pub fn normalize(
        &self,
        fields: &LeadFields,
    ) -> std::result::Result<ValidFields, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let name = self.check_name(&fields.name).map_err(|e| errors.push(e));
        let email = self.check_email(&fields.email).map_err(|e| errors.push(e));
        let industry = check_industry(&fields.industry).map_err(|e| errors.push(e));

        match (name, email, industry) {
            (Ok(name), Ok(email), Ok(industry)) => Ok(ValidFields {
                name,
                email,
                industry,
            }),
            _ => Err(errors),
        }
    }

    fn check_name(&self, raw: &str) -> std::result::Result<String, ValidationError> {
        let name = raw.trim();
        let chars = name.chars().count();
        if chars == 0 {
            return Err(ValidationError::new(
                Field::Name,
                ValidationErrorKind::Required,
                "Name is required",
            ));
        }
        if chars < self.policy.name_min_chars {
            return Err(ValidationError::new(
                Field::Name,
                ValidationErrorKind::TooShort,
                format!(
                    "Name must be at least {} characters",
                    self.policy.name_min_chars
                ),
            ));
        }
        if chars > self.policy.name_max_chars {
            return Err(ValidationError::new(
                Field::Name,
                ValidationErrorKind::TooLong,
                format!(
                    "Name must be at most {} characters",
                    self.policy.name_max_chars
                ),
            ));
        }
        Ok(name.to_string())
    }

    fn check_email(&self, raw: &str) -> std::result::Result<String, ValidationError> {
        let email = raw.trim();
        if email.is_empty() {
            return Err(ValidationError::new(
                Field::Email,
                ValidationErrorKind::Required,
                "Email is required",
            ));
        }
        if email.chars().count() > self.policy.email_max_chars {
            return Err(ValidationError::new(
                Field::Email,
                ValidationErrorKind::TooLong,
                format!(
                    "Email must be at most {} characters",
                    self.policy.email_max_chars
                ),
            ));
        }
        if !self.email_pattern.is_match(email) {
            return Err(ValidationError::new(
                Field::Email,
                ValidationErrorKind::Format,
                "Please enter a valid email address",
            ));
        }
        Ok(email.to_lowercase())
    }
}

impl Default for Validator {
    fn default() -> Self {
        DEFAULT_VALIDATOR.clone()
    }
}

fn check_industry(raw: &str) -> std::result::Result<Industry, ValidationError> {
    raw.parse::<Industry>().map_err(|_| {
        ValidationError::new(
            Field::Industry,
            ValidationErrorKind::Required,
            "Please select an industry",
        )
    })
}

/// Validate with the default policy.
pub fn validate(fields: &LeadFields) -> ValidationErrors {
    DEFAULT_VALIDATOR.validate(fields)
}
