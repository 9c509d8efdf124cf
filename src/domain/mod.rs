//! Core domain types for lead capture.
//!
//! This module contains pure domain types with no transport dependencies:
//! - Leads, industries and raw form fields
//! - Field validation and its policy
//! - The submission typestate machine

pub mod lead;
pub mod submission;
pub mod validation;
