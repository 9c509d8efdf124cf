//! Submission aggregate - typed lifecycle of one form submission.

pub mod state;
pub mod transitions;

pub use state::*;
