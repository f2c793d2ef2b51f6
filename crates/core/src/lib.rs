//! Core business logic for scribe.
//!
//! Services sit between the HTTP layer and the repositories. The vote ledger
//! in [`services::vote`] owns the invariant that every post and comment
//! total equals the sum of the votes cast on it.

pub mod services;

pub use services::*;
