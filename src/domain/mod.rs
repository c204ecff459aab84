//! Core domain types and logic.

pub mod accuracy;
pub mod calendar;
pub mod config_validation;
pub mod error;
pub mod extract;
pub mod history;
pub mod prediction;
pub mod verification;
