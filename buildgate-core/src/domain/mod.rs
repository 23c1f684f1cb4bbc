//! Core domain types
//!
//! These types are shared between the collaborator clients (which build them
//! from wire DTOs) and the CLI service layer (which makes decisions on them).
//! None of them are persisted; each lives for a single run.

pub mod build;
pub mod change;
pub mod report;
