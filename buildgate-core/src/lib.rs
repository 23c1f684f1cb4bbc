//! Buildgate Core
//!
//! Core types and pure decision logic for the buildgate CI gate.
//!
//! This crate contains:
//! - Domain types: change requests, builds, reported statuses
//! - DTOs: wire formats of the Stash (Bitbucket Server) and TeamCity REST APIs
//! - Policy: branch naming rules and watched-folder matching
//! - Service messages: TeamCity `##teamcity[...]` output formatting

pub mod domain;
pub mod dto;
pub mod policy;
pub mod service_message;
