//! Data Transfer Objects for the collaborator REST APIs
//!
//! These mirror the JSON shapes of the Stash (Bitbucket Server) and TeamCity
//! REST APIs and convert into the domain types. Only the fields buildgate
//! uses are modelled; everything else is ignored on deserialization.

pub mod stash;
pub mod teamcity;
