//! Gate policy
//!
//! Pure rules deciding which branches are change requests and which changes
//! touch the watched dependency folders.

pub mod branch;
pub mod paths;

pub use branch::{DEFAULT_BRANCH_SENTINEL, extract_request_id, normalize_branch};
pub use paths::{PathMatcher, parse_watched_folders};
