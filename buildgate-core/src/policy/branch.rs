//! Branch naming rules
//!
//! Review branches look like `<anything>/<request id>/<from|merge>` or are a
//! bare numeric request id.

/// Client branch value meaning "use the configuration default"
pub const DEFAULT_BRANCH_SENTINEL: &str = "<default>";

/// Extract the change request id encoded in a branch name
///
/// A single-segment branch is an id only when it is all digits. With more
/// than one segment the second-to-last segment is taken as-is, digits or not.
pub fn extract_request_id(branch: &str) -> Option<String> {
    let segments: Vec<&str> = branch.split('/').collect();

    match segments.as_slice() {
        [single] => {
            if !single.is_empty() && single.chars().all(|c| c.is_ascii_digit()) {
                Some(single.to_string())
            } else {
                None
            }
        }
        [.., id, _] => Some(id.to_string()),
        [] => None,
    }
}

/// Rewrite `/from` review refs to their `/merge` counterpart when `convert` is set
pub fn normalize_branch(branch: &str, convert: bool) -> String {
    if convert && branch.contains("/from") {
        branch.replace("/from", "/merge")
    } else {
        branch.to_string()
    }
}
