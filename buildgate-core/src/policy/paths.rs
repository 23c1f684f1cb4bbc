//! Watched-folder matching
//!
//! Both the watched folders and the directories of changed files are turned
//! into absolute, symlink-resolved paths relative to a base directory (the
//! checkout the gate runs in). A change hits a watched folder when the watched
//! path is a *substring* of the changed directory path.
//!
//! Substring matching is loose: `Libs` also matches `Libs2/x`. A blank
//! entry resolves to the base directory itself, so it matches every change
//! under the checkout.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::domain::change::ChangedPath;

/// Split a `;`-separated folder list
///
/// Entries are trimmed but blank ones are kept: `"Libs;"` watches `Libs`
/// and the whole checkout.
pub fn parse_watched_folders(list: &str) -> Vec<String> {
    list.split(';').map(|s| s.trim().to_string()).collect()
}

/// Decides whether a set of changed paths touches any watched folder
#[derive(Debug, Clone)]
pub struct PathMatcher {
    base_dir: PathBuf,
}

impl PathMatcher {
    /// Create a matcher resolving relative paths against `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Create a matcher rooted at the process working directory
    pub fn from_current_dir() -> io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// First watched folder hit by any of the changed paths
    pub fn first_match<'a, 'p>(
        &self,
        changed_paths: impl IntoIterator<Item = &'p ChangedPath>,
        watched_folders: &'a [String],
    ) -> Option<&'a str> {
        let watched: Vec<(&str, String)> = watched_folders
            .iter()
            .map(|folder| {
                let resolved = self.canonicalize(Path::new(folder));
                (folder.as_str(), resolved.to_string_lossy().into_owned())
            })
            .collect();

        if watched.is_empty() {
            return None;
        }

        for changed in changed_paths {
            let resolved = self.canonicalize(&changed.parent);
            let resolved = resolved.to_string_lossy();

            if let Some((folder, _)) = watched
                .iter()
                .find(|(_, watched_path)| resolved.contains(watched_path.as_str()))
            {
                return Some(*folder);
            }
        }

        None
    }

    /// Whether any changed path lies in (or string-overlaps) a watched folder
    pub fn requires_build<'p>(
        &self,
        changed_paths: impl IntoIterator<Item = &'p ChangedPath>,
        watched_folders: &[String],
    ) -> bool {
        self.first_match(changed_paths, watched_folders).is_some()
    }

    /// Absolute path with `.`/`..` removed and symlinks resolved where the path exists
    ///
    /// Paths that don't exist are resolved up to their deepest existing
    /// ancestor and the remainder is appended unchanged.
    pub fn canonicalize(&self, path: &Path) -> PathBuf {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        };
        let normalized = normalize_lexically(&absolute);

        let mut existing = normalized.as_path();
        let mut remainder = Vec::new();
        loop {
            if let Ok(resolved) = fs::canonicalize(existing) {
                let mut out = resolved;
                for part in remainder.iter().rev() {
                    out.push(part);
                }
                return out;
            }
            match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    remainder.push(name.to_os_string());
                    existing = parent;
                }
                _ => return normalized,
            }
        }
    }
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changed(paths: &[&str]) -> Vec<ChangedPath> {
        paths.iter().map(|p| ChangedPath::from_file_path(p)).collect()
    }

    #[test]
    fn test_parse_watched_folders() {
        assert_eq!(
            parse_watched_folders("Sources/Internal;Libs; Programs/"),
            vec!["Sources/Internal", "Libs", "Programs/"]
        );
        assert_eq!(parse_watched_folders("Libs;"), vec!["Libs", ""]);
        assert_eq!(parse_watched_folders(""), vec![""]);
    }

    #[test]
    fn test_blank_entry_watches_whole_checkout() {
        let matcher = PathMatcher::new("/repo");
        let paths = changed(&["Docs/readme.md"]);

        assert!(matcher.requires_build(&paths, &parse_watched_folders("Libs;")));
        assert_eq!(
            matcher.first_match(&paths, &parse_watched_folders("Libs;")),
            Some("")
        );
        assert!(matcher.requires_build(&paths, &parse_watched_folders("")));
        assert!(!matcher.requires_build(&paths, &parse_watched_folders("Libs")));
    }

    #[test]
    fn test_change_inside_watched_folder() {
        let matcher = PathMatcher::new("/repo");
        let paths = changed(&["/repo/Libs/x.cpp"]);
        assert!(matcher.requires_build(&paths, &["Libs".to_string()]));
    }

    #[test]
    fn test_change_outside_watched_folder() {
        let matcher = PathMatcher::new("/repo");
        let paths = changed(&["/repo/Other/x.cpp"]);
        assert!(!matcher.requires_build(&paths, &["Libs".to_string()]));
    }

    #[test]
    fn test_relative_changed_paths_resolve_against_base() {
        let matcher = PathMatcher::new("/repo");
        let paths = changed(&["Sources/Internal/Render/Material.cpp", "README.md"]);
        let watched = vec!["Tools".to_string(), "Sources/Internal".to_string()];
        assert_eq!(
            matcher.first_match(&paths, &watched),
            Some("Sources/Internal")
        );
    }

    #[test]
    fn test_root_level_file_does_not_match() {
        let matcher = PathMatcher::new("/repo");
        let paths = changed(&["README.md"]);
        assert!(!matcher.requires_build(&paths, &["Libs".to_string()]));
    }

    #[test]
    fn test_substring_overlap_matches_sibling() {
        let matcher = PathMatcher::new("/repo");
        let paths = changed(&["Libs2/x.cpp"]);
        assert!(matcher.requires_build(&paths, &["Libs".to_string()]));
    }

    #[test]
    fn test_dot_dot_is_normalized() {
        let matcher = PathMatcher::new("/repo/Programs");
        let paths = changed(&["/repo/Libs/x.cpp"]);
        assert!(matcher.requires_build(&paths, &["../Libs".to_string()]));
    }

    #[test]
    fn test_no_watched_folders() {
        let matcher = PathMatcher::new("/repo");
        let paths = changed(&["Libs/x.cpp"]);
        assert!(!matcher.requires_build(&paths, &[]));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_base_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir_all(real.join("Libs")).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let matcher = PathMatcher::new(&link);
        let resolved = matcher.canonicalize(Path::new("Libs"));
        assert_eq!(resolved, std::fs::canonicalize(real.join("Libs")).unwrap());

        // watched folder given through the real path still matches
        let watched = vec![real.join("Libs").to_string_lossy().into_owned()];
        let paths = changed(&["Libs/Sub/x.cpp"]);
        assert!(matcher.requires_build(&paths, &watched));
    }
}
