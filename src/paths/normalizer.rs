//! Source path canonicalization.
//!
//! Turns a frame's file path into an identifier that is the same on every
//! machine the traced code runs on, so that frames from different hosts,
//! virtualenvs, and checkouts compare equal.

use log::{debug, warn};
use std::collections::BTreeSet;

/// Snapshot of everything path normalization depends on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizerEnv {
    /// Basename of the traced process's working directory
    pub working_dir_name: String,

    /// Installed-package roots; a path under one of them is library code
    pub library_roots: Vec<String>,

    /// Absolute path of the project root, if configured
    pub project_root: Option<String>,

    /// Module search path entries of the traced interpreter
    pub module_search_paths: Vec<String>,
}

/// Which normalization rule produced the result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// `./x.py` rewritten under the working directory name
    CurrentDir,
    /// Any other relative path, left as-is
    Relative,
    /// Stripped a library root
    LibraryRoot(String),
    /// Stripped the parent of the project root
    ProjectRoot,
    /// Stripped the parent of a module search path entry
    SearchPath(String),
    /// Several search path parents matched; path left as-is
    Ambiguous(Vec<String>),
    /// Nothing matched; path left as-is
    Unresolved,
}

/// Path normalizer over a fixed environment snapshot
#[derive(Debug, Clone, Default)]
pub struct PathNormalizer {
    env: NormalizerEnv,
}

impl PathNormalizer {
    pub fn new(env: NormalizerEnv) -> Self {
        Self { env }
    }

    pub fn env(&self) -> &NormalizerEnv {
        &self.env
    }

    /// Normalize a path, warning when the search path resolution is ambiguous
    pub fn normalize(&self, path: &str) -> String {
        let (normalized, resolution) = self.resolve(path);
        if let Resolution::Ambiguous(candidates) = &resolution {
            warn!(
                "unable to find file '{}', multiple matches found: {}",
                path,
                candidates.join(",")
            );
        }
        normalized
    }

    /// Normalize a path and report which rule applied
    ///
    /// Rules are tried in order and the first match wins.
    pub fn resolve(&self, path: &str) -> (String, Resolution) {
        if !is_absolute(path) {
            return match strip_current_dir(path) {
                Some(relative) => (self.under_working_dir(&relative), Resolution::CurrentDir),
                None => (path.to_string(), Resolution::Relative),
            };
        }

        if let Some((root, rest)) = self.strip_library_root(path) {
            return (rest.to_string(), Resolution::LibraryRoot(root.to_string()));
        }

        if let Some(root) = &self.env.project_root {
            if let Some(rest) = strip_dir_prefix(path, parent_dir(root)) {
                return (rest.to_string(), Resolution::ProjectRoot);
            }
        }

        let candidates: BTreeSet<&str> = self
            .env
            .module_search_paths
            .iter()
            .map(|entry| parent_dir(entry))
            .filter(|parent| strip_dir_prefix(path, parent).is_some())
            .collect();

        match candidates.len() {
            0 => (path.to_string(), Resolution::Unresolved),
            1 => {
                let parent = candidates.into_iter().next().unwrap_or_default();
                let rest = strip_dir_prefix(path, parent).unwrap_or(path);
                debug!("Resolved {} through search path parent {}", path, parent);
                (rest.to_string(), Resolution::SearchPath(parent.to_string()))
            }
            _ => (
                path.to_string(),
                Resolution::Ambiguous(candidates.into_iter().map(str::to_string).collect()),
            ),
        }
    }

    /// Longest library root containing the path, with the remainder
    fn strip_library_root<'p>(&'p self, path: &'p str) -> Option<(&'p str, &'p str)> {
        self.env
            .library_roots
            .iter()
            .filter_map(|root| strip_dir_prefix(path, root).map(|rest| (root.as_str(), rest)))
            .max_by_key(|(root, _)| root.len())
    }

    fn under_working_dir(&self, relative: &str) -> String {
        if self.env.working_dir_name.is_empty() {
            relative.to_string()
        } else if relative.is_empty() {
            self.env.working_dir_name.clone()
        } else {
            format!("{}/{}", self.env.working_dir_name, relative)
        }
    }
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Absolute on either POSIX or Windows conventions
fn is_absolute(path: &str) -> bool {
    if path.starts_with(is_separator) {
        return true;
    }
    let bytes = path.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && is_separator(bytes[2] as char)
}

/// Lexically clean a `./`-prefixed path; `None` for other relative paths
fn strip_current_dir(path: &str) -> Option<String> {
    if !(path.starts_with("./") || path.starts_with(".\\")) {
        return None;
    }

    let mut parts: Vec<&str> = Vec::new();
    for part in path.split(is_separator) {
        match part {
            "" | "." => {}
            ".." if parts.last().is_some_and(|last| *last != "..") => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Directory part of a path (`/a/b/c` -> `/a/b`, `/a` -> `/`)
fn parent_dir(path: &str) -> &str {
    let trimmed = path.trim_end_matches(is_separator);
    match trimmed.rfind(is_separator) {
        Some(0) => &path[..1],
        Some(idx) => &trimmed[..idx],
        None => "",
    }
}

/// Remainder of `path` below `dir`, only for strict descendants
///
/// The filesystem root is never a prefix: no path descends from `""`.
fn strip_dir_prefix<'p>(path: &'p str, dir: &str) -> Option<&'p str> {
    let dir = dir.trim_end_matches(is_separator);
    if dir.is_empty() {
        return None;
    }
    let rest = path.strip_prefix(dir)?;
    let rest = rest.strip_prefix(is_separator)?;
    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}
