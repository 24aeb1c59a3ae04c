//! Helpers for `/`-separated storage paths.

use crate::error::{MetadataError, MetadataResult};

/// Validates `path` and returns its canonical form (no leading or trailing `/`).
pub fn normalize(path: &str) -> MetadataResult<String> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    for segment in trimmed.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(MetadataError::InvalidPath(path.to_string()));
        }
    }
    Ok(trimmed.to_string())
}

/// Joins two path fragments with a single `/`.
pub fn join(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    match (base.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{base}/{name}"),
    }
}

/// Returns the last segment of a path.
pub fn base(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Returns the parent of a canonical path; the parent of a top-level node is the root (`""`).
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Returns every proper ancestor of a canonical path, outermost first, excluding the root.
pub fn ancestors(path: &str) -> Vec<&str> {
    path.match_indices('/').map(|(idx, _)| &path[..idx]).collect()
}
