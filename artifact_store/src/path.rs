//! `/`-delimited key helpers.
//!
//! Object keys are always joined with `/`, whatever the local platform's
//! separator is.

use std::path::{Component, Path};

/// Join `part` onto `base` with a single `/`.
///
/// An absolute `part` replaces `base`, and an empty `base` yields `part`
/// unchanged.
pub fn join(base: &str, part: &str) -> String {
    if part.starts_with('/') || base.is_empty() {
        part.to_string()
    } else if base.ends_with('/') {
        format!("{base}{part}")
    } else {
        format!("{base}/{part}")
    }
}

/// Join an optional sub-path onto `base`. `None` and `Some("")` leave `base`
/// untouched.
pub fn join_opt(base: &str, part: Option<&str>) -> String {
    match part {
        Some(part) if !part.is_empty() => join(base, part),
        _ => base.to_string(),
    }
}

/// Express `key` relative to `start`.
///
/// Callers check that `key` begins with `start` first. Separators left over
/// at either end are dropped, so the common prefix `run/sub/` relative to
/// `run` is `sub`.
pub fn relative_to(key: &str, start: &str) -> String {
    let rest = key.strip_prefix(start).unwrap_or(key);
    let rest = rest.trim_matches('/');
    if rest.is_empty() {
        ".".to_string()
    } else {
        rest.to_string()
    }
}

/// Convert a relative local filesystem path into a `/`-joined artifact path.
pub fn to_artifact_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Final component of a local path, as used for the uploaded object's name.
pub fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
