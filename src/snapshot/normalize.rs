//! Path-sensitivity normalization.
//!
//! A raw per-path state becomes a comparison key according to the owning
//! property's path-sensitivity policy. The policy controls how much of a
//! file's path identity participates in comparison: full path, path
//! relative to the declared root, name only, or nothing at all.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// How much of a path's identity participates in snapshot comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathSensitivity {
    /// Key by full absolute path.
    #[default]
    Absolute,
    /// Key by path relative to the declared root element.
    Relative,
    /// Key by the final path segment only, discarding directory structure.
    NameOnly,
    /// Suppress the entry entirely; only existence/count matters upstream.
    None,
}

/// Derive the comparison key for `path` under `sensitivity`.
///
/// `root` is the root element the entry was discovered under. Returns
/// `None` when the policy suppresses the entry. The root element itself
/// keys by its final segment under `Relative` (a relative path of `""`
/// would collide across roots).
#[must_use]
pub fn normalized_key(sensitivity: PathSensitivity, root: &Path, path: &Path) -> Option<String> {
    match sensitivity {
        PathSensitivity::Absolute => Some(path.to_string_lossy().into_owned()),
        PathSensitivity::Relative => {
            let rel = path.strip_prefix(root).ok().filter(|r| !r.as_os_str().is_empty());
            match rel {
                Some(rel) => Some(rel.to_string_lossy().into_owned()),
                None => Some(name_of(path)),
            }
        }
        PathSensitivity::NameOnly => Some(name_of(path)),
        PathSensitivity::None => None,
    }
}

fn name_of(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.to_string_lossy().into_owned(), |n| n.to_string_lossy().into_owned())
}
