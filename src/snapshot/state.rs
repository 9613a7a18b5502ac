//! Per-path snapshot states.

use serde::{Deserialize, Serialize};

/// 32-byte SHA-256 content hash of a regular file.
pub type ContentHash = [u8; 32];

/// Raw state observed for a single absolute path during one snapshot pass.
///
/// Directories and missing paths carry no content, only presence, so their
/// variants are payload-free sentinels. The file timestamp participates in
/// the persisted form and the cross-pass reuse cache, but *not* in content
/// comparison; see [`FileState::same_content`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileState {
    /// Regular file: content hash plus last-modified time in nanoseconds
    /// since the Unix epoch.
    File {
        /// SHA-256 of the file content.
        hash: ContentHash,
        /// Last-modified time in nanoseconds since the Unix epoch.
        modified_nanos: u128,
    },
    /// Directory sentinel.
    Directory,
    /// Missing-path sentinel.
    Missing,
}

impl FileState {
    /// Whether the path was observed as a regular file.
    pub const fn is_regular_file(&self) -> bool {
        matches!(self, Self::File { .. })
    }

    /// Whether the path was observed as missing.
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Content-level equality: files compare by hash only, ignoring the
    /// timestamp. A touched-but-unmodified file must not look changed.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::File { hash: a, .. }, Self::File { hash: b, .. }) => a == b,
            (Self::Directory, Self::Directory) | (Self::Missing, Self::Missing) => true,
            _ => false,
        }
    }
}
