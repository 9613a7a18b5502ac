//! File-collection root elements, compare strategies, and snapshot results.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::core::errors::Result;
use crate::snapshot::state::{ContentHash, FileState};

/// One root element of a file collection, in declared order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileCollectionElement {
    /// A single file path.
    File(PathBuf),
    /// A single directory, walked recursively without filtering.
    Directory(PathBuf),
    /// A directory tree walked with include/exclude glob filters.
    Tree {
        /// Directory the walk starts from.
        root: PathBuf,
        /// Include/exclude patterns applied during the walk.
        filter: TreeFilter,
    },
}

impl FileCollectionElement {
    /// The root path this element refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::File(p) | Self::Directory(p) => p,
            Self::Tree { root, .. } => root,
        }
    }
}

/// Include/exclude glob patterns for a directory tree element.
///
/// Patterns match paths relative to the tree root, with `/` separators.
/// An empty include list admits every file. Excludes prune: a directory
/// matching an exclude pattern is skipped entirely, subtree included.
/// Include patterns select files; directories are always visited (and
/// emitted) unless excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeFilter {
    /// Glob patterns selecting files; empty means every file.
    pub includes: Vec<String>,
    /// Glob patterns pruning files and whole subtrees.
    pub excludes: Vec<String>,
}

impl TreeFilter {
    /// Filter from include and exclude pattern lists.
    pub fn new(
        includes: impl IntoIterator<Item = impl Into<String>>,
        excludes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            includes: includes.into_iter().map(Into::into).collect(),
            excludes: excludes.into_iter().map(Into::into).collect(),
        }
    }

    /// Compile the patterns for matching during a walk.
    pub fn compile(&self) -> Result<CompiledFilter> {
        Ok(CompiledFilter {
            includes: build_globset(&self.includes)?,
            excludes: build_globset(&self.excludes)?,
        })
    }
}

fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(Some(builder.build()?))
}

/// Compiled form of a [`TreeFilter`].
#[derive(Debug, Clone, Default)]
pub struct CompiledFilter {
    includes: Option<GlobSet>,
    excludes: Option<GlobSet>,
}

impl CompiledFilter {
    /// Whether a file at tree-relative path `rel` belongs in the snapshot.
    #[must_use]
    pub fn admits_file(&self, rel: &str) -> bool {
        if self.excludes.as_ref().is_some_and(|g| g.is_match(rel)) {
            return false;
        }
        self.includes.as_ref().is_none_or(|g| g.is_match(rel))
    }

    /// Whether the walk descends into (and emits) a directory at `rel`.
    #[must_use]
    pub fn admits_dir(&self, rel: &str) -> bool {
        !self.excludes.as_ref().is_some_and(|g| g.is_match(rel))
    }
}

/// Whether snapshot entries compare as an ordered sequence or a set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareStrategy {
    /// Entry sequences must match element-by-element, including order.
    Ordered,
    /// Key/value mappings must match as sets, order-independent.
    #[default]
    Unordered,
}

/// One normalized snapshot entry: the comparison key and value actually
/// stored, plus the absolute path it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Interned absolute path the entry was produced for.
    pub absolute_path: Arc<str>,
    /// Comparison key under the owning property's path sensitivity.
    pub normalized_key: String,
    /// Raw state observed for the path.
    pub state: FileState,
}

/// Immutable, normalized fingerprint of one file collection.
///
/// Entry order reflects traversal order; it only matters for comparison
/// when the strategy is [`CompareStrategy::Ordered`]. Created fresh on
/// every snapshotter invocation and never mutated afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCollectionSnapshot {
    entries: Vec<SnapshotEntry>,
    compare_strategy: CompareStrategy,
}

impl FileCollectionSnapshot {
    pub(crate) fn new(entries: Vec<SnapshotEntry>, compare_strategy: CompareStrategy) -> Self {
        Self {
            entries,
            compare_strategy,
        }
    }

    /// An empty snapshot under the given strategy.
    #[must_use]
    pub fn empty(compare_strategy: CompareStrategy) -> Self {
        Self::new(Vec::new(), compare_strategy)
    }

    /// Entries in traversal order.
    #[must_use]
    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    /// The comparison strategy fixed by the owning declaration.
    #[must_use]
    pub const fn compare_strategy(&self) -> CompareStrategy {
        self.compare_strategy
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether this snapshot represents the same collection state as
    /// `previous`, under this snapshot's compare strategy.
    ///
    /// File entries compare by content hash; timestamps are ignored.
    #[must_use]
    pub fn unchanged_since(&self, previous: &Self) -> bool {
        if self.entries.len() != previous.entries.len() {
            return false;
        }
        match self.compare_strategy {
            CompareStrategy::Ordered => self
                .comparison_items()
                .eq(previous.comparison_items()),
            CompareStrategy::Unordered => {
                let mut ours: Vec<_> = self.comparison_items().collect();
                let mut theirs: Vec<_> = previous.comparison_items().collect();
                ours.sort_unstable();
                theirs.sort_unstable();
                ours == theirs
            }
        }
    }

    /// Set-based difference against `previous`, keyed by normalized key.
    ///
    /// Intended for change reporting; [`Self::unchanged_since`] is the
    /// authoritative equality check (it also sees pure reordering under
    /// the `Ordered` strategy, which this diff does not).
    #[must_use]
    pub fn changes_since(&self, previous: &Self) -> SnapshotDiff {
        let ours: std::collections::BTreeMap<&str, &FileState> = self
            .entries
            .iter()
            .map(|e| (e.normalized_key.as_str(), &e.state))
            .collect();
        let theirs: std::collections::BTreeMap<&str, &FileState> = previous
            .entries
            .iter()
            .map(|e| (e.normalized_key.as_str(), &e.state))
            .collect();

        let mut diff = SnapshotDiff::default();
        for (key, state) in &ours {
            match theirs.get(key) {
                None => diff.added.push((*key).to_string()),
                Some(prev) if !state.same_content(prev) => diff.modified.push((*key).to_string()),
                Some(_) => {}
            }
        }
        for key in theirs.keys() {
            if !ours.contains_key(key) {
                diff.removed.push((*key).to_string());
            }
        }
        diff
    }

    fn comparison_items(&self) -> impl Iterator<Item = (&str, ContentKey<'_>)> {
        self.entries
            .iter()
            .map(|e| (e.normalized_key.as_str(), content_key(&e.state)))
    }
}

/// Content-only projection of a [`FileState`], used for comparison.
type ContentKey<'a> = (u8, Option<&'a ContentHash>);

fn content_key(state: &FileState) -> ContentKey<'_> {
    match state {
        FileState::File { hash, .. } => (0, Some(hash)),
        FileState::Directory => (1, None),
        FileState::Missing => (2, None),
    }
}

/// Normalized-key level difference between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// Keys present now but not previously.
    pub added: Vec<String>,
    /// Keys present previously but gone now.
    pub removed: Vec<String>,
    /// Keys whose content state changed.
    pub modified: Vec<String>,
}

impl SnapshotDiff {
    /// Whether the diff records no change at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}
