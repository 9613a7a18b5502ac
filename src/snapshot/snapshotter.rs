//! File Collection Snapshotter.
//!
//! Walks a set of root file-collection elements and produces an ordered
//! map of normalized snapshots. Traversal and hashing for one request hold
//! no lock shared with other requests; the only synchronized state is the
//! optional cross-pass reuse cache, whose entries are committed in a
//! single exclusive region after the (parallel, unsynchronized) hashing
//! work has finished.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, UNIX_EPOCH};

use crossbeam_channel as channel;
use parking_lot::Mutex;
use tracing::debug;

use crate::core::config::SnapshotConfig;
use crate::core::errors::{Result, TaskStateError};
use crate::core::intern::PathInterner;
use crate::snapshot::collection::{
    CompareStrategy, CompiledFilter, FileCollectionElement, FileCollectionSnapshot, SnapshotEntry,
};
use crate::snapshot::hasher::ContentHasher;
use crate::snapshot::normalize::{PathSensitivity, normalized_key};
use crate::snapshot::state::{ContentHash, FileState};

/// Counters describing snapshotter activity since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotterStats {
    /// Regular files whose content was hashed.
    pub files_hashed: u64,
    /// Regular files whose state was reused from the cross-pass cache.
    pub files_reused: u64,
    /// Directory trees walked.
    pub trees_walked: u64,
}

/// Cached per-path state for cross-pass reuse.
#[derive(Debug, Clone)]
struct CachedState {
    modified_nanos: u128,
    state: FileState,
}

/// A raw entry collected during the walk phase, in traversal order.
#[derive(Debug)]
struct RawEntry {
    absolute: Arc<str>,
    path: PathBuf,
    /// Root element the entry was discovered under; the base for
    /// `Relative` normalization.
    root: PathBuf,
    state: RawState,
}

#[derive(Debug)]
enum RawState {
    /// Regular file whose hash has not been computed yet.
    Pending { modified_nanos: u128 },
    Known(FileState),
}

/// Converts live filesystem content into comparable, normalized snapshots.
///
/// Safe to share across concurrently snapshotted tasks: each request
/// builds its own result, and the reuse cache serializes only around the
/// moment entries are committed.
pub struct FileCollectionSnapshotter {
    hasher: Arc<dyn ContentHasher>,
    interner: Arc<PathInterner>,
    config: SnapshotConfig,
    reuse: Mutex<HashMap<Arc<str>, CachedState>>,
    files_hashed: AtomicU64,
    files_reused: AtomicU64,
    trees_walked: AtomicU64,
}

impl FileCollectionSnapshotter {
    /// Snapshotter using `hasher` for file content and `interner` for
    /// absolute-path deduplication.
    pub fn new(
        hasher: Arc<dyn ContentHasher>,
        interner: Arc<PathInterner>,
        config: SnapshotConfig,
    ) -> Self {
        Self {
            hasher,
            interner,
            config,
            reuse: Mutex::new(HashMap::new()),
            files_hashed: AtomicU64::new(0),
            files_reused: AtomicU64::new(0),
            trees_walked: AtomicU64::new(0),
        }
    }

    /// Snapshot the given root elements, in their declared order.
    ///
    /// Emits per path: a `File` entry for existing regular files, a
    /// `Directory` entry for a directory followed by its depth-first
    /// contents, and a single `Missing` entry (no descent) for paths that
    /// exist as neither. Duplicate absolute paths across elements resolve
    /// first-wins. A path becoming unreadable mid-walk aborts the whole
    /// request; a partial snapshot would be indistinguishable from
    /// "input removed".
    pub fn snapshot(
        &self,
        elements: &[FileCollectionElement],
        compare_strategy: CompareStrategy,
        path_sensitivity: PathSensitivity,
    ) -> Result<FileCollectionSnapshot> {
        debug!(
            elements = elements.len(),
            ?compare_strategy,
            ?path_sensitivity,
            "snapshotting file collection"
        );

        let mut raw: Vec<RawEntry> = Vec::new();
        let mut seen: HashSet<Arc<str>> = HashSet::new();
        for element in elements {
            self.collect_element(element, &mut raw, &mut seen)?;
        }
        if raw.is_empty() {
            return Ok(FileCollectionSnapshot::empty(compare_strategy));
        }

        self.resolve_pending(&mut raw)?;

        let mut entries = Vec::with_capacity(raw.len());
        for item in raw {
            let RawState::Known(state) = item.state else {
                continue;
            };
            // A key of None means the entry is suppressed from the result.
            if let Some(key) = normalized_key(path_sensitivity, &item.root, &item.path) {
                entries.push(SnapshotEntry {
                    absolute_path: item.absolute,
                    normalized_key: key,
                    state,
                });
            }
        }
        Ok(FileCollectionSnapshot::new(entries, compare_strategy))
    }

    /// Counters since construction.
    pub fn stats(&self) -> SnapshotterStats {
        SnapshotterStats {
            files_hashed: self.files_hashed.load(Ordering::Relaxed),
            files_reused: self.files_reused.load(Ordering::Relaxed),
            trees_walked: self.trees_walked.load(Ordering::Relaxed),
        }
    }

    /// Collect raw entries for one root element.
    ///
    /// The emitted state follows the filesystem, not the element's
    /// declared kind: a tree element whose root turns out to be a regular
    /// file degrades to a single file entry.
    fn collect_element(
        &self,
        element: &FileCollectionElement,
        raw: &mut Vec<RawEntry>,
        seen: &mut HashSet<Arc<str>>,
    ) -> Result<()> {
        let root = element.path();
        let filter = match element {
            FileCollectionElement::Tree { filter, .. } => filter.compile()?,
            FileCollectionElement::File(_) | FileCollectionElement::Directory(_) => {
                CompiledFilter::default()
            }
        };

        let meta = match fs::metadata(root) {
            Ok(meta) => meta,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                self.push_entry(raw, seen, root, root, RawState::Known(FileState::Missing));
                return Ok(());
            }
            Err(err) => return Err(TaskStateError::io(root, err)),
        };

        if meta.is_file() {
            let state = RawState::Pending {
                modified_nanos: modified_nanos(&meta),
            };
            self.push_entry(raw, seen, root, root, state);
        } else if meta.is_dir() {
            // The directory's own entry comes first, then its contents.
            self.push_entry(raw, seen, root, root, RawState::Known(FileState::Directory));
            self.trees_walked.fetch_add(1, Ordering::Relaxed);
            self.walk_tree(root, root, &filter, raw, seen)?;
        } else {
            self.push_entry(raw, seen, root, root, RawState::Known(FileState::Missing));
        }
        Ok(())
    }

    /// Depth-first walk in lexicographic child order, which keeps
    /// `Ordered` snapshots deterministic across passes.
    fn walk_tree(
        &self,
        root: &Path,
        dir: &Path,
        filter: &CompiledFilter,
        raw: &mut Vec<RawEntry>,
        seen: &mut HashSet<Arc<str>>,
    ) -> Result<()> {
        let iter = fs::read_dir(dir).map_err(|e| TaskStateError::io(dir, e))?;
        let mut children: Vec<PathBuf> = Vec::new();
        for entry in iter {
            let entry = entry.map_err(|e| TaskStateError::io(dir, e))?;
            children.push(entry.path());
        }
        children.sort();

        for child in children {
            let meta = fs::symlink_metadata(&child).map_err(|e| TaskStateError::io(&child, e))?;
            if meta.is_symlink() {
                if !self.config.follow_symlinks {
                    continue;
                }
                match fs::metadata(&child) {
                    Ok(target) => {
                        self.visit_child(root, &child, &target, filter, raw, seen)?;
                    }
                    Err(err) if err.kind() == ErrorKind::NotFound => {
                        // Dangling symlink: the path resolves to nothing.
                        self.push_entry(raw, seen, &child, root, RawState::Known(FileState::Missing));
                    }
                    Err(err) => return Err(TaskStateError::io(&child, err)),
                }
            } else {
                self.visit_child(root, &child, &meta, filter, raw, seen)?;
            }
        }
        Ok(())
    }

    fn visit_child(
        &self,
        root: &Path,
        child: &Path,
        meta: &fs::Metadata,
        filter: &CompiledFilter,
        raw: &mut Vec<RawEntry>,
        seen: &mut HashSet<Arc<str>>,
    ) -> Result<()> {
        let rel = child
            .strip_prefix(root)
            .map(|r| r.to_string_lossy().into_owned())
            .unwrap_or_default();

        if meta.is_dir() {
            if !filter.admits_dir(&rel) {
                return Ok(());
            }
            self.push_entry(raw, seen, child, root, RawState::Known(FileState::Directory));
            self.walk_tree(root, child, filter, raw, seen)?;
        } else if meta.is_file() {
            if !filter.admits_file(&rel) {
                return Ok(());
            }
            let state = RawState::Pending {
                modified_nanos: modified_nanos(meta),
            };
            self.push_entry(raw, seen, child, root, state);
        } else {
            // Special files (fifos, sockets) carry no snapshotable content.
            self.push_entry(raw, seen, child, root, RawState::Known(FileState::Missing));
        }
        Ok(())
    }

    /// First-wins insertion keyed by interned absolute path.
    fn push_entry(
        &self,
        raw: &mut Vec<RawEntry>,
        seen: &mut HashSet<Arc<str>>,
        path: &Path,
        root: &Path,
        state: RawState,
    ) {
        let absolute = self.interner.intern(&path.to_string_lossy());
        if !seen.insert(Arc::clone(&absolute)) {
            return;
        }
        raw.push(RawEntry {
            absolute,
            path: path.to_path_buf(),
            root: root.to_path_buf(),
            state,
        });
    }

    /// Hash all pending file entries, consulting and then updating the
    /// cross-pass reuse cache.
    fn resolve_pending(&self, raw: &mut Vec<RawEntry>) -> Result<()> {
        let mut jobs: Vec<(usize, PathBuf)> = Vec::new();

        if self.config.reuse_file_states {
            let cache = self.reuse.lock();
            for (idx, entry) in raw.iter_mut().enumerate() {
                let RawState::Pending { modified_nanos } = entry.state else {
                    continue;
                };
                match cache.get(&entry.absolute) {
                    Some(cached) if cached.modified_nanos == modified_nanos => {
                        entry.state = RawState::Known(cached.state.clone());
                        self.files_reused.fetch_add(1, Ordering::Relaxed);
                    }
                    _ => jobs.push((idx, entry.path.clone())),
                }
            }
        } else {
            for (idx, entry) in raw.iter().enumerate() {
                if matches!(entry.state, RawState::Pending { .. }) {
                    jobs.push((idx, entry.path.clone()));
                }
            }
        }

        if jobs.is_empty() {
            return Ok(());
        }

        let results = self.hash_jobs(jobs)?;
        self.files_hashed
            .fetch_add(results.len() as u64, Ordering::Relaxed);

        for (idx, hash) in &results {
            let RawState::Pending { modified_nanos } = raw[*idx].state else {
                continue;
            };
            raw[*idx].state = RawState::Known(FileState::File {
                hash: *hash,
                modified_nanos,
            });
        }

        if self.config.reuse_file_states {
            // Single-writer commit region; hashing already happened outside.
            let mut cache = self.reuse.lock();
            for (idx, _) in &results {
                if let RawState::Known(state) = &raw[*idx].state
                    && let FileState::File { modified_nanos, .. } = state
                {
                    cache.insert(
                        Arc::clone(&raw[*idx].absolute),
                        CachedState {
                            modified_nanos: *modified_nanos,
                            state: state.clone(),
                        },
                    );
                }
            }
        }
        Ok(())
    }

    /// Hash the given (index, path) jobs, fanning out over a worker pool
    /// when configured and worthwhile. Any hashing failure fails the
    /// whole request.
    fn hash_jobs(&self, jobs: Vec<(usize, PathBuf)>) -> Result<Vec<(usize, ContentHash)>> {
        let workers = self.config.hash_parallelism.min(jobs.len());
        if workers <= 1 {
            let mut results = Vec::with_capacity(jobs.len());
            for (idx, path) in jobs {
                results.push((idx, self.hasher.hash_file(&path)?));
            }
            return Ok(results);
        }

        let expected = jobs.len();
        let (job_tx, job_rx) = channel::unbounded::<(usize, PathBuf)>();
        for job in jobs {
            job_tx
                .send(job)
                .map_err(|_| TaskStateError::ChannelClosed { component: "hash pool" })?;
        }
        drop(job_tx);

        let (result_tx, result_rx) = channel::unbounded::<(usize, Result<ContentHash>)>();
        let outcomes = thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let hasher = &*self.hasher;
                scope.spawn(move || {
                    for (idx, path) in job_rx.iter() {
                        if result_tx.send((idx, hasher.hash_file(&path))).is_err() {
                            return;
                        }
                    }
                });
            }
            drop(result_tx);
            result_rx.iter().collect::<Vec<_>>()
        });

        if outcomes.len() != expected {
            return Err(TaskStateError::ChannelClosed { component: "hash pool" });
        }
        let mut results = Vec::with_capacity(expected);
        for (idx, outcome) in outcomes {
            results.push((idx, outcome?));
        }
        Ok(results)
    }
}

fn modified_nanos(meta: &fs::Metadata) -> u128 {
    meta.modified()
        .unwrap_or(UNIX_EPOCH)
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_nanos()
}
