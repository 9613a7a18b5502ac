//! Absolute-path string interner.
//!
//! Large builds snapshot the same trees for many properties; the same
//! absolute path string shows up once per property per pass. Interning
//! collapses those repeats into a single shared allocation, bounding memory
//! use across large trees.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

/// Deduplicates absolute-path strings into shared `Arc<str>` handles.
///
/// Thread-safe; one interner is typically shared by all snapshotters in a
/// process. Interned strings live as long as any handle does.
#[derive(Debug, Default)]
pub struct PathInterner {
    strings: Mutex<HashSet<Arc<str>>>,
}

impl PathInterner {
    /// Empty interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a shared handle for `s`, reusing a previous allocation when
    /// the same string was interned before.
    pub fn intern(&self, s: &str) -> Arc<str> {
        let mut strings = self.strings.lock();
        if let Some(existing) = strings.get(s) {
            return Arc::clone(existing);
        }
        let shared: Arc<str> = Arc::from(s);
        strings.insert(Arc::clone(&shared));
        shared
    }

    /// Number of distinct strings currently interned.
    pub fn len(&self) -> usize {
        self.strings.lock().len()
    }

    /// Whether no strings have been interned yet.
    pub fn is_empty(&self) -> bool {
        self.strings.lock().is_empty()
    }
}
