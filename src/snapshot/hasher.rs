//! Content hashing capability for regular files.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::core::errors::{Result, TaskStateError};
use crate::snapshot::state::ContentHash;

/// Capability for computing a stable content hash of one regular file.
///
/// Consumed by the snapshotter; implementations must be shareable across
/// the hashing worker pool.
pub trait ContentHasher: Send + Sync {
    /// Hash the content of the regular file at `path`.
    fn hash_file(&self, path: &Path) -> Result<ContentHash>;
}

/// SHA-256 hasher reading file content in fixed-size chunks.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256ContentHasher;

impl ContentHasher for Sha256ContentHasher {
    fn hash_file(&self, path: &Path) -> Result<ContentHash> {
        let mut file = File::open(path).map_err(|e| TaskStateError::io(path, e))?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 8192];
        loop {
            let n = file.read(&mut buf).map_err(|e| TaskStateError::io(path, e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finalize().into())
    }
}
