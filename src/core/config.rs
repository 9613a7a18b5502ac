//! Engine configuration: TOML file + defaults.
//!
//! Every behavior knob is an explicit field handed to the snapshotter's
//! constructor; no ambient process-global toggles.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, TaskStateError};

/// Full engine configuration model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Snapshotter tuning.
    pub snapshot: SnapshotConfig,
}

/// Snapshotter behavior knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Reuse per-path file states across snapshot passes when the
    /// filesystem mtime is unchanged. Pure performance optimization;
    /// disabling it never changes observable results.
    pub reuse_file_states: bool,
    /// Worker threads used for content hashing within one snapshot pass.
    /// Values of 0 or 1 hash serially.
    pub hash_parallelism: usize,
    /// Whether directory walks descend into symlinked directories.
    pub follow_symlinks: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            reuse_file_states: false,
            hash_parallelism: 4,
            follow_symlinks: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TaskStateError::MissingConfig {
                path: path.to_path_buf(),
            });
        }
        let raw = fs::read_to_string(path).map_err(|e| TaskStateError::io(path, e))?;
        Ok(toml::from_str(&raw)?)
    }
}
