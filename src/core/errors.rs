//! TS-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the crate.
pub type Result<T> = std::result::Result<T, TaskStateError>;

/// Top-level error type for the task state engine.
///
/// Configuration errors (TS-1xxx) indicate a task type that can never be
/// snapshotted correctly and are fatal at schema-build time. IO and channel
/// failures (TS-3xxx) are fatal for the current snapshot request only.
/// Expected validation violations are *not* errors; they travel as
/// accumulated messages through the value visitor.
#[derive(Debug, Error)]
pub enum TaskStateError {
    #[error("[TS-1001] invalid schema for type {type_name}: {details}")]
    InvalidSchema { type_name: String, details: String },

    #[error(
        "[TS-1002] property '{property}' of type {type_name} is declared both as {first} and {second}"
    )]
    ConflictingRoles {
        type_name: String,
        property: String,
        first: &'static str,
        second: &'static str,
    },

    #[error(
        "[TS-1003] iterable nested property '{property}' of type {type_name} must be declared order-sensitive"
    )]
    MissingOrderSensitivity { type_name: String, property: String },

    #[error("[TS-1004] unknown task type: {type_name}")]
    UnknownType { type_name: String },

    #[error("[TS-1005] invalid filter pattern '{pattern}': {details}")]
    InvalidPattern { pattern: String, details: String },

    #[error("[TS-1101] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[TS-1102] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[TS-2001] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[TS-3001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[TS-3002] channel closed in component {component}")]
    ChannelClosed { component: &'static str },
}

impl TaskStateError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidSchema { .. } => "TS-1001",
            Self::ConflictingRoles { .. } => "TS-1002",
            Self::MissingOrderSensitivity { .. } => "TS-1003",
            Self::UnknownType { .. } => "TS-1004",
            Self::InvalidPattern { .. } => "TS-1005",
            Self::ConfigParse { .. } => "TS-1101",
            Self::MissingConfig { .. } => "TS-1102",
            Self::Serialization { .. } => "TS-2001",
            Self::Io { .. } => "TS-3001",
            Self::ChannelClosed { .. } => "TS-3002",
        }
    }

    /// Whether retrying the failed operation might resolve the failure.
    ///
    /// Schema configuration errors are never retryable; snapshot-time IO
    /// failures may be transient (races with deletion, remounts).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::ChannelClosed { .. })
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for TaskStateError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for TaskStateError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<globset::Error> for TaskStateError {
    fn from(value: globset::Error) -> Self {
        Self::InvalidPattern {
            pattern: value.glob().unwrap_or("<unknown>").to_string(),
            details: value.kind().to_string(),
        }
    }
}
