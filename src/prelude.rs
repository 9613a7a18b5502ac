//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use taskstate::prelude::*;
//! ```

// Core
pub use crate::core::config::{EngineConfig, SnapshotConfig};
pub use crate::core::errors::{Result, TaskStateError};
pub use crate::core::intern::PathInterner;

// Snapshot
pub use crate::snapshot::collection::{
    CompareStrategy, FileCollectionElement, FileCollectionSnapshot, SnapshotDiff, SnapshotEntry,
    TreeFilter,
};
pub use crate::snapshot::hasher::{ContentHasher, Sha256ContentHasher};
pub use crate::snapshot::normalize::PathSensitivity;
pub use crate::snapshot::snapshotter::{FileCollectionSnapshotter, SnapshotterStats};
pub use crate::snapshot::state::{ContentHash, FileState};

// Schema
pub use crate::schema::model::{
    PropertyAnnotation, PropertyDeclaration, PropertySpec, TaskSchema, build_schema,
};
pub use crate::schema::registry::{
    QualifiedDeclaration, SchemaRegistry, SchemaSource, StaticSchemaSource,
};
pub use crate::schema::role::{NestedShape, PropertyRole};
pub use crate::schema::visitor::{
    NestedValue, OutputPreparation, ProcessedTask, PropertyValue, RegisteredFileProperty,
    TaskInstance, process_task, validate_task,
};
