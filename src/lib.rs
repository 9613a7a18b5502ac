#![forbid(unsafe_code)]

//! taskstate — incremental-build state engine.
//!
//! Decides, for each unit of build work ("task"), which of its declared
//! inputs and outputs changed since the last execution, so unchanged work
//! can be skipped. Two collaborating subsystems:
//!
//! 1. **Schema** — a reflection-free, declarative model of what a task's
//!    properties *are* (file, directory, collection of files, scalar, or
//!    nested sub-object) together with their comparison semantics.
//! 2. **Snapshot** — a filesystem-state fingerprinting engine converting
//!    live filesystem content into comparable, normalized snapshots.
//!
//! Build orchestration, dependency resolution, and persistent cache
//! storage are external collaborators; this crate only produces schemas,
//! validation messages, and snapshots.
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use taskstate::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use taskstate::schema::registry::SchemaRegistry;
//! use taskstate::snapshot::snapshotter::FileCollectionSnapshotter;
//! ```

pub mod prelude;

pub mod core;
pub mod schema;
pub mod snapshot;
