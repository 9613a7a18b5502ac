//! Filesystem-state fingerprinting: raw per-path states, normalization,
//! file-collection snapshots, and the snapshotter that produces them.

pub mod collection;
pub mod hasher;
pub mod normalize;
pub mod snapshotter;
pub mod state;
