//! Schema-driven model of task properties: roles, declarations, the
//! process-wide schema registry, and the value visitor that turns live
//! task instances into registered, snapshotable state.

pub mod model;
pub mod registry;
pub mod role;
pub mod visitor;
