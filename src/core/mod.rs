//! Cross-cutting infrastructure: errors, configuration, path interning.

pub mod config;
pub mod errors;
pub mod intern;
