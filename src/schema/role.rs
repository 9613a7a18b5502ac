//! Property roles.
//!
//! Roles form a closed set; role-specific behavior lives in match arms on
//! this enum rather than a trait hierarchy.

use serde::{Deserialize, Serialize};

use crate::snapshot::collection::CompareStrategy;

/// The declared role of a task property.
///
/// Immutable once a schema is built. The role decides whether the property
/// participates in input snapshotting, output preparation, nested descent,
/// or (for [`PropertyRole::Unannotated`]) none of the above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyRole {
    /// Non-file input value compared by its serialized form.
    ScalarInput,
    /// Single regular file input.
    InputFile,
    /// Single directory input, walked recursively.
    InputDirectory,
    /// Collection of input file elements; `ordered` selects the compare
    /// strategy for its snapshots.
    InputFiles {
        /// Element order participates in comparison.
        ordered: bool,
    },
    /// Single file output.
    OutputFile,
    /// Single directory output.
    OutputDirectory,
    /// Collection of output file paths.
    OutputFiles,
    /// Sub-object (or collection/map of sub-objects) with its own schema.
    Nested(NestedShape),
    /// Present on the type but carrying no declared role; tracked so
    /// undeclared-but-present properties can be flagged, never snapshotted.
    Unannotated,
}

/// Container shape of a nested property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NestedShape {
    /// A single sub-object.
    Object,
    /// An ordered sequence of sub-objects, fanned out as `name$1`, `name$2`.
    Sequence,
    /// A string-keyed map of sub-objects, fanned out as `name.key`.
    Map,
}

impl PropertyRole {
    /// Whether the role describes task output rather than input.
    #[must_use]
    pub const fn is_output(&self) -> bool {
        matches!(
            self,
            Self::OutputFile | Self::OutputDirectory | Self::OutputFiles
        )
    }

    /// Whether values of this role are backed by file-collection elements.
    #[must_use]
    pub const fn is_file_based(&self) -> bool {
        matches!(
            self,
            Self::InputFile
                | Self::InputDirectory
                | Self::InputFiles { .. }
                | Self::OutputFile
                | Self::OutputDirectory
                | Self::OutputFiles
        )
    }

    /// Compare strategy for snapshots of this property.
    ///
    /// Only ordered input collections compare as sequences; everything else
    /// compares as a set.
    #[must_use]
    pub const fn compare_strategy(&self) -> CompareStrategy {
        match self {
            Self::InputFiles { ordered: true } => CompareStrategy::Ordered,
            _ => CompareStrategy::Unordered,
        }
    }

    /// Stable role name used in configuration-error reports.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::ScalarInput => "Input",
            Self::InputFile => "InputFile",
            Self::InputDirectory => "InputDirectory",
            Self::InputFiles { .. } => "InputFiles",
            Self::OutputFile => "OutputFile",
            Self::OutputDirectory => "OutputDirectory",
            Self::OutputFiles => "OutputFiles",
            Self::Nested(_) => "Nested",
            Self::Unannotated => "Unannotated",
        }
    }
}
