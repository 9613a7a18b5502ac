//! Property schema model.
//!
//! Discovery (whatever mechanism produces it) hands over a flat list of
//! [`PropertySpec`]s per task type; [`build_schema`] compiles them into an
//! immutable [`TaskSchema`]. All configuration errors surface here, never
//! during snapshotting.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, TaskStateError};
use crate::schema::role::{NestedShape, PropertyRole};
use crate::snapshot::normalize::PathSensitivity;

/// One marker attached to a property by schema discovery.
///
/// Role markers assign snapshot semantics; at most one distinct role marker
/// may appear per property. Modifier markers tune an assigned role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyAnnotation {
    /// Role: scalar input value.
    Input,
    /// Role: single input file.
    InputFile,
    /// Role: single input directory.
    InputDirectory,
    /// Role: collection of input files.
    InputFiles,
    /// Role: single output file.
    OutputFile,
    /// Role: single output directory.
    OutputDirectory,
    /// Role: collection of output files.
    OutputFiles,
    /// Role: nested sub-object(s) with the given container shape.
    Nested(NestedShape),
    /// Exclude the property from the schema entirely.
    Internal,
    /// Modifier: an absent value is not a violation.
    Optional,
    /// Modifier: an empty file collection makes the task skippable.
    SkipWhenEmpty,
    /// Modifier: element order participates in comparison.
    OrderSensitive,
    /// Modifier: how much path identity participates in comparison.
    PathSensitive(PathSensitivity),
}

impl PropertyAnnotation {
    /// The role this marker assigns, if it is a role marker.
    const fn role(self) -> Option<PropertyRole> {
        match self {
            Self::Input => Some(PropertyRole::ScalarInput),
            Self::InputFile => Some(PropertyRole::InputFile),
            Self::InputDirectory => Some(PropertyRole::InputDirectory),
            // Order sensitivity is resolved after all markers are read.
            Self::InputFiles => Some(PropertyRole::InputFiles { ordered: false }),
            Self::OutputFile => Some(PropertyRole::OutputFile),
            Self::OutputDirectory => Some(PropertyRole::OutputDirectory),
            Self::OutputFiles => Some(PropertyRole::OutputFiles),
            Self::Nested(shape) => Some(PropertyRole::Nested(shape)),
            _ => None,
        }
    }
}

/// Raw description of one property, as produced by schema discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySpec {
    /// Property name, unique within its task type.
    pub name: String,
    /// Markers in discovery order; the first role marker wins.
    pub annotations: Vec<PropertyAnnotation>,
    /// Task type providing the child schema of a nested property.
    pub nested_type: Option<String>,
}

impl PropertySpec {
    /// Spec for a non-nested property.
    pub fn new(name: impl Into<String>, annotations: impl IntoIterator<Item = PropertyAnnotation>) -> Self {
        Self {
            name: name.into(),
            annotations: annotations.into_iter().collect(),
            nested_type: None,
        }
    }

    /// Spec for a nested property whose children come from `nested_type`.
    pub fn nested(
        name: impl Into<String>,
        shape: NestedShape,
        nested_type: impl Into<String>,
        extra: impl IntoIterator<Item = PropertyAnnotation>,
    ) -> Self {
        let mut annotations = vec![PropertyAnnotation::Nested(shape)];
        annotations.extend(extra);
        Self {
            name: name.into(),
            annotations,
            nested_type: Some(nested_type.into()),
        }
    }
}

/// Compiled declaration of one property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDeclaration {
    /// Property name within the owning type.
    pub name: String,
    /// Resolved role.
    pub role: PropertyRole,
    /// Child schema type for nested declarations.
    pub nested_type: Option<String>,
    /// An absent value is not a violation.
    pub optional: bool,
    /// An empty file collection makes the task skippable.
    pub skip_when_empty: bool,
    /// Element order participates in comparison.
    pub order_sensitive: bool,
    /// Path identity participating in comparison.
    pub path_sensitivity: PathSensitivity,
}

/// Immutable compiled schema of one task type.
///
/// Declarations are keyed and iterated by name, which keeps validation
/// message ordering stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSchema {
    type_name: String,
    properties: BTreeMap<String, PropertyDeclaration>,
    unannotated: BTreeSet<String>,
}

impl TaskSchema {
    /// Task type the schema was compiled for.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Declared properties in name order.
    pub fn declarations(&self) -> impl Iterator<Item = &PropertyDeclaration> {
        self.properties.values()
    }

    /// Declaration for `name`, if it carries a role.
    #[must_use]
    pub fn declaration(&self, name: &str) -> Option<&PropertyDeclaration> {
        self.properties.get(name)
    }

    /// Properties present on the type but carrying no role marker. They
    /// receive no snapshot semantics.
    #[must_use]
    pub fn unannotated(&self) -> &BTreeSet<String> {
        &self.unannotated
    }

    /// Role lookup covering both declared and unannotated properties.
    #[must_use]
    pub fn role_of(&self, name: &str) -> Option<PropertyRole> {
        if let Some(decl) = self.properties.get(name) {
            return Some(decl.role);
        }
        self.unannotated
            .contains(name)
            .then_some(PropertyRole::Unannotated)
    }

    /// Number of declared (annotated) properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the schema declares no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Compile property specs into a schema.
///
/// Per property: the first role marker wins and a second, different role
/// marker is an immediate configuration error. Properties with no role
/// marker land in the unannotated set. `Internal` excludes a property
/// outright. A sequence-shaped nested property must carry the
/// order-sensitive marker.
pub fn build_schema(type_name: &str, specs: &[PropertySpec]) -> Result<TaskSchema> {
    let mut properties = BTreeMap::new();
    let mut unannotated = BTreeSet::new();

    for spec in specs {
        if spec.annotations.contains(&PropertyAnnotation::Internal) {
            continue;
        }
        if properties.contains_key(&spec.name) || unannotated.contains(&spec.name) {
            return Err(TaskStateError::InvalidSchema {
                type_name: type_name.to_string(),
                details: format!("duplicate property '{}'", spec.name),
            });
        }

        let Some(declaration) = compile_property(type_name, spec)? else {
            unannotated.insert(spec.name.clone());
            continue;
        };
        properties.insert(spec.name.clone(), declaration);
    }

    Ok(TaskSchema {
        type_name: type_name.to_string(),
        properties,
        unannotated,
    })
}

/// Compile one spec; `None` means the property is unannotated.
fn compile_property(type_name: &str, spec: &PropertySpec) -> Result<Option<PropertyDeclaration>> {
    let mut role: Option<PropertyRole> = None;
    let mut optional = false;
    let mut skip_when_empty = false;
    let mut order_sensitive = false;
    let mut path_sensitivity = PathSensitivity::Absolute;

    for annotation in &spec.annotations {
        if let Some(candidate) = annotation.role() {
            match role {
                None => role = Some(candidate),
                Some(existing) if existing == candidate => {}
                Some(existing) => {
                    return Err(TaskStateError::ConflictingRoles {
                        type_name: type_name.to_string(),
                        property: spec.name.clone(),
                        first: existing.label(),
                        second: candidate.label(),
                    });
                }
            }
            continue;
        }
        match annotation {
            PropertyAnnotation::Optional => optional = true,
            PropertyAnnotation::SkipWhenEmpty => skip_when_empty = true,
            PropertyAnnotation::OrderSensitive => order_sensitive = true,
            PropertyAnnotation::PathSensitive(sensitivity) => path_sensitivity = *sensitivity,
            _ => {}
        }
    }

    let Some(mut role) = role else {
        return Ok(None);
    };

    match &mut role {
        PropertyRole::InputFiles { ordered } => *ordered = order_sensitive,
        PropertyRole::Nested(NestedShape::Sequence) if !order_sensitive => {
            return Err(TaskStateError::MissingOrderSensitivity {
                type_name: type_name.to_string(),
                property: spec.name.clone(),
            });
        }
        PropertyRole::Nested(_) if spec.nested_type.is_none() => {
            return Err(TaskStateError::InvalidSchema {
                type_name: type_name.to_string(),
                details: format!("nested property '{}' names no target type", spec.name),
            });
        }
        _ => {}
    }

    Ok(Some(PropertyDeclaration {
        name: spec.name.clone(),
        role,
        nested_type: spec.nested_type.clone(),
        optional,
        skip_when_empty,
        order_sensitive,
        path_sensitivity,
    }))
}
