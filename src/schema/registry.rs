//! Process-wide schema registry.
//!
//! Schemas are compiled lazily, once per task type, and shared read-only
//! afterward. Two threads racing to compile the same type both produce an
//! equivalent schema; the first writer wins and the loser's copy is
//! dropped.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::core::errors::{Result, TaskStateError};
use crate::schema::model::{PropertyDeclaration, PropertySpec, TaskSchema, build_schema};
use crate::schema::role::{NestedShape, PropertyRole};

/// Source of raw property specs per task type.
///
/// Stands in for whatever discovery mechanism enumerates a type's
/// properties; tests and embedders register specs statically.
pub trait SchemaSource: Send + Sync {
    /// Specs for `type_name`, or `None` if the type is unknown.
    fn property_specs(&self, type_name: &str) -> Option<Vec<PropertySpec>>;
}

/// In-memory [`SchemaSource`] populated up front.
#[derive(Debug, Default)]
pub struct StaticSchemaSource {
    types: HashMap<String, Vec<PropertySpec>>,
}

impl StaticSchemaSource {
    /// Empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the specs for one task type.
    pub fn register(&mut self, type_name: impl Into<String>, specs: Vec<PropertySpec>) -> &mut Self {
        self.types.insert(type_name.into(), specs);
        self
    }
}

impl SchemaSource for StaticSchemaSource {
    fn property_specs(&self, type_name: &str) -> Option<Vec<PropertySpec>> {
        self.types.get(type_name).cloned()
    }
}

/// A declaration paired with its fully qualified name in the nested tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedDeclaration {
    /// Dot-separated path from the root type to the property.
    pub qualified_name: String,
    /// Task type the declaration belongs to.
    pub owner_type: String,
    /// The declaration itself, unchanged from its owning schema.
    pub declaration: PropertyDeclaration,
}

/// Type-keyed cache of compiled schemas.
pub struct SchemaRegistry {
    source: Box<dyn SchemaSource>,
    cache: RwLock<HashMap<String, Arc<TaskSchema>>>,
}

impl SchemaRegistry {
    /// Registry backed by `source`, with an empty cache.
    pub fn new(source: impl SchemaSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The compiled schema for `type_name`, building it on first request.
    pub fn schema(&self, type_name: &str) -> Result<Arc<TaskSchema>> {
        if let Some(schema) = self.cache.read().get(type_name) {
            return Ok(Arc::clone(schema));
        }

        // Compile outside the write lock; racing builders are harmless.
        let specs = self
            .source
            .property_specs(type_name)
            .ok_or_else(|| TaskStateError::UnknownType {
                type_name: type_name.to_string(),
            })?;
        let built = Arc::new(build_schema(type_name, &specs)?);
        debug!(type_name, properties = built.len(), "compiled task schema");

        let mut cache = self.cache.write();
        let entry = cache
            .entry(type_name.to_string())
            .or_insert_with(|| Arc::clone(&built));
        Ok(Arc::clone(entry))
    }

    /// Flatten the nested declaration tree of `type_name` into qualified
    /// declarations, in name order at every level.
    ///
    /// Object-shaped nested properties are expanded in place with a
    /// `parent.` prefix; sequence/map shapes fan out per *value* element,
    /// so only their parent declaration appears here. A nested type
    /// already on the current expansion path is not re-expanded.
    pub fn qualified_declarations(&self, type_name: &str) -> Result<Vec<QualifiedDeclaration>> {
        let mut out = Vec::new();
        let mut path = vec![type_name.to_string()];
        self.expand(type_name, "", &mut path, &mut out)?;
        Ok(out)
    }

    fn expand(
        &self,
        type_name: &str,
        prefix: &str,
        path: &mut Vec<String>,
        out: &mut Vec<QualifiedDeclaration>,
    ) -> Result<()> {
        let schema = self.schema(type_name)?;
        for decl in schema.declarations() {
            let qualified_name = if prefix.is_empty() {
                decl.name.clone()
            } else {
                format!("{prefix}.{}", decl.name)
            };
            out.push(QualifiedDeclaration {
                qualified_name: qualified_name.clone(),
                owner_type: type_name.to_string(),
                declaration: decl.clone(),
            });

            if let PropertyRole::Nested(NestedShape::Object) = decl.role
                && let Some(child_type) = &decl.nested_type
            {
                if path.iter().any(|seen| seen == child_type) {
                    continue;
                }
                path.push(child_type.clone());
                self.expand(child_type, &qualified_name, path, out)?;
                path.pop();
            }
        }
        Ok(())
    }

    /// Number of schemas compiled so far.
    #[must_use]
    pub fn cached_types(&self) -> usize {
        self.cache.read().len()
    }
}
