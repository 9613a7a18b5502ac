//! Property value visitor.
//!
//! Walks a task instance's live values against its compiled schema. Two
//! entry points: [`validate_task`] accumulates every violation message in
//! one pass, [`process_task`] registers each property's snapshotable state
//! and schedules output-directory preparation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, TaskStateError};
use crate::schema::model::PropertyDeclaration;
use crate::schema::registry::SchemaRegistry;
use crate::schema::role::{NestedShape, PropertyRole};
use crate::snapshot::collection::{CompareStrategy, FileCollectionElement, FileCollectionSnapshot};
use crate::snapshot::normalize::PathSensitivity;
use crate::snapshot::snapshotter::FileCollectionSnapshotter;

/// Live value of one property on a task instance.
///
/// An absent property simply has no entry in its instance's value map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// Scalar input compared by this string form.
    Scalar(String),
    /// Single path, for single-file and single-directory roles.
    Path(PathBuf),
    /// File-collection elements, for plural file roles.
    Elements(Vec<FileCollectionElement>),
    /// Nested sub-object value(s).
    Nested(NestedValue),
}

/// Values of a nested property, matching its declared container shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NestedValue {
    /// A single sub-object's values.
    Object(PropertyValues),
    /// Ordered sub-object values, visited as `name$1`, `name$2`, ...
    Sequence(Vec<PropertyValues>),
    /// Keyed sub-object values, visited as `name.key`.
    Map(BTreeMap<String, PropertyValues>),
}

/// Property name to live value.
pub type PropertyValues = BTreeMap<String, PropertyValue>;

impl NestedValue {
    /// Object value from (name, value) pairs.
    pub fn object(entries: impl IntoIterator<Item = (&'static str, PropertyValue)>) -> Self {
        Self::Object(values_from(entries))
    }

    /// Sequence value from per-element (name, value) pairs.
    pub fn sequence(
        items: impl IntoIterator<Item = Vec<(&'static str, PropertyValue)>>,
    ) -> Self {
        Self::Sequence(items.into_iter().map(values_from).collect())
    }

    /// Map value from per-key (name, value) pairs.
    pub fn map(
        entries: impl IntoIterator<Item = (&'static str, Vec<(&'static str, PropertyValue)>)>,
    ) -> Self {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), values_from(v)))
                .collect(),
        )
    }
}

fn values_from(entries: impl IntoIterator<Item = (&'static str, PropertyValue)>) -> PropertyValues {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// One task instance: its type plus live property values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInstance {
    type_name: String,
    values: PropertyValues,
}

impl TaskInstance {
    /// Instance of `type_name` with no values bound yet.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            values: PropertyValues::new(),
        }
    }

    /// Builder-style value assignment.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Task type the instance is validated and processed against.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

/// A file property registered for snapshotting, with the comparison policy
/// its declaration fixed at schema-build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredFileProperty {
    /// Dot-qualified property name, with nested fan-out suffixes.
    pub qualified_name: String,
    /// Root elements in declared order.
    pub elements: Vec<FileCollectionElement>,
    /// Sequence or set comparison, fixed by the declaration.
    pub compare_strategy: CompareStrategy,
    /// Path identity participating in comparison.
    pub path_sensitivity: PathSensitivity,
    /// Whether an empty collection makes the task skippable.
    pub skip_when_empty: bool,
    /// Whether the property describes task output.
    pub is_output: bool,
}

impl RegisteredFileProperty {
    /// Snapshot this property's current filesystem state.
    pub fn snapshot(&self, snapshotter: &FileCollectionSnapshotter) -> Result<FileCollectionSnapshot> {
        snapshotter.snapshot(&self.elements, self.compare_strategy, self.path_sensitivity)
    }
}

/// Idempotent filesystem side effect run before the task's main action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPreparation {
    /// Create the missing parent chain of an output file path.
    ParentChainOf(PathBuf),
    /// Create the output directory itself.
    DirectoryAt(PathBuf),
}

/// Everything the visitor registered for one task instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedTask {
    scalars: BTreeMap<String, String>,
    files: Vec<RegisteredFileProperty>,
    preparations: Vec<OutputPreparation>,
}

impl ProcessedTask {
    /// Scalar inputs under their qualified names.
    #[must_use]
    pub fn scalars(&self) -> &BTreeMap<String, String> {
        &self.scalars
    }

    /// File-backed properties in declaration order.
    #[must_use]
    pub fn file_properties(&self) -> &[RegisteredFileProperty] {
        &self.files
    }

    /// Output side effects scheduled by `Output*` properties.
    #[must_use]
    pub fn preparations(&self) -> &[OutputPreparation] {
        &self.preparations
    }

    /// Run the scheduled output preparations. Safe to run repeatedly and
    /// when the paths already exist.
    pub fn prepare_outputs(&self) -> Result<()> {
        for preparation in &self.preparations {
            match preparation {
                OutputPreparation::ParentChainOf(path) => {
                    if let Some(parent) = path.parent()
                        && !parent.as_os_str().is_empty()
                    {
                        fs::create_dir_all(parent).map_err(|e| TaskStateError::io(parent, e))?;
                    }
                }
                OutputPreparation::DirectoryAt(path) => {
                    fs::create_dir_all(path).map_err(|e| TaskStateError::io(path, e))?;
                }
            }
        }
        Ok(())
    }
}

/// Validate `instance` against its type's schema.
///
/// Returns the full ordered list of violation messages found in one pass;
/// expected violations never surface as errors. The `Err` channel is for
/// schema configuration problems only.
pub fn validate_task(registry: &SchemaRegistry, instance: &TaskInstance) -> Result<Vec<String>> {
    let mut messages = Vec::new();
    validate_level(registry, &instance.type_name, &instance.values, "", &mut messages)?;
    Ok(messages)
}

fn validate_level(
    registry: &SchemaRegistry,
    type_name: &str,
    values: &PropertyValues,
    prefix: &str,
    messages: &mut Vec<String>,
) -> Result<()> {
    let schema = registry.schema(type_name)?;
    for decl in schema.declarations() {
        let qualified = qualify(prefix, &decl.name);
        let Some(value) = values.get(&decl.name) else {
            if !decl.optional {
                messages.push(format!(
                    "No value has been specified for property '{qualified}'."
                ));
            }
            continue;
        };
        validate_value(registry, decl, &qualified, value, messages)?;
    }
    Ok(())
}

fn validate_value(
    registry: &SchemaRegistry,
    decl: &PropertyDeclaration,
    qualified: &str,
    value: &PropertyValue,
    messages: &mut Vec<String>,
) -> Result<()> {
    match (decl.role, value) {
        (PropertyRole::ScalarInput, PropertyValue::Scalar(_)) => {}
        (PropertyRole::InputFile, PropertyValue::Path(path)) => {
            match fs::metadata(path) {
                Ok(meta) if meta.is_file() => {}
                Ok(_) => messages.push(format!(
                    "File '{}' specified for property '{qualified}' is not a file.",
                    path.display()
                )),
                Err(_) => messages.push(format!(
                    "File '{}' specified for property '{qualified}' does not exist.",
                    path.display()
                )),
            }
        }
        (PropertyRole::InputDirectory, PropertyValue::Path(path)) => {
            match fs::metadata(path) {
                Ok(meta) if meta.is_dir() => {}
                Ok(_) => messages.push(format!(
                    "Directory '{}' specified for property '{qualified}' is not a directory.",
                    path.display()
                )),
                Err(_) => messages.push(format!(
                    "Directory '{}' specified for property '{qualified}' does not exist.",
                    path.display()
                )),
            }
        }
        (PropertyRole::InputFiles { .. }, PropertyValue::Elements(_)) => {}
        (PropertyRole::OutputFile, PropertyValue::Path(path)) => {
            validate_output_file(qualified, path, messages);
        }
        (PropertyRole::OutputDirectory, PropertyValue::Path(path)) => {
            match fs::metadata(path) {
                Ok(meta) if !meta.is_dir() => messages.push(format!(
                    "Directory '{}' specified for property '{qualified}' is not a directory.",
                    path.display()
                )),
                Ok(_) => {}
                Err(_) => {
                    if let Some(ancestor) = offending_ancestor(path) {
                        messages.push(format!(
                            "Cannot write to directory '{}' specified for property '{qualified}', as ancestor '{}' is not a directory.",
                            path.display(),
                            ancestor.display()
                        ));
                    }
                }
            }
        }
        (PropertyRole::OutputFiles, PropertyValue::Elements(elements)) => {
            for element in elements {
                validate_output_file(qualified, element.path(), messages);
            }
        }
        (PropertyRole::Nested(shape), PropertyValue::Nested(nested)) => {
            let Some(child_type) = &decl.nested_type else {
                return Ok(());
            };
            match (shape, nested) {
                (NestedShape::Object, NestedValue::Object(children)) => {
                    validate_level(registry, child_type, children, qualified, messages)?;
                }
                (NestedShape::Sequence, NestedValue::Sequence(items)) => {
                    for (index, item) in items.iter().enumerate() {
                        let prefix = format!("{qualified}${}", index + 1);
                        validate_level(registry, child_type, item, &prefix, messages)?;
                    }
                }
                (NestedShape::Map, NestedValue::Map(entries)) => {
                    for (key, item) in entries {
                        let prefix = format!("{qualified}.{key}");
                        validate_level(registry, child_type, item, &prefix, messages)?;
                    }
                }
                _ => messages.push(shape_mismatch(qualified, decl.role)),
            }
        }
        (PropertyRole::Unannotated, _) => {}
        _ => messages.push(shape_mismatch(qualified, decl.role)),
    }
    Ok(())
}

fn validate_output_file(qualified: &str, path: &Path, messages: &mut Vec<String>) {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => messages.push(format!(
            "Cannot write to file '{}' specified for property '{qualified}' as it is a directory.",
            path.display()
        )),
        Ok(_) => {}
        Err(_) => {
            if let Some(ancestor) = offending_ancestor(path) {
                messages.push(format!(
                    "Cannot write to file '{}' specified for property '{qualified}', as ancestor '{}' is not a directory.",
                    path.display(),
                    ancestor.display()
                ));
            }
        }
    }
}

/// Nearest existing ancestor of `path` that is not a directory, if any.
/// A fully creatable parent chain yields `None`.
fn offending_ancestor(path: &Path) -> Option<PathBuf> {
    for ancestor in path.ancestors().skip(1) {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        match fs::metadata(ancestor) {
            Ok(meta) if meta.is_dir() => return None,
            Ok(_) => return Some(ancestor.to_path_buf()),
            Err(_) => {}
        }
    }
    None
}

fn shape_mismatch(qualified: &str, role: PropertyRole) -> String {
    format!(
        "Value specified for property '{qualified}' cannot be used as {}.",
        role.label()
    )
}

/// Register `instance`'s properties for snapshotting.
///
/// Values whose shape contradicts the declared role are skipped here;
/// [`validate_task`] is the reporting channel for those.
pub fn process_task(registry: &SchemaRegistry, instance: &TaskInstance) -> Result<ProcessedTask> {
    let mut processed = ProcessedTask::default();
    process_level(registry, &instance.type_name, &instance.values, "", &mut processed)?;
    Ok(processed)
}

fn process_level(
    registry: &SchemaRegistry,
    type_name: &str,
    values: &PropertyValues,
    prefix: &str,
    processed: &mut ProcessedTask,
) -> Result<()> {
    let schema = registry.schema(type_name)?;
    for decl in schema.declarations() {
        let qualified = qualify(prefix, &decl.name);
        let Some(value) = values.get(&decl.name) else {
            continue;
        };
        process_value(registry, decl, &qualified, value, processed)?;
    }
    Ok(())
}

fn process_value(
    registry: &SchemaRegistry,
    decl: &PropertyDeclaration,
    qualified: &str,
    value: &PropertyValue,
    processed: &mut ProcessedTask,
) -> Result<()> {
    match (decl.role, value) {
        (PropertyRole::ScalarInput, PropertyValue::Scalar(text)) => {
            processed.scalars.insert(qualified.to_string(), text.clone());
        }
        (PropertyRole::InputFile, PropertyValue::Path(path)) => {
            register_file_property(
                processed,
                decl,
                qualified,
                vec![FileCollectionElement::File(path.clone())],
            );
        }
        (PropertyRole::InputDirectory, PropertyValue::Path(path)) => {
            register_file_property(
                processed,
                decl,
                qualified,
                vec![FileCollectionElement::Directory(path.clone())],
            );
        }
        (PropertyRole::InputFiles { .. }, PropertyValue::Elements(elements)) => {
            register_file_property(processed, decl, qualified, elements.clone());
        }
        (PropertyRole::OutputFile, PropertyValue::Path(path)) => {
            register_file_property(
                processed,
                decl,
                qualified,
                vec![FileCollectionElement::File(path.clone())],
            );
            processed
                .preparations
                .push(OutputPreparation::ParentChainOf(path.clone()));
        }
        (PropertyRole::OutputDirectory, PropertyValue::Path(path)) => {
            register_file_property(
                processed,
                decl,
                qualified,
                vec![FileCollectionElement::Directory(path.clone())],
            );
            processed
                .preparations
                .push(OutputPreparation::DirectoryAt(path.clone()));
        }
        (PropertyRole::OutputFiles, PropertyValue::Elements(elements)) => {
            for element in elements {
                processed
                    .preparations
                    .push(OutputPreparation::ParentChainOf(element.path().to_path_buf()));
            }
            register_file_property(processed, decl, qualified, elements.clone());
        }
        (PropertyRole::Nested(shape), PropertyValue::Nested(nested)) => {
            let Some(child_type) = &decl.nested_type else {
                return Ok(());
            };
            // The nested type itself is an input: swapping implementations
            // must invalidate previous runs.
            processed
                .scalars
                .insert(format!("{qualified}.class"), child_type.clone());
            match (shape, nested) {
                (NestedShape::Object, NestedValue::Object(children)) => {
                    process_level(registry, child_type, children, qualified, processed)?;
                }
                (NestedShape::Sequence, NestedValue::Sequence(items)) => {
                    for (index, item) in items.iter().enumerate() {
                        let prefix = format!("{qualified}${}", index + 1);
                        process_level(registry, child_type, item, &prefix, processed)?;
                    }
                }
                (NestedShape::Map, NestedValue::Map(entries)) => {
                    for (key, item) in entries {
                        let prefix = format!("{qualified}.{key}");
                        process_level(registry, child_type, item, &prefix, processed)?;
                    }
                }
                _ => {}
            }
        }
        _ => {}
    }
    Ok(())
}

fn register_file_property(
    processed: &mut ProcessedTask,
    decl: &PropertyDeclaration,
    qualified: &str,
    elements: Vec<FileCollectionElement>,
) {
    processed.files.push(RegisteredFileProperty {
        qualified_name: qualified.to_string(),
        elements,
        compare_strategy: decl.role.compare_strategy(),
        path_sensitivity: decl.path_sensitivity,
        skip_when_empty: decl.skip_when_empty,
        is_output: decl.role.is_output(),
    });
}

fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::model::{PropertyAnnotation, PropertySpec};
    use crate::schema::registry::StaticSchemaSource;
    use tempfile::TempDir;

    fn registry_with(types: &[(&str, Vec<PropertySpec>)]) -> SchemaRegistry {
        let mut source = StaticSchemaSource::new();
        for (name, specs) in types {
            source.register(*name, specs.clone());
        }
        SchemaRegistry::new(source)
    }

    fn compile_registry() -> SchemaRegistry {
        registry_with(&[(
            "Compile",
            vec![
                PropertySpec::new("src", [PropertyAnnotation::InputFile]),
                PropertySpec::new(
                    "dest",
                    [PropertyAnnotation::OutputDirectory, PropertyAnnotation::Optional],
                ),
            ],
        )])
    }

    #[test]
    fn missing_required_value_yields_exactly_one_message() {
        let registry = compile_registry();
        let messages = validate_task(&registry, &TaskInstance::new("Compile")).unwrap();
        assert_eq!(
            messages,
            vec!["No value has been specified for property 'src'.".to_string()]
        );
    }

    #[test]
    fn optional_missing_value_is_silent() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("in.txt");
        std::fs::write(&file, b"x").unwrap();

        let registry = compile_registry();
        let instance = TaskInstance::new("Compile").with("src", PropertyValue::Path(file));
        assert!(validate_task(&registry, &instance).unwrap().is_empty());
    }

    #[test]
    fn input_file_checks_existence_and_kind() {
        let tmp = TempDir::new().unwrap();
        let registry = compile_registry();

        let gone = tmp.path().join("gone.txt");
        let instance = TaskInstance::new("Compile").with("src", PropertyValue::Path(gone.clone()));
        let messages = validate_task(&registry, &instance).unwrap();
        assert_eq!(
            messages,
            vec![format!(
                "File '{}' specified for property 'src' does not exist.",
                gone.display()
            )]
        );

        let instance =
            TaskInstance::new("Compile").with("src", PropertyValue::Path(tmp.path().to_path_buf()));
        let messages = validate_task(&registry, &instance).unwrap();
        assert_eq!(
            messages,
            vec![format!(
                "File '{}' specified for property 'src' is not a file.",
                tmp.path().display()
            )]
        );
    }

    #[test]
    fn input_directory_checks_existence_and_kind() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("plain.txt");
        std::fs::write(&file, b"x").unwrap();
        let registry = registry_with(&[(
            "Scan",
            vec![PropertySpec::new("root", [PropertyAnnotation::InputDirectory])],
        )]);

        let instance = TaskInstance::new("Scan").with("root", PropertyValue::Path(file.clone()));
        let messages = validate_task(&registry, &instance).unwrap();
        assert_eq!(
            messages,
            vec![format!(
                "Directory '{}' specified for property 'root' is not a directory.",
                file.display()
            )]
        );
    }

    #[test]
    fn output_file_rejects_directories_and_bad_ancestors() {
        let tmp = TempDir::new().unwrap();
        let registry = registry_with(&[(
            "Emit",
            vec![PropertySpec::new("report", [PropertyAnnotation::OutputFile])],
        )]);

        // Path occupied by a directory.
        let instance =
            TaskInstance::new("Emit").with("report", PropertyValue::Path(tmp.path().to_path_buf()));
        let messages = validate_task(&registry, &instance).unwrap();
        assert_eq!(
            messages,
            vec![format!(
                "Cannot write to file '{}' specified for property 'report' as it is a directory.",
                tmp.path().display()
            )]
        );

        // Ancestor exists but is a regular file.
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let target = blocker.join("deep/report.txt");
        let instance = TaskInstance::new("Emit").with("report", PropertyValue::Path(target.clone()));
        let messages = validate_task(&registry, &instance).unwrap();
        assert_eq!(
            messages,
            vec![format!(
                "Cannot write to file '{}' specified for property 'report', as ancestor '{}' is not a directory.",
                target.display(),
                blocker.display()
            )]
        );
    }

    #[test]
    fn output_file_with_creatable_parent_chain_is_valid() {
        let tmp = TempDir::new().unwrap();
        let registry = registry_with(&[(
            "Emit",
            vec![PropertySpec::new("report", [PropertyAnnotation::OutputFile])],
        )]);
        let target = tmp.path().join("not/yet/created/report.txt");
        let instance = TaskInstance::new("Emit").with("report", PropertyValue::Path(target));
        assert!(validate_task(&registry, &instance).unwrap().is_empty());
    }

    #[test]
    fn output_directory_rejects_existing_non_directory() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();
        let registry = registry_with(&[(
            "Emit",
            vec![PropertySpec::new("into", [PropertyAnnotation::OutputDirectory])],
        )]);

        let instance = TaskInstance::new("Emit").with("into", PropertyValue::Path(file.clone()));
        let messages = validate_task(&registry, &instance).unwrap();
        assert_eq!(
            messages,
            vec![format!(
                "Directory '{}' specified for property 'into' is not a directory.",
                file.display()
            )]
        );
    }

    #[test]
    fn all_violations_accumulate_in_name_order() {
        let registry = registry_with(&[(
            "Multi",
            vec![
                PropertySpec::new("beta", [PropertyAnnotation::InputFile]),
                PropertySpec::new("alpha", [PropertyAnnotation::Input]),
            ],
        )]);
        let messages = validate_task(&registry, &TaskInstance::new("Multi")).unwrap();
        assert_eq!(
            messages,
            vec![
                "No value has been specified for property 'alpha'.".to_string(),
                "No value has been specified for property 'beta'.".to_string(),
            ]
        );
    }

    #[test]
    fn shape_mismatch_is_one_message() {
        let registry = compile_registry();
        let instance =
            TaskInstance::new("Compile").with("src", PropertyValue::Scalar("oops".into()));
        let messages = validate_task(&registry, &instance).unwrap();
        assert_eq!(
            messages,
            vec!["Value specified for property 'src' cannot be used as InputFile.".to_string()]
        );
    }

    fn nested_registry() -> SchemaRegistry {
        registry_with(&[
            (
                "Task",
                vec![PropertySpec::nested(
                    "opts",
                    NestedShape::Object,
                    "Options",
                    [PropertyAnnotation::Optional],
                )],
            ),
            (
                "Options",
                vec![PropertySpec::new("level", [PropertyAnnotation::Input])],
            ),
        ])
    }

    #[test]
    fn absent_nested_value_produces_zero_child_messages() {
        let registry = registry_with(&[
            (
                "Task",
                vec![PropertySpec::nested("opts", NestedShape::Object, "Options", [])],
            ),
            (
                "Options",
                vec![PropertySpec::new("level", [PropertyAnnotation::Input])],
            ),
        ]);
        let messages = validate_task(&registry, &TaskInstance::new("Task")).unwrap();
        // Only the parent's own optionality is checked.
        assert_eq!(
            messages,
            vec!["No value has been specified for property 'opts'.".to_string()]
        );
    }

    #[test]
    fn nested_children_validate_under_qualified_names() {
        let registry = nested_registry();
        let instance =
            TaskInstance::new("Task").with("opts", PropertyValue::Nested(NestedValue::object([])));
        let messages = validate_task(&registry, &instance).unwrap();
        assert_eq!(
            messages,
            vec!["No value has been specified for property 'opts.level'.".to_string()]
        );
    }

    #[test]
    fn sequence_elements_use_one_based_index_suffixes() {
        let registry = registry_with(&[
            (
                "Bundle",
                vec![PropertySpec::nested(
                    "parts",
                    NestedShape::Sequence,
                    "Part",
                    [PropertyAnnotation::OrderSensitive],
                )],
            ),
            (
                "Part",
                vec![PropertySpec::new("file", [PropertyAnnotation::InputFile])],
            ),
        ]);
        let instance = TaskInstance::new("Bundle").with(
            "parts",
            PropertyValue::Nested(NestedValue::sequence([vec![], vec![]])),
        );
        let messages = validate_task(&registry, &instance).unwrap();
        assert_eq!(
            messages,
            vec![
                "No value has been specified for property 'parts$1.file'.".to_string(),
                "No value has been specified for property 'parts$2.file'.".to_string(),
            ]
        );
    }

    #[test]
    fn map_entries_use_key_suffixes() {
        let registry = registry_with(&[
            (
                "Bundle",
                vec![PropertySpec::nested("variants", NestedShape::Map, "Variant", [])],
            ),
            (
                "Variant",
                vec![PropertySpec::new("name", [PropertyAnnotation::Input])],
            ),
        ]);
        let instance = TaskInstance::new("Bundle").with(
            "variants",
            PropertyValue::Nested(NestedValue::map([("debug", vec![])])),
        );
        let messages = validate_task(&registry, &instance).unwrap();
        assert_eq!(
            messages,
            vec!["No value has been specified for property 'variants.debug.name'.".to_string()]
        );
    }

    #[test]
    fn process_registers_scalars_and_file_properties() {
        let tmp = TempDir::new().unwrap();
        let registry = registry_with(&[(
            "Compile",
            vec![
                PropertySpec::new("target", [PropertyAnnotation::Input]),
                PropertySpec::new(
                    "classpath",
                    [PropertyAnnotation::InputFiles, PropertyAnnotation::OrderSensitive],
                ),
            ],
        )]);
        let instance = TaskInstance::new("Compile")
            .with("target", PropertyValue::Scalar("1.8".into()))
            .with(
                "classpath",
                PropertyValue::Elements(vec![FileCollectionElement::File(
                    tmp.path().join("a.jar"),
                )]),
            );

        let processed = process_task(&registry, &instance).unwrap();
        assert_eq!(processed.scalars().get("target").unwrap(), "1.8");
        let prop = &processed.file_properties()[0];
        assert_eq!(prop.qualified_name, "classpath");
        assert_eq!(prop.compare_strategy, CompareStrategy::Ordered);
        assert!(!prop.is_output);
    }

    #[test]
    fn output_directory_preparation_creates_the_full_chain() {
        let tmp = TempDir::new().unwrap();
        let registry = registry_with(&[(
            "Emit",
            vec![PropertySpec::new("into", [PropertyAnnotation::OutputDirectory])],
        )]);
        let target = tmp.path().join("a/b/c");
        let instance = TaskInstance::new("Emit").with("into", PropertyValue::Path(target.clone()));

        let processed = process_task(&registry, &instance).unwrap();
        assert!(!target.exists());
        processed.prepare_outputs().unwrap();
        assert!(target.is_dir());
        // Idempotent: a second run is a no-op.
        processed.prepare_outputs().unwrap();

        // After preparation the same instance validates clean.
        assert!(validate_task(&registry, &instance).unwrap().is_empty());
    }

    #[test]
    fn output_file_preparation_creates_parents_only() {
        let tmp = TempDir::new().unwrap();
        let registry = registry_with(&[(
            "Emit",
            vec![PropertySpec::new("report", [PropertyAnnotation::OutputFile])],
        )]);
        let target = tmp.path().join("reports/daily/out.txt");
        let instance = TaskInstance::new("Emit").with("report", PropertyValue::Path(target.clone()));

        process_task(&registry, &instance)
            .unwrap()
            .prepare_outputs()
            .unwrap();
        assert!(target.parent().unwrap().is_dir());
        assert!(!target.exists(), "the file itself is the task's job");
    }

    #[test]
    fn nested_processing_registers_the_implementation_class() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("part.txt");
        std::fs::write(&file, b"p").unwrap();
        let registry = registry_with(&[
            (
                "Bundle",
                vec![PropertySpec::nested("opts", NestedShape::Object, "Options", [])],
            ),
            (
                "Options",
                vec![PropertySpec::new("extra", [PropertyAnnotation::InputFile])],
            ),
        ]);
        let instance = TaskInstance::new("Bundle").with(
            "opts",
            PropertyValue::Nested(NestedValue::object([("extra", PropertyValue::Path(file))])),
        );

        let processed = process_task(&registry, &instance).unwrap();
        assert_eq!(processed.scalars().get("opts.class").unwrap(), "Options");
        assert_eq!(processed.file_properties()[0].qualified_name, "opts.extra");
    }

    #[test]
    fn absent_values_are_skipped_in_process_mode() {
        let registry = compile_registry();
        let processed = process_task(&registry, &TaskInstance::new("Compile")).unwrap();
        assert!(processed.scalars().is_empty());
        assert!(processed.file_properties().is_empty());
        assert!(processed.preparations().is_empty());
    }
}
