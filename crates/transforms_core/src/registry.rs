//! Registry of named transform factories.
//!
//! The registry is where pipeline assembly looks factories up by name. It is
//! immutable once populated and can be shared across threads behind an `Arc`;
//! every build goes straight to the factory, so concurrent builds never contend.

use crate::{Result, Transform, TransformError, TransformFactory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Tags a factory promises its transforms will consume and produce.
///
/// Declaring tags is optional, and so is each side of a declaration: a side
/// left out is not checked, while a side declared empty requires the built
/// transform to have no tags there.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredTags {
    /// Expected input tags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<BTreeSet<String>>,

    /// Expected output tags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<BTreeSet<String>>,
}

impl DeclaredTags {
    /// Creates a declaration of both input and output tags.
    pub fn new<I, O, S, T>(inputs: I, outputs: O) -> Self
    where
        I: IntoIterator<Item = S>,
        O: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            inputs: Some(tag_set(inputs)),
            outputs: Some(tag_set(outputs)),
        }
    }

    /// Declares input tags only.
    pub fn only_inputs<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: Some(tag_set(inputs)),
            outputs: None,
        }
    }

    /// Declares output tags only.
    pub fn only_outputs<O, T>(outputs: O) -> Self
    where
        O: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            inputs: None,
            outputs: Some(tag_set(outputs)),
        }
    }

    fn check(&self, transform: &Transform) -> std::result::Result<(), String> {
        if let Some(declared) = &self.inputs {
            let inputs: BTreeSet<String> = transform.input_tags().map(String::from).collect();
            if &inputs != declared {
                return Err(format!(
                    "declared inputs {:?} but built transform consumes {:?}",
                    declared, inputs
                ));
            }
        }
        if let Some(declared) = &self.outputs {
            let outputs: BTreeSet<String> = transform.output_tags().map(String::from).collect();
            if &outputs != declared {
                return Err(format!(
                    "declared outputs {:?} but built transform produces {:?}",
                    declared, outputs
                ));
            }
        }
        Ok(())
    }
}

fn tag_set<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    tags.into_iter().map(Into::into).collect()
}

struct RegistryEntry {
    factory: Arc<dyn TransformFactory>,
    declared: Option<DeclaredTags>,
}

/// Named collection of transform factories.
///
/// # Example
///
/// ```rust
/// use transforms_core::{factory_fn, SchemaDerivation, TransformBuilder, TransformRegistry};
///
/// let mut registry = TransformRegistry::new();
/// registry
///     .register(
///         "rename",
///         factory_fn(|| {
///             TransformBuilder::new("rename", "example:rename:v1")
///                 .input("input")
///                 .output("output", SchemaDerivation::input("input"))
///                 .build()
///         }),
///     )
///     .unwrap();
///
/// let transform = registry.build("rename").unwrap();
/// assert_eq!(transform.name(), "rename");
/// ```
#[derive(Default)]
pub struct TransformRegistry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl TransformRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under a unique name.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<()>
    where
        F: TransformFactory + 'static,
    {
        self.insert(name.into(), Arc::new(factory), None)
    }

    /// Registers a shared factory under a unique name.
    pub fn register_shared(
        &mut self,
        name: impl Into<String>,
        factory: Arc<dyn TransformFactory>,
    ) -> Result<()> {
        self.insert(name.into(), factory, None)
    }

    /// Registers a factory together with the tags it promises to use.
    pub fn register_declared(
        &mut self,
        name: impl Into<String>,
        factory: Arc<dyn TransformFactory>,
        declared: DeclaredTags,
    ) -> Result<()> {
        self.insert(name.into(), factory, Some(declared))
    }

    fn insert(
        &mut self,
        name: String,
        factory: Arc<dyn TransformFactory>,
        declared: Option<DeclaredTags>,
    ) -> Result<()> {
        if name.is_empty() {
            return Err(TransformError::configuration(
                "<unnamed>",
                "factories must be registered under a non-empty name",
            ));
        }
        if self.entries.contains_key(&name) {
            return Err(TransformError::DuplicateFactory(name));
        }

        debug!(factory = %name, declared = declared.is_some(), "Registered transform factory");
        self.entries
            .insert(name, RegistryEntry { factory, declared });
        Ok(())
    }

    /// Builds the transform of the named factory.
    ///
    /// Any failure of the factory is reported as a configuration error naming
    /// the registered factory.
    pub fn build(&self, name: &str) -> Result<Transform> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| TransformError::UnknownFactory(name.to_string()))?;

        let transform = entry.factory.build().map_err(|err| match err {
            TransformError::Configuration { message, .. } => {
                TransformError::configuration(name, message)
            }
            other => TransformError::configuration(name, other.to_string()),
        })?;

        if let Some(declared) = &entry.declared {
            declared
                .check(&transform)
                .map_err(|message| TransformError::configuration(name, message))?;
        }

        debug!(
            factory = %name,
            urn = %transform.urn(),
            inputs = transform.input_tags().count(),
            outputs = transform.output_tags().count(),
            "Built transform"
        );
        Ok(transform)
    }

    /// Builds every registered factory in name order, stopping at the first
    /// failure.
    pub fn build_all(&self) -> Result<Vec<(String, Transform)>> {
        let built = self
            .entries
            .keys()
            .map(|name| Ok((name.clone(), self.build(name)?)))
            .collect::<Result<Vec<_>>>()?;
        info!("Built {} transforms", built.len());
        Ok(built)
    }

    /// Returns the declared tags of a factory, if any.
    pub fn declared(&self, name: &str) -> Option<&DeclaredTags> {
        self.entries.get(name).and_then(|e| e.declared.as_ref())
    }

    /// Returns the registered names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns true if a factory is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns the number of registered factories.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no factory is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("factories", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SchemaDerivation, TransformBuilder, factory_fn};
    use pretty_assertions::assert_eq;

    fn rename_factory(from: &'static str, to: &'static str) -> impl TransformFactory {
        factory_fn(move || {
            TransformBuilder::new("rename", "test:rename:v1")
                .input(from)
                .output(to, SchemaDerivation::input(from))
                .build()
        })
    }

    #[test]
    fn test_register_and_build() {
        let mut registry = TransformRegistry::new();
        registry.register("rename", rename_factory("a", "b")).unwrap();

        assert!(registry.contains("rename"));
        assert_eq!(registry.len(), 1);

        let transform = registry.build("rename").unwrap();
        assert_eq!(transform.output_tags().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = TransformRegistry::new();
        registry.register("rename", rename_factory("a", "b")).unwrap();

        let err = registry
            .register("rename", rename_factory("c", "d"))
            .unwrap_err();
        assert!(matches!(err, TransformError::DuplicateFactory(ref n) if n == "rename"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut registry = TransformRegistry::new();
        let err = registry.register("", rename_factory("a", "b")).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unknown_factory() {
        let registry = TransformRegistry::new();
        assert!(matches!(
            registry.build("missing"),
            Err(TransformError::UnknownFactory(_))
        ));
    }

    #[test]
    fn test_failure_names_registered_factory() {
        let mut registry = TransformRegistry::new();
        registry
            .register(
                "broken",
                factory_fn(|| Err(TransformError::configuration("inner", "output tag is required"))),
            )
            .unwrap();

        let err = registry.build("broken").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error in factory 'broken': output tag is required"
        );
    }

    #[test]
    fn test_non_configuration_failure_is_wrapped() {
        let mut registry = TransformRegistry::new();
        registry
            .register(
                "dup",
                factory_fn(|| Err(TransformError::DuplicateField("id".to_string()))),
            )
            .unwrap();

        let err = registry.build("dup").unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("Duplicate field 'id'"));
    }

    #[test]
    fn test_declared_tags_match() {
        let mut registry = TransformRegistry::new();
        registry
            .register_declared(
                "rename",
                Arc::new(rename_factory("input", "output")),
                DeclaredTags::new(["input"], ["output"]),
            )
            .unwrap();

        assert!(registry.build("rename").is_ok());
        assert_eq!(
            registry.declared("rename"),
            Some(&DeclaredTags::new(["input"], ["output"]))
        );
    }

    #[test]
    fn test_declared_tags_mismatch() {
        let mut registry = TransformRegistry::new();
        registry
            .register_declared(
                "rename",
                Arc::new(rename_factory("input", "output")),
                DeclaredTags::new(["input"], ["result"]),
            )
            .unwrap();

        let err = registry.build("rename").unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("declared outputs"));
    }

    #[test]
    fn test_declared_side_left_out_is_not_checked() {
        let mut registry = TransformRegistry::new();
        registry
            .register_declared(
                "inputs_only",
                Arc::new(rename_factory("input", "output")),
                DeclaredTags::only_inputs(["input"]),
            )
            .unwrap();
        registry
            .register_declared(
                "outputs_only",
                Arc::new(rename_factory("input", "output")),
                DeclaredTags::only_outputs(["result"]),
            )
            .unwrap();

        assert!(registry.build("inputs_only").is_ok());
        let err = registry.build("outputs_only").unwrap_err();
        assert!(err.to_string().contains("declared outputs"));
    }

    #[test]
    fn test_declared_tags_deserialize_one_side() {
        let declared: DeclaredTags = serde_json::from_str(r#"{"inputs": ["events"]}"#).unwrap();
        assert_eq!(declared, DeclaredTags::only_inputs(["events"]));

        let declared: DeclaredTags = serde_json::from_str(r#"{"outputs": []}"#).unwrap();
        assert_eq!(declared.outputs, Some(BTreeSet::new()));
        assert_eq!(declared.inputs, None);
    }

    #[test]
    fn test_build_all_is_ordered_and_fail_fast() {
        let mut registry = TransformRegistry::new();
        registry.register("b", rename_factory("x", "y")).unwrap();
        registry.register("a", rename_factory("x", "z")).unwrap();

        let built = registry.build_all().unwrap();
        let names: Vec<&str> = built.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);

        registry
            .register(
                "c",
                factory_fn(|| Err(TransformError::configuration("c", "bad"))),
            )
            .unwrap();
        assert!(registry.build_all().is_err());
    }

    #[test]
    fn test_build_does_not_change_registry() {
        let mut registry = TransformRegistry::new();
        registry.register("rename", rename_factory("a", "b")).unwrap();

        let first = registry.build("rename").unwrap();
        let second = registry.build("rename").unwrap();
        let third = registry.build("rename").unwrap();

        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["rename"]);
    }
}
