//! Declarative factory configuration.
//!
//! [`FactoryConfig`] is the serialized form of every built-in factory family,
//! selected by a `kind` key. Pipeline documents hold one per transform.

use crate::{
    ExternalTransformFactory, FlattenFactory, PassthroughFactory, SelectFactory,
    SqlTransformFactory,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use transforms_core::TransformFactory;

/// Configuration of one factory, tagged by family.
///
/// # Example
///
/// ```rust
/// use transforms_providers::FactoryConfig;
///
/// let config: FactoryConfig = serde_json::from_str(
///     r#"{"kind": "passthrough", "mappings": [{"from": "input", "to": "output"}]}"#,
/// )
/// .unwrap();
///
/// let factory = config.into_factory("rename");
/// assert_eq!(factory.build().unwrap().name(), "rename");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FactoryConfig {
    /// Re-tag collections
    Passthrough(PassthroughFactory),
    /// Project a collection onto some fields
    Select(SelectFactory),
    /// Merge same-shaped collections
    Flatten(FlattenFactory),
    /// SQL query over the inputs
    Sql(SqlTransformFactory),
    /// Transform implemented by another runtime
    External(ExternalTransformFactory),
}

impl FactoryConfig {
    /// Returns the family key used in configuration files.
    pub fn kind(&self) -> &'static str {
        match self {
            FactoryConfig::Passthrough(_) => "passthrough",
            FactoryConfig::Select(_) => "select",
            FactoryConfig::Flatten(_) => "flatten",
            FactoryConfig::Sql(_) => "sql",
            FactoryConfig::External(_) => "external",
        }
    }

    /// Turns the configuration into a named factory.
    ///
    /// The configuration is not checked here; problems surface from the
    /// factory's `build()`.
    pub fn into_factory(self, name: impl Into<String>) -> Arc<dyn TransformFactory> {
        let name = name.into();
        match self {
            FactoryConfig::Passthrough(f) => Arc::new(f.with_name(name)),
            FactoryConfig::Select(f) => Arc::new(f.with_name(name)),
            FactoryConfig::Flatten(f) => Arc::new(f.with_name(name)),
            FactoryConfig::Sql(f) => Arc::new(f.with_name(name)),
            FactoryConfig::External(f) => Arc::new(f.with_name(name)),
        }
    }
}
