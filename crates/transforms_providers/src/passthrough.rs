//! Pass-through transforms.
//!
//! A pass-through transform re-tags collections: every mapping publishes the
//! collection found under `from` again under `to`, with the same schema. One
//! input may be mapped to several outputs.

use crate::{require, require_name};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use transforms_core::{
    Result, SchemaDerivation, Transform, TransformBuilder, TransformError, TransformFactory,
};

/// URN of pass-through transforms.
pub const PASSTHROUGH_URN: &str = "stx:transform:passthrough:v1";

/// A single `from` -> `to` tag mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagMapping {
    /// Input tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Output tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

/// Factory for pass-through transforms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassthroughFactory {
    #[serde(skip)]
    name: String,

    /// Tag mappings, applied independently
    #[serde(default)]
    pub mappings: Vec<TagMapping>,
}

impl PassthroughFactory {
    /// Creates a factory with no mappings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mappings: Vec::new(),
        }
    }

    /// Adds a mapping from `from` to `to`.
    pub fn map(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.mappings.push(TagMapping {
            from: Some(from.into()),
            to: Some(to.into()),
        });
        self
    }

    /// Sets the factory name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the factory name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl TransformFactory for PassthroughFactory {
    fn build(&self) -> Result<Transform> {
        let name = require_name(&self.name)?;
        if self.mappings.is_empty() {
            return Err(TransformError::configuration(
                name,
                "at least one tag mapping is required",
            ));
        }

        let mut inputs = BTreeSet::new();
        let mut outputs = BTreeSet::new();
        let mut resolved = Vec::with_capacity(self.mappings.len());
        for (i, mapping) in self.mappings.iter().enumerate() {
            let from = require(name, &mapping.from, &format!("input tag of mapping {}", i + 1))?;
            let to = require(name, &mapping.to, &format!("output tag of mapping {}", i + 1))?;
            if !outputs.insert(to) {
                return Err(TransformError::configuration(
                    name,
                    format!("output tag '{}' is mapped more than once", to),
                ));
            }
            inputs.insert(from);
            resolved.push((from, to));
        }

        let payload = json!({
            "mappings": resolved
                .iter()
                .map(|(from, to)| json!({ "from": from, "to": to }))
                .collect::<Vec<_>>(),
        });

        resolved
            .iter()
            .fold(
                TransformBuilder::new(name, PASSTHROUGH_URN).inputs(inputs),
                |builder, (from, to)| builder.output(*to, SchemaDerivation::input(*from)),
            )
            .payload(payload)
            .build()
    }
}
