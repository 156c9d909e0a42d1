//! Flatten transforms: several same-shaped collections merged into one.

use crate::{require, require_each, require_name};
use serde::{Deserialize, Serialize};
use serde_json::json;
use transforms_core::{
    Result, SchemaDerivation, Transform, TransformBuilder, TransformError, TransformFactory,
};

/// URN of flatten transforms.
pub const FLATTEN_URN: &str = "stx:transform:flatten:v1";

/// Factory for transforms merging every input collection into one output.
///
/// All inputs must share a schema; a mismatch is detected when the transform
/// is expanded against actual collections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenFactory {
    #[serde(skip)]
    name: String,

    /// Input tags
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Output tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl FlattenFactory {
    /// Creates a flatten of `inputs` published as `output`.
    pub fn new<I, S>(name: impl Into<String>, inputs: I, output: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            inputs: inputs.into_iter().map(Into::into).collect(),
            output: Some(output.into()),
        }
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

impl TransformFactory for FlattenFactory {
    fn build(&self) -> Result<Transform> {
        let name = require_name(&self.name)?;
        if self.inputs.is_empty() {
            return Err(TransformError::configuration(
                name,
                "at least one input tag is required",
            ));
        }
        let inputs = require_each(name, &self.inputs, "input tag")?;
        let output = require(name, &self.output, "output tag")?;

        TransformBuilder::new(name, FLATTEN_URN)
            .inputs(inputs.iter().copied())
            .output(output, SchemaDerivation::unified(inputs.iter().copied()))
            .payload(json!({ "inputs": inputs }))
            .build()
    }
}
