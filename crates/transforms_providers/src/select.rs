//! Field projection transforms.

use crate::{require, require_each, require_name};
use serde::{Deserialize, Serialize};
use serde_json::json;
use transforms_core::{
    Result, SchemaDerivation, Transform, TransformBuilder, TransformError, TransformFactory,
};

/// URN of projection transforms.
pub const SELECT_URN: &str = "stx:transform:select:v1";

/// Factory for transforms keeping a subset of the fields of one collection.
///
/// The output schema lists the selected fields in the order given here, with
/// their types and nullability taken from the input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectFactory {
    #[serde(skip)]
    name: String,

    /// Input tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,

    /// Output tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Field names to keep
    #[serde(default)]
    pub fields: Vec<String>,
}

impl SelectFactory {
    /// Creates a projection of `input` onto `fields`, published as `output`.
    pub fn new<I, S>(
        name: impl Into<String>,
        input: impl Into<String>,
        output: impl Into<String>,
        fields: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            input: Some(input.into()),
            output: Some(output.into()),
            fields: fields.into_iter().map(Into::into).collect(),
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

impl TransformFactory for SelectFactory {
    fn build(&self) -> Result<Transform> {
        let name = require_name(&self.name)?;
        let input = require(name, &self.input, "input tag")?;
        let output = require(name, &self.output, "output tag")?;
        if self.fields.is_empty() {
            return Err(TransformError::configuration(
                name,
                "at least one field must be selected",
            ));
        }
        let fields = require_each(name, &self.fields, "field")?;

        TransformBuilder::new(name, SELECT_URN)
            .input(input)
            .output(
                output,
                SchemaDerivation::project(SchemaDerivation::input(input), fields.iter().copied()),
            )
            .payload(json!({ "fields": fields }))
            .build()
    }
}
