//! Builder pattern for creating transforms and schemas.
//!
//! This module provides fluent builders for constructing [`Transform`]
//! descriptions and [`RecordSchema`]s. Both validate on `build()` and report
//! problems as errors instead of panicking, so factories can surface invalid
//! configuration before any pipeline is assembled.

use crate::{
    Field, FieldType, RecordSchema, Result, SchemaDerivation, Transform, TransformError,
};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Builder for creating a [`Transform`].
///
/// # Example
///
/// ```rust
/// use transforms_core::{SchemaDerivation, TransformBuilder};
///
/// let transform = TransformBuilder::new("rename", "stx:transform:passthrough:v1")
///     .input("input")
///     .output("output", SchemaDerivation::input("input"))
///     .build()
///     .unwrap();
///
/// assert_eq!(transform.output_tags().collect::<Vec<_>>(), vec!["output"]);
/// ```
#[derive(Debug, Default)]
pub struct TransformBuilder {
    name: Option<String>,
    urn: Option<String>,
    inputs: Vec<String>,
    outputs: Vec<(String, SchemaDerivation)>,
    payload: Option<Value>,
}

impl TransformBuilder {
    /// Creates a new transform builder.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the transform, used in errors and collection ids
    /// * `urn` - URN identifying the transform family
    pub fn new(name: impl Into<String>, urn: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            urn: Some(urn.into()),
            ..Default::default()
        }
    }

    /// Declares a required input tag.
    pub fn input(mut self, tag: impl Into<String>) -> Self {
        self.inputs.push(tag.into());
        self
    }

    /// Declares several required input tags.
    pub fn inputs<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Declares an output tag and how its schema is derived.
    pub fn output(mut self, tag: impl Into<String>, derivation: SchemaDerivation) -> Self {
        self.outputs.push((tag.into(), derivation));
        self
    }

    /// Sets the family-specific parameters.
    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Builds the transform.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Configuration`] if the name or URN is missing,
    /// a tag is empty or repeated, or an output derives from an input that was
    /// not declared.
    pub fn build(self) -> Result<Transform> {
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| TransformError::configuration("<unnamed>", "name is required"))?;
        let fail = |message: String| TransformError::configuration(&name, message);

        let urn = self
            .urn
            .filter(|u| !u.is_empty())
            .ok_or_else(|| fail("urn is required".to_string()))?;

        let mut inputs = BTreeSet::new();
        for tag in self.inputs {
            if tag.trim().is_empty() {
                return Err(fail("input tags cannot be blank".to_string()));
            }
            if inputs.contains(&tag) {
                return Err(fail(format!("input tag '{}' declared twice", tag)));
            }
            inputs.insert(tag);
        }

        let mut outputs = BTreeMap::new();
        for (tag, derivation) in self.outputs {
            if tag.trim().is_empty() {
                return Err(fail("output tags cannot be blank".to_string()));
            }
            if outputs.contains_key(&tag) {
                return Err(fail(format!("output tag '{}' declared twice", tag)));
            }
            derivation
                .check(&inputs)
                .map_err(|problem| fail(format!("output '{}' {}", tag, problem)))?;
            outputs.insert(tag, derivation);
        }

        let payload = self.payload.unwrap_or(Value::Null);
        if !(payload.is_null() || payload.is_object()) {
            return Err(fail("payload must be an object".to_string()));
        }

        Ok(Transform::from_parts(name, urn, inputs, outputs, payload))
    }
}

/// Builder for creating a [`RecordSchema`].
///
/// # Example
///
/// ```rust
/// use transforms_core::{FieldType, RecordSchemaBuilder};
///
/// let schema = RecordSchemaBuilder::new()
///     .field("user_id", FieldType::String)
///     .nullable_field("referrer", FieldType::String)
///     .build()
///     .unwrap();
///
/// assert!(schema.field("referrer").unwrap().nullable);
/// ```
#[derive(Debug, Default)]
pub struct RecordSchemaBuilder {
    fields: Vec<Field>,
}

impl RecordSchemaBuilder {
    /// Creates a new schema builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a non-nullable field.
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(Field::new(name, field_type));
        self
    }

    /// Adds a nullable field.
    pub fn nullable_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields
            .push(Field::new(name, field_type).with_nullable(true));
        self
    }

    /// Adds a fully specified field.
    pub fn with(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Builds the schema, rejecting empty or duplicate field names.
    pub fn build(self) -> Result<RecordSchema> {
        RecordSchema::new(self.fields)
    }
}
