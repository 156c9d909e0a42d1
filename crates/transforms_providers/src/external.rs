//! Cross-runtime transforms.
//!
//! An external transform is implemented outside this process, for example by
//! a transform service of another SDK. The description carries the foreign
//! URN and configuration payload; the output schemas must be declared because
//! nothing here can ask the other runtime for them.

use crate::{require, require_each, require_name};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use transforms_core::{
    RecordSchema, Result, SchemaDerivation, Transform, TransformBuilder, TransformError,
    TransformFactory,
};

/// URN of cross-runtime transforms. The foreign URN is part of the payload.
pub const EXTERNAL_URN: &str = "stx:transform:external:v1";

/// `<namespace>:<segment>[:<segment>...]:v<version>`
static URN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9_-]*(:[A-Za-z0-9_.\-]+)+:v[0-9]+$").expect("valid URN pattern")
});

/// Factory for transforms executed by another runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalTransformFactory {
    #[serde(skip)]
    name: String,

    /// URN of the foreign transform, e.g. `beam:schematransform:kafka_read:v1`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urn: Option<String>,

    /// Address of the service able to expand the foreign transform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expansion_service: Option<String>,

    /// Input tags
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Output tags with their declared schemas
    #[serde(default)]
    pub outputs: BTreeMap<String, RecordSchema>,

    /// Configuration handed to the foreign transform
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl ExternalTransformFactory {
    /// Creates a factory for the foreign transform identified by `urn`.
    pub fn new(name: impl Into<String>, urn: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            urn: Some(urn.into()),
            ..Default::default()
        }
    }

    /// Adds an input tag.
    pub fn input(mut self, tag: impl Into<String>) -> Self {
        self.inputs.push(tag.into());
        self
    }

    /// Adds an output tag with its schema.
    pub fn output(mut self, tag: impl Into<String>, schema: RecordSchema) -> Self {
        self.outputs.insert(tag.into(), schema);
        self
    }

    /// Sets the expansion service address.
    pub fn expansion_service(mut self, address: impl Into<String>) -> Self {
        self.expansion_service = Some(address.into());
        self
    }

    /// Sets the configuration handed to the foreign transform.
    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = payload;
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

impl TransformFactory for ExternalTransformFactory {
    fn build(&self) -> Result<Transform> {
        let name = require_name(&self.name)?;
        let urn = require(name, &self.urn, "urn")?;
        if !URN_PATTERN.is_match(urn) {
            return Err(TransformError::configuration(
                name,
                format!(
                    "urn '{}' does not match <namespace>:<segment>...:v<version>",
                    urn
                ),
            ));
        }
        if !(self.payload.is_null() || self.payload.is_object()) {
            return Err(TransformError::configuration(
                name,
                "payload must be a mapping",
            ));
        }
        if let Some(service) = &self.expansion_service {
            if service.trim().is_empty() {
                return Err(TransformError::configuration(
                    name,
                    "expansion_service cannot be blank",
                ));
            }
        }

        let inputs = require_each(name, &self.inputs, "input tag")?;
        let declared: Vec<String> = self.outputs.keys().cloned().collect();
        let output_tags = require_each(name, &declared, "output tag")?;

        output_tags
            .into_iter()
            .zip(self.outputs.values())
            .fold(
                TransformBuilder::new(name, EXTERNAL_URN).inputs(inputs),
                |builder, (tag, schema)| builder.output(tag, SchemaDerivation::fixed(schema.clone())),
            )
            .payload(json!({
                "urn": urn,
                "expansion_service": self.expansion_service,
                "config": self.payload,
            }))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use transforms_core::{FieldType, RecordSchemaBuilder};

    fn messages() -> RecordSchema {
        RecordSchemaBuilder::new()
            .field("key", FieldType::Bytes)
            .field("value", FieldType::Bytes)
            .build()
            .unwrap()
    }

    #[test]
    fn test_source_without_inputs() {
        let transform = ExternalTransformFactory::new("kafka", "beam:schematransform:kafka_read:v1")
            .output("messages", messages())
            .expansion_service("localhost:8097")
            .payload(json!({"topic": "clicks"}))
            .build()
            .unwrap();

        assert_eq!(transform.urn(), EXTERNAL_URN);
        assert_eq!(transform.input_tags().count(), 0);
        assert_eq!(transform.output_tags().collect::<Vec<_>>(), vec!["messages"]);
        assert_eq!(
            transform.payload()["urn"],
            json!("beam:schematransform:kafka_read:v1")
        );
        assert_eq!(transform.payload()["config"]["topic"], json!("clicks"));
    }

    #[test]
    fn test_urn_validation() {
        for urn in ["kafka_read", "beam:kafka_read", "Beam:x:v1", "beam:x:vX", "beam::v1"] {
            let err = ExternalTransformFactory::new("ext", urn).build().unwrap_err();
            assert!(err.to_string().contains("does not match"), "accepted '{}'", urn);
        }

        for urn in ["beam:transform:org.apache.beam:kafka_read:v1", "stx:noop:v2"] {
            assert!(
                ExternalTransformFactory::new("ext", urn).build().is_ok(),
                "rejected '{}'",
                urn
            );
        }
    }

    #[test]
    fn test_missing_urn() {
        let factory = ExternalTransformFactory {
            urn: None,
            ..ExternalTransformFactory::new("ext", "stx:noop:v1")
        };
        assert!(factory.build().unwrap_err().to_string().contains("urn is required"));
    }

    #[test]
    fn test_scalar_payload_rejected() {
        let err = ExternalTransformFactory::new("ext", "stx:noop:v1")
            .payload(json!(42))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("payload must be a mapping"));
    }

    #[test]
    fn test_blank_input_tag() {
        let err = ExternalTransformFactory::new("ext", "stx:noop:v1")
            .input("  ")
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("input tag 1 is blank"));
    }

    #[test]
    fn test_blank_output_tag() {
        let err = ExternalTransformFactory::new("ext", "stx:noop:v1")
            .output(" ", messages())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("output tag 1 is blank"));
    }

    #[test]
    fn test_blank_expansion_service() {
        let err = ExternalTransformFactory::new("ext", "stx:noop:v1")
            .expansion_service(" ")
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
