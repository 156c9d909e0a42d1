//! Error types for schema transforms.
//!
//! This module defines the errors that can occur while describing, building,
//! registering and expanding transforms. Configuration errors are the only kind
//! intrinsic to the factory contract; the rest come from bundle and schema
//! validation during assembly.

use thiserror::Error;

/// Result type for transform operations.
pub type Result<T> = std::result::Result<T, TransformError>;

/// Main error type for transform operations.
#[derive(Error, Debug)]
pub enum TransformError {
    /// Invalid or incomplete factory configuration, detected at build time
    #[error("Configuration error in factory '{factory}': {message}")]
    Configuration {
        /// Name of the offending factory
        factory: String,
        /// Description of the problem
        message: String,
    },

    /// Tag appears more than once in a bundle
    #[error("Duplicate tag '{0}' in collection bundle")]
    DuplicateTag(String),

    /// Tag is the empty string
    #[error("Collection tags cannot be empty")]
    EmptyTag,

    /// Field name appears more than once in a schema
    #[error("Duplicate field '{0}' in record schema")]
    DuplicateField(String),

    /// Field name is the empty string
    #[error("Field names cannot be empty")]
    EmptyFieldName,

    /// A transform was expanded over a bundle lacking one of its inputs
    #[error("Transform '{transform}' requires input tag '{tag}' which is missing from the bundle")]
    MissingInput {
        /// Transform name
        transform: String,
        /// Missing tag
        tag: String,
    },

    /// A projection referenced a field the source schema does not have
    #[error("Transform '{transform}' references unknown field '{field}'")]
    UnknownField {
        /// Transform name
        transform: String,
        /// Field name
        field: String,
    },

    /// Input schemas are incompatible with what the transform expects
    #[error("Schema mismatch in transform '{transform}': {message}")]
    SchemaMismatch {
        /// Transform name
        transform: String,
        /// Mismatch details
        message: String,
    },

    /// A factory name was registered twice
    #[error("Transform factory '{0}' is already registered")]
    DuplicateFactory(String),

    /// No factory registered under the requested name
    #[error("No transform factory registered under '{0}'")]
    UnknownFactory(String),

    /// Type has no counterpart in the record type system
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TransformError {
    /// Creates a new configuration error for the named factory.
    pub fn configuration(factory: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            factory: factory.into(),
            message: message.into(),
        }
    }

    /// Creates a new schema mismatch error.
    pub fn schema_mismatch(transform: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            transform: transform.into(),
            message: message.into(),
        }
    }

    /// Returns true if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}
