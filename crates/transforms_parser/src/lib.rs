//! Parser for pipeline documents (YAML/TOML formats).
//!
//! A pipeline document names the source collections of a pipeline and the
//! transforms applied to them. Each transform entry is the configuration of a
//! built-in factory family selected by its `kind`.
//!
//! # Example
//!
//! ```rust
//! use transforms_parser::parse_yaml;
//!
//! let yaml = r#"
//! version: "1.0.0"
//! name: clicks
//! sources:
//!   events:
//!     fields:
//!       - name: user_id
//!         type: string
//! transforms:
//!   - name: rename
//!     kind: passthrough
//!     mappings:
//!       - from: events
//!         to: clicks
//! "#;
//!
//! let document = parse_yaml(yaml).expect("Failed to parse pipeline");
//! assert_eq!(document.name, "clicks");
//!
//! let assembly = document.assemble().unwrap();
//! assert!(assembly.bundle.has("clicks"));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use transforms_core::{
    Assembly, DeclaredTags, NamedCollectionBundle, RecordCollection, RecordSchema, Transform,
    TransformError, TransformRegistry,
};
use transforms_providers::FactoryConfig;

/// Errors that can occur while reading a pipeline document.
#[derive(Debug, Error)]
pub enum ParserError {
    /// YAML parsing or deserialization failed
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml_ng::Error),

    /// TOML parsing or deserialization failed
    #[error("Failed to parse TOML: {0}")]
    TomlError(String),

    /// File I/O error
    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Unsupported file format
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Invalid file extension
    #[error("Invalid or missing file extension")]
    InvalidExtension,

    /// The document parsed but describes an invalid pipeline
    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Result type alias for parser operations.
pub type Result<T> = std::result::Result<T, ParserError>;

/// Supported pipeline document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// YAML format (.yml, .yaml)
    Yaml,
    /// TOML format (.toml)
    Toml,
}

/// Prefix of the collection ids given to declared sources.
pub const SOURCE_PREFIX: &str = "source";

/// A pipeline: named source schemas and the transforms applied to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDocument {
    /// Document version
    pub version: String,

    /// Pipeline name
    pub name: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Schemas of the source collections, by tag
    #[serde(default)]
    pub sources: BTreeMap<String, RecordSchema>,

    /// Transforms in application order
    #[serde(default)]
    pub transforms: Vec<TransformEntry>,
}

/// One transform of a pipeline document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformEntry {
    /// Name the factory is registered under
    pub name: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Tags the transform is expected to consume and produce
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declare: Option<DeclaredTags>,

    /// Factory configuration, selected by `kind`
    #[serde(flatten)]
    pub config: FactoryConfig,
}

impl PipelineDocument {
    /// Registers one factory per transform entry.
    ///
    /// Entries with a `declare` section are registered with their declared
    /// tags. Fails if two entries share a name.
    pub fn registry(&self) -> Result<TransformRegistry> {
        let mut registry = TransformRegistry::new();
        for entry in &self.transforms {
            let factory = entry.config.clone().into_factory(&entry.name);
            match &entry.declare {
                Some(declared) => {
                    registry.register_declared(&entry.name, factory, declared.clone())?
                }
                None => registry.register_shared(&entry.name, factory)?,
            }
        }
        Ok(registry)
    }

    /// Returns the declared sources as a bundle with ids `source/<tag>`.
    pub fn source_bundle(&self) -> Result<NamedCollectionBundle> {
        let bundle = NamedCollectionBundle::from_pairs(self.sources.iter().map(|(tag, schema)| {
            (
                tag.clone(),
                RecordCollection::new(format!("{}/{}", SOURCE_PREFIX, tag), schema.clone()),
            )
        }))?;
        Ok(bundle)
    }

    /// Builds every transform in document order, stopping at the first
    /// failure.
    pub fn build_transforms(&self) -> Result<Vec<Transform>> {
        let registry = self.registry()?;
        let transforms = self
            .transforms
            .iter()
            .map(|entry| registry.build(&entry.name))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(transforms)
    }

    /// Builds every transform and assembles them over the declared sources.
    pub fn assemble(&self) -> Result<Assembly> {
        let transforms = self.build_transforms()?;
        let assembly = transforms_core::assemble(self.source_bundle()?, &transforms)?;
        Ok(assembly)
    }
}

/// Parse a pipeline document from a YAML string.
///
/// # Example
///
/// ```rust
/// use transforms_parser::parse_yaml;
///
/// let yaml = r#"
/// version: "1.0.0"
/// name: empty
/// "#;
///
/// let document = parse_yaml(yaml).unwrap();
/// assert!(document.transforms.is_empty());
/// ```
pub fn parse_yaml(content: &str) -> Result<PipelineDocument> {
    let document: PipelineDocument = serde_yaml_ng::from_str(content)?;
    Ok(document)
}

/// Parse a pipeline document from a TOML string.
///
/// # Example
///
/// ```rust
/// use transforms_parser::parse_toml;
///
/// let toml = r#"
/// version = "1.0.0"
/// name = "ids"
///
/// [[transforms]]
/// name = "ids"
/// kind = "select"
/// input = "events"
/// output = "ids"
/// fields = ["id"]
/// "#;
///
/// let document = parse_toml(toml).unwrap();
/// assert_eq!(document.transforms[0].config.kind(), "select");
/// ```
pub fn parse_toml(content: &str) -> Result<PipelineDocument> {
    let document: PipelineDocument =
        toml::from_str(content).map_err(|e| ParserError::TomlError(e.to_string()))?;
    Ok(document)
}

/// Detect the document format from a file path based on its extension.
///
/// # Supported Extensions
///
/// * `.yaml`, `.yml` → `DocumentFormat::Yaml`
/// * `.toml` → `DocumentFormat::Toml`
///
/// # Errors
///
/// Returns `ParserError::InvalidExtension` if the file has no extension.
/// Returns `ParserError::UnsupportedFormat` if the extension is not recognized.
pub fn detect_format(path: &Path) -> Result<DocumentFormat> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or(ParserError::InvalidExtension)?;

    match extension.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(DocumentFormat::Yaml),
        "toml" => Ok(DocumentFormat::Toml),
        other => Err(ParserError::UnsupportedFormat(other.to_string())),
    }
}

/// Parse a pipeline document from a file with automatic format detection.
///
/// # Example
///
/// ```no_run
/// use transforms_parser::parse_file;
/// use std::path::Path;
///
/// let document = parse_file(Path::new("pipelines/clicks.yml")).unwrap();
/// println!("Loaded pipeline: {}", document.name);
/// ```
pub fn parse_file(path: &Path) -> Result<PipelineDocument> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    debug!(path = %path.display(), ?format, "Parsing pipeline document");

    match format {
        DocumentFormat::Yaml => parse_yaml(&content),
        DocumentFormat::Toml => parse_toml(&content),
    }
}
