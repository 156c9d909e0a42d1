//! Transform descriptions.
//!
//! A [`Transform`] describes how one [`NamedCollectionBundle`] maps to another.
//! It holds no data: only the tags it consumes, the tags it produces, how each
//! output schema follows from the inputs, and the family-specific parameters an
//! execution engine needs to run it.

use crate::{NamedCollectionBundle, RecordCollection, RecordSchema, Result, TransformError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// URN of transforms produced by [`Transform::then`].
pub const COMPOSITE_URN: &str = "stx:transform:composite:v1";

/// How the schema of an output collection follows from the input bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "derive", rename_all = "snake_case")]
pub enum SchemaDerivation {
    /// Same schema as the input collection under `tag`
    Input {
        /// Input tag
        tag: String,
    },

    /// Schema fixed at build time
    Fixed {
        /// Declared schema
        schema: RecordSchema,
    },

    /// Subset of the fields of another derivation, in the listed order
    Project {
        /// Derivation the fields are taken from
        source: Box<SchemaDerivation>,
        /// Field names to keep
        fields: Vec<String>,
    },

    /// Common schema of several derivations, which must all agree
    Unified {
        /// Derivations that must resolve to the same schema
        sources: Vec<SchemaDerivation>,
    },
}

impl SchemaDerivation {
    /// Pass-through of the input collection under `tag`.
    pub fn input(tag: impl Into<String>) -> Self {
        Self::Input { tag: tag.into() }
    }

    /// Fixed schema.
    pub fn fixed(schema: RecordSchema) -> Self {
        Self::Fixed { schema }
    }

    /// Projection of `source` onto `fields`.
    pub fn project<I, S>(source: SchemaDerivation, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Project {
            source: Box::new(source),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Unified schema of the inputs under `tags`.
    pub fn unified<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Unified {
            sources: tags.into_iter().map(Self::input).collect(),
        }
    }

    /// Returns every input tag this derivation reads.
    pub fn referenced_tags(&self) -> BTreeSet<&str> {
        let mut tags = BTreeSet::new();
        self.collect_tags(&mut tags);
        tags
    }

    fn collect_tags<'a>(&'a self, tags: &mut BTreeSet<&'a str>) {
        match self {
            Self::Input { tag } => {
                tags.insert(tag.as_str());
            }
            Self::Fixed { .. } => {}
            Self::Project { source, .. } => source.collect_tags(tags),
            Self::Unified { sources } => sources.iter().for_each(|s| s.collect_tags(tags)),
        }
    }

    /// Checks the derivation is well formed against a set of declared inputs.
    ///
    /// Returns a description of the first problem found.
    pub(crate) fn check(&self, inputs: &BTreeSet<String>) -> std::result::Result<(), String> {
        match self {
            Self::Input { tag } if !inputs.contains(tag) => {
                Err(format!("derives from undeclared input '{}'", tag))
            }
            Self::Input { .. } | Self::Fixed { .. } => Ok(()),
            Self::Project { source, fields } => {
                if fields.is_empty() {
                    return Err("projection selects no fields".to_string());
                }
                let mut seen = BTreeSet::new();
                for field in fields {
                    if field.trim().is_empty() {
                        return Err("projection selects a blank field name".to_string());
                    }
                    if !seen.insert(field) {
                        return Err(format!("projection selects field '{}' twice", field));
                    }
                }
                source.check(inputs)
            }
            Self::Unified { sources } => {
                if sources.is_empty() {
                    return Err("unification has no sources".to_string());
                }
                sources.iter().try_for_each(|s| s.check(inputs))
            }
        }
    }

    /// Resolves the derivation against an actual input bundle.
    pub fn resolve(
        &self,
        transform: &str,
        input: &NamedCollectionBundle,
    ) -> Result<Arc<RecordSchema>> {
        match self {
            Self::Input { tag } => input
                .get(tag)
                .map(|c| Arc::clone(c.schema()))
                .ok_or_else(|| TransformError::MissingInput {
                    transform: transform.to_string(),
                    tag: tag.clone(),
                }),
            Self::Fixed { schema } => Ok(Arc::new(schema.clone())),
            Self::Project { source, fields } => {
                let source = source.resolve(transform, input)?;
                let selected = fields
                    .iter()
                    .map(|name| {
                        source
                            .field(name)
                            .cloned()
                            .ok_or_else(|| TransformError::UnknownField {
                                transform: transform.to_string(),
                                field: name.clone(),
                            })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Arc::new(RecordSchema::new(selected)?))
            }
            Self::Unified { sources } => {
                let mut resolved = sources.iter().map(|s| s.resolve(transform, input));
                let first = resolved.next().ok_or_else(|| {
                    TransformError::schema_mismatch(transform, "unification has no sources")
                })??;
                for other in resolved {
                    let other = other?;
                    if other != first {
                        return Err(TransformError::schema_mismatch(
                            transform,
                            format!("cannot unify {} with {}", first, other),
                        ));
                    }
                }
                Ok(first)
            }
        }
    }

    /// Rewrites input references in terms of another transform's outputs.
    fn substitute(&self, upstream: &BTreeMap<String, SchemaDerivation>) -> Option<Self> {
        match self {
            Self::Input { tag } => upstream.get(tag).cloned(),
            Self::Fixed { .. } => Some(self.clone()),
            Self::Project { source, fields } => Some(Self::Project {
                source: Box::new(source.substitute(upstream)?),
                fields: fields.clone(),
            }),
            Self::Unified { sources } => Some(Self::Unified {
                sources: sources
                    .iter()
                    .map(|s| s.substitute(upstream))
                    .collect::<Option<Vec<_>>>()?,
            }),
        }
    }
}

impl fmt::Display for SchemaDerivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaDerivation::Input { tag } => write!(f, "input({})", tag),
            SchemaDerivation::Fixed { schema } => write!(f, "{}", schema),
            SchemaDerivation::Project { source, fields } => {
                write!(f, "project({}, [{}])", source, fields.join(", "))
            }
            SchemaDerivation::Unified { sources } => {
                let sources: Vec<String> = sources.iter().map(ToString::to_string).collect();
                write!(f, "unified({})", sources.join(", "))
            }
        }
    }
}

/// Immutable description of a computation from one bundle to another.
///
/// Built through [`crate::TransformBuilder`] or by composing transforms with
/// [`Transform::then`]. Descriptions are cheap to clone and safe to share
/// across threads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transform {
    name: String,
    urn: String,
    inputs: BTreeSet<String>,
    outputs: BTreeMap<String, SchemaDerivation>,
    #[serde(skip_serializing_if = "Value::is_null")]
    payload: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stages: Vec<Transform>,
}

impl Transform {
    pub(crate) fn from_parts(
        name: String,
        urn: String,
        inputs: BTreeSet<String>,
        outputs: BTreeMap<String, SchemaDerivation>,
        payload: Value,
    ) -> Self {
        Self {
            name,
            urn,
            inputs,
            outputs,
            payload,
            stages: Vec::new(),
        }
    }

    /// Returns the transform name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the URN identifying the transform family.
    pub fn urn(&self) -> &str {
        &self.urn
    }

    /// Returns the family-specific parameters.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Returns the stages of a composite transform, empty otherwise.
    pub fn stages(&self) -> &[Transform] {
        &self.stages
    }

    /// Returns true if this transform was built by composition.
    pub fn is_composite(&self) -> bool {
        !self.stages.is_empty()
    }

    /// Returns the tags the transform requires in its input bundle.
    pub fn input_tags(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().map(String::as_str)
    }

    /// Returns the tags of the bundle the transform produces.
    pub fn output_tags(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    /// Returns the schema derivation of an output tag.
    pub fn output(&self, tag: &str) -> Option<&SchemaDerivation> {
        self.outputs.get(tag)
    }

    /// Returns every output tag with its schema derivation.
    pub fn outputs(&self) -> impl Iterator<Item = (&str, &SchemaDerivation)> {
        self.outputs.iter().map(|(tag, d)| (tag.as_str(), d))
    }

    /// Applies the description to an input bundle, yielding the output bundle.
    ///
    /// No records are touched: the result holds one collection handle per
    /// output tag, identified as `<transform>/<tag>`, with its resolved schema.
    /// Tags in `input` the transform does not consume are ignored.
    pub fn expand(&self, input: &NamedCollectionBundle) -> Result<NamedCollectionBundle> {
        if let Some(missing) = self.inputs.iter().find(|tag| !input.has(tag)) {
            return Err(TransformError::MissingInput {
                transform: self.name.clone(),
                tag: missing.clone(),
            });
        }

        let ignored: Vec<&str> = input
            .tags()
            .filter(|tag| !self.inputs.contains(*tag))
            .collect();
        if !ignored.is_empty() {
            debug!(transform = %self.name, ?ignored, "Ignoring unconsumed input tags");
        }

        self.outputs
            .iter()
            .try_fold(NamedCollectionBundle::empty(), |bundle, (tag, derivation)| {
                let schema = derivation.resolve(&self.name, input)?;
                let collection = RecordCollection::new(format!("{}/{}", self.name, tag), schema);
                bundle.and(tag.clone(), collection)
            })
    }

    /// Composes this transform with `next`, feeding this transform's outputs
    /// into `next`.
    ///
    /// Every input of `next` must be an output of `self`. Outputs of `self` that
    /// `next` does not consume are dropped from the composite.
    pub fn then(&self, next: &Transform, name: impl Into<String>) -> Result<Transform> {
        let name = name.into();
        if name.is_empty() {
            return Err(TransformError::configuration(
                "<unnamed>",
                "composite transform name is required",
            ));
        }

        if let Some(tag) = next.inputs.iter().find(|t| !self.outputs.contains_key(*t)) {
            return Err(TransformError::configuration(
                &name,
                format!(
                    "stage '{}' consumes tag '{}' which stage '{}' does not produce",
                    next.name, tag, self.name
                ),
            ));
        }

        let mut outputs = BTreeMap::new();
        for (tag, derivation) in &next.outputs {
            let rewritten = derivation.substitute(&self.outputs).ok_or_else(|| {
                TransformError::configuration(
                    &name,
                    format!("output '{}' of stage '{}' cannot be resolved", tag, next.name),
                )
            })?;
            outputs.insert(tag.clone(), rewritten);
        }

        let mut stages = Vec::new();
        for stage in [self, next] {
            if stage.is_composite() {
                stages.extend(stage.stages.iter().cloned());
            } else {
                stages.push(stage.clone());
            }
        }

        debug!(composite = %name, stages = stages.len(), "Composed transforms");

        Ok(Transform {
            name,
            urn: COMPOSITE_URN.to_string(),
            inputs: self.inputs.clone(),
            outputs,
            payload: Value::Null,
            stages,
        })
    }
}
