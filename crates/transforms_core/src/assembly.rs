//! Description-level pipeline assembly.
//!
//! Assembly threads a sequence of transforms over a running bundle: it starts
//! from the source collections and, for each transform, expands it against
//! everything produced so far and adds its outputs. Nothing is executed; the
//! point is to reject a broken pipeline before any data flows.

use crate::{NamedCollectionBundle, Result, Transform};
use serde::Serialize;
use tracing::{debug, info};

/// Record of one transform applied during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyStep {
    /// Transform name
    pub transform: String,
    /// Tags the transform consumed
    pub consumed: Vec<String>,
    /// Tags the transform produced
    pub produced: Vec<String>,
}

/// Outcome of a successful assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assembly {
    /// Sources plus every produced collection
    pub bundle: NamedCollectionBundle,
    /// One step per transform, in application order
    pub steps: Vec<AssemblyStep>,
}

/// Assembles `transforms` in order on top of `sources`.
///
/// Fails on the first transform whose inputs are missing, whose output schemas
/// cannot be resolved, or whose output tags collide with existing ones.
pub fn assemble<'a, I>(sources: NamedCollectionBundle, transforms: I) -> Result<Assembly>
where
    I: IntoIterator<Item = &'a Transform>,
{
    let mut bundle = sources;
    let mut steps = Vec::new();

    for transform in transforms {
        let produced = transform.expand(&bundle)?;
        let step = AssemblyStep {
            transform: transform.name().to_string(),
            consumed: transform.input_tags().map(String::from).collect(),
            produced: produced.tags().map(String::from).collect(),
        };
        debug!(
            transform = %step.transform,
            consumed = ?step.consumed,
            produced = ?step.produced,
            "Assembled transform"
        );
        bundle = bundle.merge(produced)?;
        steps.push(step);
    }

    info!(
        "Assembled {} transforms into {} collections",
        steps.len(),
        bundle.len()
    );
    Ok(Assembly { bundle, steps })
}
