//! # Schema Transforms Providers
//!
//! Built-in transform factory families. Each family is a configuration struct
//! implementing [`transforms_core::TransformFactory`]:
//!
//! - [`PassthroughFactory`]: re-tags collections without touching their shape
//! - [`SelectFactory`]: projects one collection onto a subset of its fields
//! - [`FlattenFactory`]: merges same-shaped collections into one
//! - [`SqlTransformFactory`]: a SQL query over the input collections
//! - [`ExternalTransformFactory`]: a transform implemented by another runtime
//!
//! Required settings are optional at the type level so that a configuration
//! missing them still deserializes; the omission is reported by `build()`.
//!
//! ## Example
//!
//! ```rust
//! use transforms_core::TransformFactory;
//! use transforms_providers::PassthroughFactory;
//!
//! let factory = PassthroughFactory::new("rename").map("input", "output");
//! let transform = factory.build().unwrap();
//!
//! assert_eq!(transform.output_tags().collect::<Vec<_>>(), vec!["output"]);
//! ```

mod config;
mod external;
mod flatten;
mod passthrough;
mod select;
mod sql;

pub use config::*;
pub use external::*;
pub use flatten::*;
pub use passthrough::*;
pub use select::*;
pub use sql::*;

use transforms_core::{Result, TransformError};

/// Checks the factory has a name and returns it.
pub(crate) fn require_name(name: &str) -> Result<&str> {
    if name.is_empty() {
        Err(TransformError::configuration(
            "<unnamed>",
            "factory name is required",
        ))
    } else {
        Ok(name)
    }
}

/// Returns a required, non-blank setting or a configuration error.
pub(crate) fn require<'a>(factory: &str, value: &'a Option<String>, what: &str) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(TransformError::configuration(
            factory,
            format!("{} is required", what),
        )),
    }
}

/// Returns every entry of a list setting trimmed, rejecting blank entries.
pub(crate) fn require_each<'a>(
    factory: &str,
    values: &'a [String],
    what: &str,
) -> Result<Vec<&'a str>> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| match value.trim() {
            "" => Err(TransformError::configuration(
                factory,
                format!("{} {} is blank", what, i + 1),
            )),
            trimmed => Ok(trimmed),
        })
        .collect()
}
