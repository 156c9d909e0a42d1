//! The transform factory contract.
//!
//! A [`TransformFactory`] turns configuration supplied at construction time into
//! a [`Transform`] description. Implementations may come from anywhere: SQL
//! queries, hand-written Rust, transforms exposed by another runtime. The
//! contract does not care.
//!
//! # Stability
//!
//! This contract is internal and still moving as more transform families are
//! added. Its version is published as [`CONTRACT_VERSION`] with stability
//! [`CONTRACT_STABILITY`]; no backwards compatibility is promised while the
//! stability is [`Stability::Internal`].

use crate::{Result, Transform};
use serde::Serialize;
use std::fmt;

/// Version of the transform factory contract.
pub const CONTRACT_VERSION: &str = "0.1.0";

/// Stability of the transform factory contract.
pub const CONTRACT_STABILITY: Stability = Stability::Internal;

/// Stability level of a published interface.
///
/// # Example
///
/// ```rust
/// use transforms_core::{CONTRACT_STABILITY, Stability};
///
/// // Callers outside this workspace should wait for a stable contract.
/// let safe_to_depend_on = CONTRACT_STABILITY == Stability::Stable;
/// assert!(!safe_to_depend_on);
/// assert_eq!(Stability::Stable.to_string(), "stable");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stability {
    /// May change in any release
    Internal,
    /// Changes follow semantic versioning
    Stable,
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stability::Internal => write!(f, "internal"),
            Stability::Stable => write!(f, "stable"),
        }
    }
}

/// Capability producing a [`Transform`] on demand.
///
/// `build()` takes no arguments: everything a factory needs is supplied when
/// it is constructed. Each call returns a fresh, fully formed description that
/// does not refer back to the factory.
///
/// Implementations must:
///
/// - report invalid or incomplete configuration from `build()` as
///   [`crate::TransformError::Configuration`], never inside the returned
///   transform,
/// - not perform I/O or look at execution-time data,
/// - return equivalent descriptions on every call,
/// - be callable concurrently from several threads.
///
/// # Example
///
/// ```rust
/// use transforms_core::{Result, SchemaDerivation, Transform, TransformBuilder, TransformFactory};
///
/// struct Rename {
///     from: String,
///     to: String,
/// }
///
/// impl TransformFactory for Rename {
///     fn build(&self) -> Result<Transform> {
///         TransformBuilder::new("rename", "example:rename:v1")
///             .input(&self.from)
///             .output(&self.to, SchemaDerivation::input(&self.from))
///             .build()
///     }
/// }
///
/// let factory = Rename { from: "input".into(), to: "output".into() };
/// let transform = factory.build().unwrap();
/// assert_eq!(transform.output_tags().collect::<Vec<_>>(), vec!["output"]);
/// ```
pub trait TransformFactory: Send + Sync {
    /// Builds the transform description.
    fn build(&self) -> Result<Transform>;
}

/// Adapts a closure into a [`TransformFactory`].
///
/// # Example
///
/// ```rust
/// use transforms_core::{factory_fn, TransformBuilder, TransformFactory};
///
/// let factory = factory_fn(|| TransformBuilder::new("noop", "example:noop:v1").build());
/// assert_eq!(factory.build().unwrap().name(), "noop");
/// ```
pub fn factory_fn<F>(f: F) -> FnFactory<F>
where
    F: Fn() -> Result<Transform> + Send + Sync,
{
    FnFactory(f)
}

/// Factory backed by a closure; see [`factory_fn`].
pub struct FnFactory<F>(F);

impl<F> TransformFactory for FnFactory<F>
where
    F: Fn() -> Result<Transform> + Send + Sync,
{
    fn build(&self) -> Result<Transform> {
        (self.0)()
    }
}

impl<F> fmt::Debug for FnFactory<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFactory").finish_non_exhaustive()
    }
}
