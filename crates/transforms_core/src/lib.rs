//! # Schema Transforms Core
//!
//! Core contract and types for the Schema Transforms Engine.
//!
//! This crate defines how a component declares that it consumes and produces
//! *named bundles of schema-typed record collections*. It does not execute
//! anything: a [`TransformFactory`] builds a [`Transform`] description, and an
//! external engine later applies that description to real data.
//!
//! ## Key Concepts
//!
//! - **RecordSchema**: ordered, typed field list describing record shape
//! - **RecordCollection**: handle to a collection of records sharing one schema
//! - **NamedCollectionBundle**: tag-to-collection mapping used as the input and
//!   output of every schema-aware transform
//! - **Transform**: immutable description of a computation from one bundle to
//!   another
//! - **TransformFactory**: capability producing a `Transform` on demand
//! - **TransformRegistry**: named factories, built on request during pipeline
//!   assembly
//!
//! ## Example
//!
//! ```rust
//! use transforms_core::{
//!     FieldType, NamedCollectionBundle, RecordCollection, RecordSchemaBuilder,
//!     SchemaDerivation, TransformBuilder,
//! };
//!
//! let schema = RecordSchemaBuilder::new()
//!     .field("user_id", FieldType::String)
//!     .build()
//!     .unwrap();
//! let input = NamedCollectionBundle::of("input", RecordCollection::new("src/input", schema)).unwrap();
//!
//! let transform = TransformBuilder::new("rename", "stx:transform:passthrough:v1")
//!     .input("input")
//!     .output("output", SchemaDerivation::input("input"))
//!     .build()
//!     .unwrap();
//!
//! let output = transform.expand(&input).unwrap();
//! assert_eq!(output.tags().collect::<Vec<_>>(), vec!["output"]);
//! ```

pub mod assembly;
pub mod builder;
pub mod collection;
pub mod error;
pub mod factory;
pub mod registry;
pub mod schema;
pub mod transform;

pub use assembly::*;
pub use builder::*;
pub use collection::*;
pub use error::*;
pub use factory::*;
pub use registry::*;
pub use schema::*;
pub use transform::*;
