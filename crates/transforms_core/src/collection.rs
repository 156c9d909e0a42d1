//! Record collection handles and named bundles of them.
//!
//! Collections are owned by the execution engine; this crate only carries their
//! identities and schemas. A [`NamedCollectionBundle`] groups several collections
//! under unique string tags and is the uniform input/output unit of every
//! schema-aware transform.

use crate::{RecordSchema, Result, TransformError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;
use std::sync::Arc;

/// Identity of a record collection inside the execution engine.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(String);

impl CollectionId {
    /// Creates a collection id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle to a logical collection of records sharing one schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCollection {
    id: CollectionId,
    schema: Arc<RecordSchema>,
}

impl RecordCollection {
    /// Creates a collection handle.
    pub fn new(id: impl Into<String>, schema: impl Into<Arc<RecordSchema>>) -> Self {
        Self {
            id: CollectionId::new(id),
            schema: schema.into(),
        }
    }

    /// Returns the collection id.
    pub fn id(&self) -> &CollectionId {
        &self.id
    }

    /// Returns the schema shared by every record in the collection.
    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }
}

/// Immutable mapping from tags to record collections.
///
/// Tags are unique and non-empty. Iteration is ordered by tag.
///
/// # Example
///
/// ```rust
/// use transforms_core::{Field, FieldType, NamedCollectionBundle, RecordCollection, RecordSchema};
///
/// let schema = RecordSchema::new(vec![Field::new("id", FieldType::Int64)]).unwrap();
/// let bundle = NamedCollectionBundle::of("orders", RecordCollection::new("src/orders", schema.clone()))
///     .unwrap()
///     .and("refunds", RecordCollection::new("src/refunds", schema))
///     .unwrap();
///
/// assert!(bundle.has("orders"));
/// assert_eq!(bundle.tags().collect::<Vec<_>>(), vec!["orders", "refunds"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NamedCollectionBundle {
    collections: BTreeMap<String, RecordCollection>,
}

impl NamedCollectionBundle {
    /// Creates a bundle with no collections.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a bundle holding a single collection.
    pub fn of(tag: impl Into<String>, collection: RecordCollection) -> Result<Self> {
        Self::empty().and(tag, collection)
    }

    /// Returns a new bundle with one more collection.
    ///
    /// Fails if the tag is empty or already present.
    pub fn and(mut self, tag: impl Into<String>, collection: RecordCollection) -> Result<Self> {
        let tag = tag.into();
        if tag.is_empty() {
            return Err(TransformError::EmptyTag);
        }
        match self.collections.entry(tag) {
            btree_map::Entry::Occupied(entry) => {
                Err(TransformError::DuplicateTag(entry.key().clone()))
            }
            btree_map::Entry::Vacant(entry) => {
                entry.insert(collection);
                Ok(self)
            }
        }
    }

    /// Creates a bundle from tag/collection pairs, rejecting duplicate tags.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, RecordCollection)>,
        S: Into<String>,
    {
        pairs
            .into_iter()
            .try_fold(Self::empty(), |bundle, (tag, collection)| {
                bundle.and(tag, collection)
            })
    }

    /// Combines two bundles, rejecting tags present in both.
    pub fn merge(self, other: NamedCollectionBundle) -> Result<Self> {
        other
            .collections
            .into_iter()
            .try_fold(self, |bundle, (tag, collection)| bundle.and(tag, collection))
    }

    /// Returns the collection stored under a tag.
    pub fn get(&self, tag: &str) -> Option<&RecordCollection> {
        self.collections.get(tag)
    }

    /// Returns true if the tag is present.
    pub fn has(&self, tag: &str) -> bool {
        self.collections.contains_key(tag)
    }

    /// Returns the tags in order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Iterates over tag/collection pairs in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RecordCollection)> {
        self.collections.iter().map(|(tag, c)| (tag.as_str(), c))
    }

    /// Returns the number of collections.
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    /// Returns true if the bundle holds no collections.
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

impl<'a> IntoIterator for &'a NamedCollectionBundle {
    type Item = (&'a String, &'a RecordCollection);
    type IntoIter = btree_map::Iter<'a, String, RecordCollection>;

    fn into_iter(self) -> Self::IntoIter {
        self.collections.iter()
    }
}
