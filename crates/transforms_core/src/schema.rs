//! Record schemas and field types.
//!
//! A [`RecordSchema`] is an ordered, immutable list of named, typed fields that
//! describes the shape of every record in a collection. Schemas convert to and
//! from Arrow schemas so engines speaking Arrow can exchange them.

use crate::{Result, TransformError};
use arrow_schema::{DataType, Field as ArrowField, Fields, Schema as ArrowSchema, TimeUnit};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Type of a single field in a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Boolean value
    Boolean,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    Float64,
    /// UTF-8 string
    String,
    /// Opaque byte string
    Bytes,
    /// Calendar date
    Date,
    /// Timestamp with microsecond precision
    Timestamp,
    /// Homogeneous list of values
    List(Box<FieldType>),
    /// Nested record
    Row(RecordSchema),
}

impl FieldType {
    /// Converts this type to the equivalent Arrow data type.
    pub fn to_arrow(&self) -> DataType {
        match self {
            FieldType::Boolean => DataType::Boolean,
            FieldType::Int32 => DataType::Int32,
            FieldType::Int64 => DataType::Int64,
            FieldType::Float32 => DataType::Float32,
            FieldType::Float64 => DataType::Float64,
            FieldType::String => DataType::Utf8,
            FieldType::Bytes => DataType::Binary,
            FieldType::Date => DataType::Date32,
            FieldType::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
            FieldType::List(element) => {
                DataType::List(Arc::new(ArrowField::new("item", element.to_arrow(), true)))
            }
            FieldType::Row(schema) => DataType::Struct(schema.arrow_fields()),
        }
    }

    /// Converts an Arrow data type to a field type.
    ///
    /// Arrow types without a counterpart (decimals, unions, dictionaries, ...)
    /// yield [`TransformError::UnsupportedType`].
    pub fn try_from_arrow(data_type: &DataType) -> Result<Self> {
        let field_type = match data_type {
            DataType::Boolean => FieldType::Boolean,
            DataType::Int8 | DataType::Int16 | DataType::Int32 => FieldType::Int32,
            DataType::Int64 => FieldType::Int64,
            DataType::Float16 | DataType::Float32 => FieldType::Float32,
            DataType::Float64 => FieldType::Float64,
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => FieldType::String,
            DataType::Binary | DataType::LargeBinary | DataType::BinaryView => FieldType::Bytes,
            DataType::Date32 | DataType::Date64 => FieldType::Date,
            DataType::Timestamp(_, _) => FieldType::Timestamp,
            DataType::List(element) | DataType::LargeList(element) => {
                FieldType::List(Box::new(FieldType::try_from_arrow(element.data_type())?))
            }
            DataType::Struct(fields) => FieldType::Row(RecordSchema::try_from_arrow_fields(fields)?),
            other => return Err(TransformError::UnsupportedType(other.to_string())),
        };
        Ok(field_type)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Int32 => write!(f, "int32"),
            FieldType::Int64 => write!(f, "int64"),
            FieldType::Float32 => write!(f, "float32"),
            FieldType::Float64 => write!(f, "float64"),
            FieldType::String => write!(f, "string"),
            FieldType::Bytes => write!(f, "bytes"),
            FieldType::Date => write!(f, "date"),
            FieldType::Timestamp => write!(f, "timestamp"),
            FieldType::List(element) => write!(f, "list<{}>", element),
            FieldType::Row(schema) => write!(f, "row{}", schema),
        }
    }
}

/// A single named field in a record schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field name
    pub name: String,

    /// Field data type
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Whether the field can contain null values
    #[serde(default)]
    pub nullable: bool,

    /// Optional human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Field {
    /// Creates a non-nullable field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
            description: None,
        }
    }

    /// Sets whether the field is nullable.
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Sets the field description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn to_arrow(&self) -> ArrowField {
        ArrowField::new(self.name.clone(), self.field_type.to_arrow(), self.nullable)
    }
}

/// Ordered, immutable list of fields describing the shape of a record.
///
/// Field names are unique and non-empty; both properties are checked on
/// construction and on deserialization.
///
/// # Example
///
/// ```rust
/// use transforms_core::{Field, FieldType, RecordSchema};
///
/// let schema = RecordSchema::new(vec![
///     Field::new("user_id", FieldType::String),
///     Field::new("clicks", FieldType::Int64).with_nullable(true),
/// ])
/// .unwrap();
///
/// assert_eq!(schema.len(), 2);
/// assert_eq!(schema.to_string(), "(user_id: string, clicks: int64?)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SchemaDef", into = "SchemaDef")]
pub struct RecordSchema {
    fields: Vec<Field>,
}

#[derive(Serialize, Deserialize)]
struct SchemaDef {
    #[serde(default)]
    fields: Vec<Field>,
}

impl TryFrom<SchemaDef> for RecordSchema {
    type Error = TransformError;

    fn try_from(def: SchemaDef) -> Result<Self> {
        RecordSchema::new(def.fields)
    }
}

impl From<RecordSchema> for SchemaDef {
    fn from(schema: RecordSchema) -> Self {
        SchemaDef {
            fields: schema.fields,
        }
    }
}

impl RecordSchema {
    /// Creates a schema, rejecting empty or duplicate field names.
    pub fn new(fields: Vec<Field>) -> Result<Self> {
        let mut seen = HashSet::new();
        for field in &fields {
            if field.name.is_empty() {
                return Err(TransformError::EmptyFieldName);
            }
            if !seen.insert(field.name.as_str()) {
                return Err(TransformError::DuplicateField(field.name.clone()));
            }
        }
        Ok(Self { fields })
    }

    /// Creates a schema with no fields.
    pub fn empty() -> Self {
        Self { fields: Vec::new() }
    }

    /// Returns the fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the position of a field by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Returns the field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Converts this schema to an Arrow schema.
    pub fn to_arrow(&self) -> ArrowSchema {
        ArrowSchema::new(self.arrow_fields())
    }

    /// Converts an Arrow schema to a record schema.
    pub fn try_from_arrow(schema: &ArrowSchema) -> Result<Self> {
        Self::try_from_arrow_fields(schema.fields())
    }

    fn arrow_fields(&self) -> Fields {
        Fields::from(self.fields.iter().map(Field::to_arrow).collect::<Vec<_>>())
    }

    fn try_from_arrow_fields(fields: &Fields) -> Result<Self> {
        let fields = fields
            .iter()
            .map(|f| {
                Ok(Field {
                    name: f.name().clone(),
                    field_type: FieldType::try_from_arrow(f.data_type())?,
                    nullable: f.is_nullable(),
                    description: None,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(fields)
    }
}

impl fmt::Display for RecordSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", field.name, field.field_type)?;
            if field.nullable {
                write!(f, "?")?;
            }
        }
        write!(f, ")")
    }
}
