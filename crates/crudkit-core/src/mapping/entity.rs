//! Declarative entity mappings.
//!
//! An [`EntityMapping`] is the explicit replacement for class attributes: it
//! names the table, lists the mapped fields with their column types, and
//! optionally marks key fields and column overrides.

use serde::{Deserialize, Serialize};

use super::types::ScalarType;
use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// How an explicitly annotated key field gets its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyAnnotation {
    /// Generated by the database on insert.
    Identity,
    /// Supplied by the caller before insert.
    Assigned,
}

/// A field mapping within an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Field name on the record type.
    pub name: String,
    /// Column name override. Defaults to the field name.
    pub column: Option<String>,
    /// Column data type.
    pub scalar: ScalarType,
    /// Whether the column accepts null.
    pub nullable: bool,
    /// Explicit key annotation.
    pub key: Option<KeyAnnotation>,
    /// Read-only column: selected, never inserted or updated.
    pub computed: bool,
}

impl FieldMapping {
    /// Create a new non-nullable field.
    pub fn new(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self {
            name: name.into(),
            column: None,
            scalar,
            nullable: false,
            key: None,
            computed: false,
        }
    }

    /// Create a nullable field.
    pub fn optional(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self {
            nullable: true,
            ..Self::new(name, scalar)
        }
    }

    /// Map the field to a differently named column.
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Mark as a database-generated key.
    pub fn identity_key(mut self) -> Self {
        self.key = Some(KeyAnnotation::Identity);
        self
    }

    /// Mark as a caller-supplied key.
    pub fn assigned_key(mut self) -> Self {
        self.key = Some(KeyAnnotation::Assigned);
        self
    }

    /// Mark as read-only.
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    /// The column this field maps to.
    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }
}

/// The declarative mapping for one entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMapping {
    /// Type name, used for the default table name and key convention.
    pub type_name: String,
    /// Table name override.
    pub table: Option<String>,
    /// Paired sequence for dialects without native auto-increment.
    pub sequence: Option<String>,
    /// Mapped fields, in column order.
    pub fields: Vec<FieldMapping>,
}

impl EntityMapping {
    /// Create a new mapping for the named type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            table: None,
            sequence: None,
            fields: Vec::new(),
        }
    }

    /// Override the table name.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Name the sequence that feeds the identity key.
    pub fn sequence(mut self, sequence: impl Into<String>) -> Self {
        self.sequence = Some(sequence.into());
        self
    }

    /// Add a field.
    pub fn field(mut self, field: FieldMapping) -> Self {
        self.fields.push(field);
        self
    }

    /// Add multiple fields.
    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldMapping>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Get a field by name (case-insensitive).
    pub fn get_field(&self, name: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }
}

/// A plain record type that maps to one table.
///
/// `from_row` receives rows whose columns have already been renamed to field
/// names and coerced to the mapped column types.
pub trait Entity: Sized + 'static {
    /// The declarative mapping for this type. Called once per cache.
    fn mapping() -> EntityMapping;

    /// Current field values, by field name.
    fn to_values(&self) -> Vec<(&'static str, Value)>;

    /// Build an instance from a mapped row.
    fn from_row(row: &Row) -> Result<Self>;

    /// Write a single field, used to store generated keys.
    fn set_field(&mut self, field: &str, value: Value) -> Result<()>;
}

/// Key value(s) identifying one row, in key column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Key(Vec<Value>);

impl Key {
    /// Create a key from its component values.
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// The component values.
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the key has no components.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Value> for Key {
    fn from(v: Value) -> Self {
        Key(vec![v])
    }
}

impl From<Vec<Value>> for Key {
    fn from(values: Vec<Value>) -> Self {
        Key(values)
    }
}

macro_rules! key_from_scalar {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Key {
            fn from(v: $ty) -> Self {
                Key(vec![Value::from(v)])
            }
        })*
    };
}

key_from_scalar!(i32, i64, String, &str);

impl<A: Into<Value>, B: Into<Value>> From<(A, B)> for Key {
    fn from((a, b): (A, B)) -> Self {
        Key(vec![a.into(), b.into()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_builder() {
        let mapping = EntityMapping::new("Result")
            .table("Results")
            .field(FieldMapping::new("Id", ScalarType::Int32).identity_key())
            .field(FieldMapping::new("Name", ScalarType::String))
            .field(FieldMapping::new("Order", ScalarType::Int32));

        assert_eq!(mapping.table.as_deref(), Some("Results"));
        assert_eq!(mapping.fields.len(), 3);
        assert_eq!(mapping.fields[0].key, Some(KeyAnnotation::Identity));
        assert!(mapping.get_field("order").is_some());
        assert!(mapping.get_field("missing").is_none());
    }

    #[test]
    fn test_column_override() {
        let field = FieldMapping::optional("created", ScalarType::DateTime).column("Created");
        assert!(field.nullable);
        assert_eq!(field.column_name(), "Created");
        assert_eq!(FieldMapping::new("Name", ScalarType::String).column_name(), "Name");
    }

    #[test]
    fn test_key_conversions() {
        assert_eq!(Key::from(5i32).values(), &[Value::Int32(5)]);
        assert_eq!(Key::from("abc").values(), &[Value::String("abc".into())]);
        let composite = Key::from((1i32, "x"));
        assert_eq!(composite.len(), 2);
        assert!(!composite.is_empty());
    }
}
