//! Table descriptors derived from entity mappings.

use std::collections::HashSet;

use serde::Serialize;

use super::entity::{EntityMapping, FieldMapping, KeyAnnotation};
use super::types::ScalarType;
use crate::error::{Error, Result};
use crate::row::Row;

/// How a table's primary key value is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeyPolicy {
    /// Single database-generated key, read back after insert.
    Identity,
    /// Single caller-supplied key.
    Assigned,
    /// Multiple caller-supplied key columns.
    Composite,
}

/// One mapped column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescriptor {
    /// Field name on the record type.
    pub field: String,
    /// Column name in the table.
    pub column: String,
    /// Column data type.
    pub scalar: ScalarType,
    /// Whether the column accepts null.
    pub nullable: bool,
    /// Part of the primary key.
    pub key: bool,
    /// Value produced by the database on insert.
    pub generated: bool,
    /// Read-only column.
    pub computed: bool,
}

impl ColumnDescriptor {
    fn from_field(field: &FieldMapping, key: bool, generated: bool) -> Self {
        Self {
            field: field.name.clone(),
            column: field.column_name().to_string(),
            scalar: field.scalar,
            nullable: field.nullable,
            key,
            generated,
            computed: field.computed,
        }
    }

    /// Check if the column is written by INSERT.
    pub fn is_insertable(&self) -> bool {
        !self.computed && !self.generated
    }

    /// Check if the column is written by UPDATE.
    pub fn is_updatable(&self) -> bool {
        !self.computed && !self.key
    }
}

/// Resolved table shape for one entity type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDescriptor {
    /// Entity type name.
    pub entity: String,
    /// Table name.
    pub table: String,
    /// Columns in mapping order.
    pub columns: Vec<ColumnDescriptor>,
    /// Key policy.
    pub key_policy: KeyPolicy,
    /// Paired sequence feeding the identity key, if mapped.
    pub sequence: Option<String>,
}

impl TableDescriptor {
    /// Resolve a mapping into a descriptor.
    ///
    /// Key precedence: explicit key annotations win; otherwise a field named
    /// `Id`; otherwise a field named `<TypeName>Id`. Name matching is
    /// case-insensitive. A convention key is an identity key when its type is
    /// integral and an assigned key otherwise.
    pub fn build(mapping: &EntityMapping) -> Result<Self> {
        let entity = mapping.type_name.clone();
        let fail = |reason: String| Error::mapping(&entity, reason);

        if entity.trim().is_empty() {
            return Err(fail("empty type name".into()));
        }
        if mapping.fields.is_empty() {
            return Err(fail("no mapped fields".into()));
        }

        let mut seen = HashSet::new();
        for field in &mapping.fields {
            if !seen.insert(field.name.to_ascii_lowercase()) {
                return Err(fail(format!("field {} mapped twice", field.name)));
            }
        }

        let table = mapping.table.clone().unwrap_or_else(|| entity.clone());
        if table.trim().is_empty() {
            return Err(fail("empty table name".into()));
        }

        let (key_fields, key_policy) = Self::resolve_key(mapping).map_err(fail)?;

        if let Some(field) = key_fields
            .iter()
            .find_map(|name| mapping.get_field(name).filter(|f| f.computed))
        {
            return Err(fail(format!("key field {} is computed", field.name)));
        }

        let columns = mapping
            .fields
            .iter()
            .map(|field| {
                let key = key_fields.iter().any(|k| k == &field.name);
                let generated = key && key_policy == KeyPolicy::Identity;
                ColumnDescriptor::from_field(field, key, generated)
            })
            .collect();

        Ok(Self {
            entity,
            table,
            columns,
            key_policy,
            sequence: mapping.sequence.clone(),
        })
    }

    fn resolve_key(mapping: &EntityMapping) -> Result<(Vec<String>, KeyPolicy), String> {
        let annotated: Vec<&FieldMapping> =
            mapping.fields.iter().filter(|f| f.key.is_some()).collect();

        match annotated.as_slice() {
            [] => {
                let convention = format!("{}Id", mapping.type_name);
                let field = mapping
                    .get_field("Id")
                    .or_else(|| mapping.get_field(&convention))
                    .ok_or_else(|| format!("no key field (expected Id or {convention})"))?;
                let policy = if field.scalar.is_integral() {
                    KeyPolicy::Identity
                } else {
                    KeyPolicy::Assigned
                };
                Ok((vec![field.name.clone()], policy))
            }
            [field] => match field.key {
                Some(KeyAnnotation::Identity) if !field.scalar.is_integral() => Err(format!(
                    "identity key {} must be an integer, found {}",
                    field.name, field.scalar
                )),
                Some(KeyAnnotation::Identity) => Ok((vec![field.name.clone()], KeyPolicy::Identity)),
                _ => Ok((vec![field.name.clone()], KeyPolicy::Assigned)),
            },
            fields => {
                if let Some(field) = fields
                    .iter()
                    .find(|f| f.key == Some(KeyAnnotation::Identity))
                {
                    return Err(format!(
                        "composite key cannot include identity field {}",
                        field.name
                    ));
                }
                let names = fields.iter().map(|f| f.name.clone()).collect();
                Ok((names, KeyPolicy::Composite))
            }
        }
    }

    /// Key columns in mapping order.
    pub fn key_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.key)
    }

    /// Number of key columns.
    pub fn key_arity(&self) -> usize {
        self.key_columns().count()
    }

    /// The generated key column, if the policy is identity.
    pub fn identity_column(&self) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.generated)
    }

    /// Columns written by INSERT.
    pub fn insertable_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.is_insertable())
    }

    /// Columns written by UPDATE.
    pub fn updatable_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.is_updatable())
    }

    /// Find a column by column name (case-insensitive).
    pub fn column_named(&self, column: &str) -> Option<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|c| c.column.eq_ignore_ascii_case(column))
    }

    /// Rename row columns to field names and coerce values to column types.
    ///
    /// Columns the descriptor does not know are passed through untouched.
    pub fn map_row(&self, row: Row) -> Result<Row> {
        let (columns, values) = row.into_parts();
        let mut fields = Vec::with_capacity(columns.len());
        let mut mapped = Vec::with_capacity(values.len());

        for (name, value) in columns.iter().zip(values) {
            match self.column_named(name) {
                Some(column) => {
                    let value = value.coerce(column.scalar).map_err(|e| match e {
                        Error::Conversion { expected, found } => Error::conversion(
                            format!("{expected} for {}.{}", self.table, column.column),
                            found,
                        ),
                        other => other,
                    })?;
                    fields.push(column.field.clone());
                    mapped.push(value);
                }
                None => {
                    fields.push(name.clone());
                    mapped.push(value);
                }
            }
        }

        Ok(Row::new(fields, mapped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn people() -> EntityMapping {
        EntityMapping::new("Person")
            .table("People")
            .field(FieldMapping::new("Id", ScalarType::Int32))
            .field(FieldMapping::new("Name", ScalarType::String))
    }

    #[test]
    fn test_convention_id_is_identity() {
        let d = TableDescriptor::build(&people()).unwrap();
        assert_eq!(d.table, "People");
        assert_eq!(d.key_policy, KeyPolicy::Identity);
        assert_eq!(d.identity_column().unwrap().column, "Id");
        assert_eq!(d.insertable_columns().count(), 1);
        assert_eq!(d.updatable_columns().count(), 1);
    }

    #[test]
    fn test_type_name_id_convention() {
        let mapping = EntityMapping::new("ObjectX")
            .field(FieldMapping::new("ObjectXId", ScalarType::String))
            .field(FieldMapping::new("Name", ScalarType::String));
        let d = TableDescriptor::build(&mapping).unwrap();
        assert_eq!(d.table, "ObjectX");
        assert_eq!(d.key_policy, KeyPolicy::Assigned);
        assert_eq!(d.key_columns().next().unwrap().field, "ObjectXId");
        assert_eq!(d.insertable_columns().count(), 2);
    }

    #[test]
    fn test_id_beats_type_name_id() {
        let mapping = EntityMapping::new("Widget")
            .field(FieldMapping::new("WidgetId", ScalarType::Int32))
            .field(FieldMapping::new("Id", ScalarType::Int64));
        let d = TableDescriptor::build(&mapping).unwrap();
        assert_eq!(d.key_columns().next().unwrap().field, "Id");
    }

    #[test]
    fn test_explicit_key_beats_convention() {
        let mapping = EntityMapping::new("Stuff")
            .field(FieldMapping::new("Id", ScalarType::Int32))
            .field(FieldMapping::new("TheId", ScalarType::Int32).assigned_key());
        let d = TableDescriptor::build(&mapping).unwrap();
        assert_eq!(d.key_policy, KeyPolicy::Assigned);
        assert_eq!(d.key_columns().next().unwrap().field, "TheId");
        assert!(d.identity_column().is_none());
    }

    #[test]
    fn test_composite_key() {
        let mapping = EntityMapping::new("Membership")
            .field(FieldMapping::new("GroupId", ScalarType::Int32).assigned_key())
            .field(FieldMapping::new("UserId", ScalarType::Int32).assigned_key())
            .field(FieldMapping::new("Role", ScalarType::String));
        let d = TableDescriptor::build(&mapping).unwrap();
        assert_eq!(d.key_policy, KeyPolicy::Composite);
        assert_eq!(d.key_arity(), 2);
        assert_eq!(d.updatable_columns().count(), 1);
    }

    #[test]
    fn test_no_key_is_mapping_error() {
        let mapping =
            EntityMapping::new("Orphan").field(FieldMapping::new("Name", ScalarType::String));
        let err = TableDescriptor::build(&mapping).unwrap_err();
        assert!(matches!(err, Error::Mapping { .. }));
    }

    #[test]
    fn test_invalid_identity_keys() {
        let text_identity = EntityMapping::new("Doc")
            .field(FieldMapping::new("Code", ScalarType::String).identity_key());
        assert!(TableDescriptor::build(&text_identity).is_err());

        let composite_identity = EntityMapping::new("Pair")
            .field(FieldMapping::new("A", ScalarType::Int32).identity_key())
            .field(FieldMapping::new("B", ScalarType::Int32).assigned_key());
        assert!(TableDescriptor::build(&composite_identity).is_err());

        let duplicate = people().field(FieldMapping::new("name", ScalarType::String));
        assert!(TableDescriptor::build(&duplicate).is_err());
    }

    #[test]
    fn test_map_row_renames_and_coerces() {
        let mapping = EntityMapping::new("Result")
            .field(FieldMapping::new("Id", ScalarType::Int32))
            .field(FieldMapping::new("position", ScalarType::Int32).column("Order"));
        let d = TableDescriptor::build(&mapping).unwrap();

        let row = Row::new(
            vec!["ID".to_string(), "ORDER".to_string(), "extra".to_string()],
            vec![
                Value::Decimal("7".into()),
                Value::Int64(3),
                Value::String("x".into()),
            ],
        );
        let mapped = d.map_row(row).unwrap();
        assert_eq!(mapped.value("Id"), Some(&Value::Int32(7)));
        assert_eq!(mapped.value("position"), Some(&Value::Int32(3)));
        assert_eq!(mapped.value("extra"), Some(&Value::String("x".into())));
    }
}
