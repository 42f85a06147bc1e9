//! Statement synthesis.
//!
//! [`SqlBuilder`] turns a [`TableDescriptor`] plus entity values into
//! parameterized SQL for one dialect. Identifiers are always quoted;
//! parameters are named by [`Dialect::bind_name`] after the entity field
//! they carry.

use serde::Serialize;

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::mapping::{ColumnDescriptor, Key, TableDescriptor};
use crate::value::Value;

/// SQL text plus named parameter bindings.
///
/// Parameter names include the dialect's marker (`@Name`, `:Name`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    /// SQL text.
    pub sql: String,
    /// Bound parameters, in placeholder order.
    pub params: Vec<(String, Value)>,
}

impl Statement {
    /// Create a statement without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Create a statement with parameters.
    pub fn with_params(sql: impl Into<String>, params: Vec<(String, Value)>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Look up a bound parameter by name.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }
}

/// Builds statements for one table in one dialect.
pub struct SqlBuilder<'a> {
    dialect: &'a dyn Dialect,
    descriptor: &'a TableDescriptor,
}

impl<'a> SqlBuilder<'a> {
    /// Create a builder.
    pub fn new(dialect: &'a dyn Dialect, descriptor: &'a TableDescriptor) -> Self {
        Self {
            dialect,
            descriptor,
        }
    }

    /// Quoted table name.
    pub fn table(&self) -> String {
        self.dialect.quote_qualified(&self.descriptor.table)
    }

    /// Quoted, comma-separated list of every mapped column.
    pub fn column_list(&self) -> String {
        self.descriptor
            .columns
            .iter()
            .map(|c| self.dialect.quote_identifier(&c.column))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `SELECT <columns> FROM <table> WHERE <key> = <values>`.
    pub fn select_by_key(&self, key: &Key) -> Result<Statement> {
        let (predicate, params) = self.key_predicate(key.values())?;
        Ok(Statement::with_params(
            format!(
                "SELECT {} FROM {} WHERE {}",
                self.column_list(),
                self.table(),
                predicate
            ),
            params,
        ))
    }

    /// `SELECT <columns> FROM <table> [WHERE <predicate>]`.
    ///
    /// A predicate that is already a complete `SELECT` statement is used
    /// verbatim. Parameter names without a marker get the dialect's marker.
    pub fn select_where(&self, predicate: Option<&str>, params: &[(&str, Value)]) -> Statement {
        let params = self.normalize_params(params);
        match predicate.map(str::trim).filter(|p| !p.is_empty()) {
            Some(sql) if is_full_select(sql) => Statement::with_params(sql, params),
            Some(predicate) => Statement::with_params(
                format!(
                    "SELECT {} FROM {} WHERE {}",
                    self.column_list(),
                    self.table(),
                    strip_where(predicate)
                ),
                params,
            ),
            None => Statement::with_params(
                format!("SELECT {} FROM {}", self.column_list(), self.table()),
                params,
            ),
        }
    }

    /// `SELECT COUNT(*) FROM <table> [WHERE <predicate>]`.
    pub fn count_where(&self, predicate: Option<&str>, params: &[(&str, Value)]) -> Statement {
        let params = self.normalize_params(params);
        let sql = match predicate.map(str::trim).filter(|p| !p.is_empty()) {
            Some(predicate) => format!(
                "SELECT COUNT(*) FROM {} WHERE {}",
                self.table(),
                strip_where(predicate)
            ),
            None => format!("SELECT COUNT(*) FROM {}", self.table()),
        };
        Statement::with_params(sql, params)
    }

    /// `INSERT INTO <table> (<columns>) VALUES (<params>)`.
    ///
    /// Generated and computed columns are left out. When `explicit_key` is
    /// given (a sequence value read ahead of time) the identity column is
    /// written with it.
    pub fn insert(
        &self,
        values: &[(&'static str, Value)],
        explicit_key: Option<&Value>,
    ) -> Result<Statement> {
        let mut columns = Vec::new();
        let mut placeholders = Vec::new();
        let mut params = Vec::new();

        for column in &self.descriptor.columns {
            let value = if column.is_insertable() {
                self.value_for(column, values)?
            } else if let (true, Some(key)) = (column.generated, explicit_key) {
                key.clone()
            } else {
                continue;
            };
            let placeholder = self.dialect.bind_name(&column.field);
            columns.push(self.dialect.quote_identifier(&column.column));
            placeholders.push(placeholder.clone());
            params.push((placeholder, value));
        }

        if columns.is_empty() {
            return Err(Error::mapping(
                &self.descriptor.entity,
                "no insertable columns",
            ));
        }

        Ok(Statement::with_params(
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table(),
                columns.join(", "),
                placeholders.join(", ")
            ),
            params,
        ))
    }

    /// `UPDATE <table> SET <non-key columns> WHERE <key> = <values>`.
    pub fn update(&self, values: &[(&'static str, Value)]) -> Result<Statement> {
        let mut assignments = Vec::new();
        let mut params = Vec::new();

        for column in self.descriptor.updatable_columns() {
            let placeholder = self.dialect.bind_name(&column.field);
            assignments.push(format!(
                "{} = {}",
                self.dialect.quote_identifier(&column.column),
                placeholder
            ));
            params.push((placeholder, self.value_for(column, values)?));
        }

        if assignments.is_empty() {
            return Err(Error::mapping(
                &self.descriptor.entity,
                "no updatable columns",
            ));
        }

        let key = self.key_of(values)?;
        let (predicate, key_params) = self.key_predicate(key.values())?;
        params.extend(key_params);

        Ok(Statement::with_params(
            format!(
                "UPDATE {} SET {} WHERE {}",
                self.table(),
                assignments.join(", "),
                predicate
            ),
            params,
        ))
    }

    /// `DELETE FROM <table> WHERE <key> = <values>`.
    pub fn delete_by_key(&self, key: &Key) -> Result<Statement> {
        let (predicate, params) = self.key_predicate(key.values())?;
        Ok(Statement::with_params(
            format!("DELETE FROM {} WHERE {}", self.table(), predicate),
            params,
        ))
    }

    /// Extract the key of an entity from its field values.
    pub fn key_of(&self, values: &[(&'static str, Value)]) -> Result<Key> {
        self.descriptor
            .key_columns()
            .map(|c| self.value_for(c, values))
            .collect::<Result<Vec<_>>>()
            .map(Key::new)
    }

    fn key_predicate(&self, key: &[Value]) -> Result<(String, Vec<(String, Value)>)> {
        let columns: Vec<&ColumnDescriptor> = self.descriptor.key_columns().collect();
        if key.len() != columns.len() {
            return Err(Error::invalid_key(
                &self.descriptor.table,
                format!("expected {} key values, got {}", columns.len(), key.len()),
            ));
        }
        if key.iter().any(Value::is_null) {
            return Err(Error::invalid_key(&self.descriptor.table, "null key value"));
        }

        let mut terms = Vec::with_capacity(columns.len());
        let mut params = Vec::with_capacity(columns.len());
        for (column, value) in columns.into_iter().zip(key) {
            let placeholder = self.dialect.bind_name(&column.field);
            terms.push(format!(
                "{} = {}",
                self.dialect.quote_identifier(&column.column),
                placeholder
            ));
            let value = value.clone().coerce(column.scalar).map_err(|_| {
                Error::invalid_key(
                    &self.descriptor.table,
                    format!(
                        "{} expects {}, got {}",
                        column.column,
                        column.scalar,
                        value.type_name()
                    ),
                )
            })?;
            params.push((placeholder, value));
        }

        Ok((terms.join(" AND "), params))
    }

    fn value_for(
        &self,
        column: &ColumnDescriptor,
        values: &[(&'static str, Value)],
    ) -> Result<Value> {
        values
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&column.field))
            .map(|(_, v)| v.clone())
            .ok_or_else(|| {
                Error::mapping(
                    &self.descriptor.entity,
                    format!("entity did not supply field {}", column.field),
                )
            })
    }

    fn normalize_params(&self, params: &[(&str, Value)]) -> Vec<(String, Value)> {
        normalize_params(self.dialect, params)
    }
}

/// Give parameter names without a marker the dialect's marker.
pub(crate) fn normalize_params(
    dialect: &dyn Dialect,
    params: &[(&str, Value)],
) -> Vec<(String, Value)> {
    params
        .iter()
        .map(|&(name, ref value)| {
            let name = if name.starts_with(['@', ':', '$', '?']) {
                name.to_string()
            } else {
                dialect.parameter(name)
            };
            (name, value.clone())
        })
        .collect()
}

/// The text after a leading `keyword` and at least one whitespace character.
fn after_keyword<'s>(sql: &'s str, keyword: &str) -> Option<&'s str> {
    let n = keyword.len();
    match (sql.get(..n), sql.get(n..)) {
        (Some(head), Some(rest))
            if head.eq_ignore_ascii_case(keyword) && rest.starts_with(char::is_whitespace) =>
        {
            Some(rest)
        }
        _ => None,
    }
}

fn is_full_select(sql: &str) -> bool {
    after_keyword(sql, "select").is_some()
}

fn strip_where(predicate: &str) -> &str {
    after_keyword(predicate, "where")
        .map(str::trim_start)
        .unwrap_or(predicate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{DialectKind, MySql, Oracle, SqlServer, Sqlite};
    use crate::mapping::{EntityMapping, FieldMapping, ScalarType};
    use pretty_assertions::assert_eq;

    fn results() -> TableDescriptor {
        TableDescriptor::build(
            &EntityMapping::new("Result")
                .table("Results")
                .field(FieldMapping::new("Id", ScalarType::Int32))
                .field(FieldMapping::new("Name", ScalarType::String))
                .field(FieldMapping::new("Order", ScalarType::Int32)),
        )
        .unwrap()
    }

    fn membership() -> TableDescriptor {
        TableDescriptor::build(
            &EntityMapping::new("Membership")
                .field(FieldMapping::new("GroupId", ScalarType::Int32).assigned_key())
                .field(FieldMapping::new("UserId", ScalarType::Int32).assigned_key())
                .field(FieldMapping::new("Role", ScalarType::String)),
        )
        .unwrap()
    }

    fn result_values() -> Vec<(&'static str, Value)> {
        vec![
            ("Id", Value::Int32(4)),
            ("Name", Value::from("Bob")),
            ("Order", Value::Int32(2)),
        ]
    }

    #[test]
    fn test_select_by_key_sqlserver() {
        let d = results();
        let stmt = SqlBuilder::new(&SqlServer, &d)
            .select_by_key(&Key::from(4i32))
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT [Id], [Name], [Order] FROM [Results] WHERE [Id] = @Id"
        );
        assert_eq!(stmt.param("@Id"), Some(&Value::Int32(4)));
    }

    #[test]
    fn test_insert_omits_identity_column() {
        let d = results();
        let stmt = SqlBuilder::new(&MySql, &d)
            .insert(&result_values(), None)
            .unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO `Results` (`Name`, `Order`) VALUES (@Name, @Order)"
        );
        assert_eq!(stmt.params.len(), 2);
    }

    #[test]
    fn test_insert_with_sequence_key() {
        let d = results();
        let stmt = SqlBuilder::new(&Oracle, &d)
            .insert(&result_values(), Some(&Value::Int32(99)))
            .unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"RESULTS\" (\"ID\", \"NAME\", \"ORDER\") VALUES (:p_Id, :p_Name, :p_Order)"
        );
        assert_eq!(stmt.param(":p_Id"), Some(&Value::Int32(99)));
    }

    #[test]
    fn test_update_composite_key() {
        let d = membership();
        let stmt = SqlBuilder::new(&Sqlite, &d)
            .update(&[
                ("GroupId", Value::Int32(1)),
                ("UserId", Value::Int32(2)),
                ("Role", Value::from("owner")),
            ])
            .unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE [Membership] SET [Role] = @Role WHERE [GroupId] = @GroupId AND [UserId] = @UserId"
        );
        assert_eq!(stmt.params.len(), 3);
    }

    #[test]
    fn test_delete_and_key_arity() {
        let d = membership();
        let builder = SqlBuilder::new(&SqlServer, &d);
        let stmt = builder.delete_by_key(&Key::from((1i32, 2i32))).unwrap();
        assert_eq!(
            stmt.sql,
            "DELETE FROM [Membership] WHERE [GroupId] = @GroupId AND [UserId] = @UserId"
        );

        let err = builder.delete_by_key(&Key::from(1i32)).unwrap_err();
        assert!(matches!(err, Error::InvalidKey { .. }));
    }

    #[test]
    fn test_key_type_mismatch() {
        let d = results();
        let err = SqlBuilder::new(&SqlServer, &d)
            .select_by_key(&Key::from("abc"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidKey { .. }));
    }

    #[test]
    fn test_select_where_forms() {
        let d = results();
        let builder = SqlBuilder::new(&Sqlite, &d);

        let all = builder.select_where(None, &[]);
        assert_eq!(all.sql, "SELECT [Id], [Name], [Order] FROM [Results]");

        let filtered = builder.select_where(Some("where Age > @Age"), &[("Age", Value::Int32(3))]);
        assert_eq!(
            filtered.sql,
            "SELECT [Id], [Name], [Order] FROM [Results] WHERE Age > @Age"
        );
        assert_eq!(filtered.param("@Age"), Some(&Value::Int32(3)));

        let raw = builder.select_where(
            Some("select * from Results where Id = @Id"),
            &[("@Id", Value::Int32(1))],
        );
        assert_eq!(raw.sql, "select * from Results where Id = @Id");
        assert_eq!(raw.params[0].0, "@Id");

        let blank = builder.select_where(Some("   "), &[]);
        assert_eq!(blank.sql, all.sql);
    }

    #[test]
    fn test_count_where() {
        let d = results();
        let stmt = SqlBuilder::new(&Oracle, &d)
            .count_where(Some("\"NAME\" = :Name"), &[("Name", Value::from("x"))]);
        assert_eq!(stmt.sql, "SELECT COUNT(*) FROM \"RESULTS\" WHERE \"NAME\" = :Name");
        assert_eq!(stmt.params[0].0, ":Name");
    }

    #[test]
    fn test_reserved_column_in_every_dialect() {
        let d = results();
        for kind in DialectKind::ALL {
            let dialect = kind.dialect();
            let stmt = SqlBuilder::new(dialect.as_ref(), &d)
                .update(&result_values())
                .unwrap();
            let quoted = dialect.quote_identifier("Order");
            assert!(stmt.sql.contains(&format!("{quoted} = ")), "{kind}: {}", stmt.sql);
        }
    }

    #[test]
    fn test_oracle_binds_never_use_reserved_names() {
        let d = results();
        let builder = SqlBuilder::new(&Oracle, &d);
        let key = Key::from(4i32);
        let statements = [
            builder.insert(&result_values(), None).unwrap(),
            builder.insert(&result_values(), Some(&Value::Int32(4))).unwrap(),
            builder.update(&result_values()).unwrap(),
            builder.select_by_key(&key).unwrap(),
            builder.delete_by_key(&key).unwrap(),
        ];
        for stmt in &statements {
            assert!(!stmt.sql.contains(":Order"), "{}", stmt.sql);
            assert!(
                stmt.params.iter().all(|(name, _)| name.starts_with(":p_")),
                "{:?}",
                stmt.params
            );
        }
        assert_eq!(
            statements[2].sql,
            "UPDATE \"RESULTS\" SET \"NAME\" = :p_Name, \"ORDER\" = :p_Order WHERE \"ID\" = :p_Id"
        );
    }

    #[test]
    fn test_missing_field_value() {
        let d = results();
        let err = SqlBuilder::new(&SqlServer, &d)
            .insert(&[("Name", Value::from("x"))], None)
            .unwrap_err();
        assert!(matches!(err, Error::Mapping { .. }));
    }

    #[test]
    fn test_full_select_detection() {
        assert!(is_full_select("SELECT * FROM x"));
        assert!(is_full_select("select\n* from x"));
        assert!(!is_full_select("selected = 1"));
        assert!(!is_full_select("Id = 1"));
    }

    #[test]
    fn test_strip_where_any_whitespace() {
        assert_eq!(strip_where("where Age > 1"), "Age > 1");
        assert_eq!(strip_where("WHERE\n Age > 1"), "Age > 1");
        assert_eq!(strip_where("where\tx = 1"), "x = 1");
        assert_eq!(strip_where("whereabouts = 1"), "whereabouts = 1");
        assert_eq!(strip_where("where"), "where");

        let d = results();
        let stmt = SqlBuilder::new(&SqlServer, &d).count_where(Some("WHERE\n[Order] > 1"), &[]);
        assert_eq!(stmt.sql, "SELECT COUNT(*) FROM [Results] WHERE [Order] > 1");
    }
}
