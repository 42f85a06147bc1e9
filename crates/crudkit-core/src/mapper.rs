//! The CRUD mapper.
//!
//! Each operation resolves the entity's [`TableDescriptor`] through the
//! shared cache, synthesizes one or two statements and sends them through
//! the caller's connection. Nothing is retried and no driver error is
//! swallowed.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::config::MapperConfig;
use crate::dialect::{Dialect, IdentityRetrieval};
use crate::error::{Error, Result};
use crate::executor::SqlExecutor;
use crate::mapping::{DescriptorCache, Entity, Key, KeyPolicy, TableDescriptor};
use crate::row::Row;
use crate::statement::{normalize_params, SqlBuilder, Statement};
use crate::value::{FromValue, Value};

/// Lazily mapped result of [`Mapper::get_list`].
///
/// Each row is mapped to `T` when the iterator reaches it. Calling
/// `get_list` again runs the query again.
pub struct EntityIter<T> {
    rows: std::vec::IntoIter<Row>,
    descriptor: Arc<TableDescriptor>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> Iterator for EntityIter<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        Some(
            self.descriptor
                .map_row(row)
                .and_then(|row| T::from_row(&row)),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl<T: Entity> ExactSizeIterator for EntityIter<T> {}

/// Synthesizes and dispatches CRUD statements for entity types.
pub struct Mapper {
    dialect: Box<dyn Dialect>,
    cache: Arc<DescriptorCache>,
    log_statements: bool,
}

impl Mapper {
    /// Create a mapper with a private descriptor cache.
    pub fn new(config: &MapperConfig) -> Self {
        Self::with_cache(config, Arc::new(DescriptorCache::new()))
    }

    /// Create a mapper sharing an existing descriptor cache.
    pub fn with_cache(config: &MapperConfig, cache: Arc<DescriptorCache>) -> Self {
        Self {
            dialect: config.dialect.dialect(),
            cache,
            log_statements: config.log_statements,
        }
    }

    /// Create a mapper for a custom dialect implementation.
    pub fn with_dialect(dialect: Box<dyn Dialect>, cache: Arc<DescriptorCache>) -> Self {
        Self {
            dialect,
            cache,
            log_statements: false,
        }
    }

    /// The active dialect.
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// The descriptor cache.
    pub fn cache(&self) -> &Arc<DescriptorCache> {
        &self.cache
    }

    /// Resolve (and cache) the descriptor for `T`.
    pub fn descriptor<T: Entity>(&self) -> Result<Arc<TableDescriptor>> {
        self.cache.descriptor::<T>()
    }

    /// Fetch one entity by key.
    ///
    /// Fails with `NotFound` when no row matches and `AmbiguousResult` when
    /// more than one does.
    pub fn get<T, C>(&self, conn: &mut C, key: impl Into<Key>) -> Result<T>
    where
        T: Entity,
        C: SqlExecutor + ?Sized,
    {
        let descriptor = self.descriptor::<T>()?;
        let stmt = SqlBuilder::new(self.dialect(), &descriptor).select_by_key(&key.into())?;
        self.log("get", &descriptor.table, &stmt);

        let mut rows = conn.query(&stmt)?;
        match rows.len() {
            0 => Err(Error::NotFound {
                table: descriptor.table.clone(),
            }),
            1 => {
                let row = descriptor.map_row(rows.remove(0))?;
                T::from_row(&row)
            }
            count => Err(Error::AmbiguousResult {
                table: descriptor.table.clone(),
                count,
            }),
        }
    }

    /// Fetch every entity matching `predicate` (all rows when `None`).
    ///
    /// `predicate` is a WHERE clause body, or a complete SELECT statement.
    /// Row order is whatever the database returns.
    pub fn get_list<T, C>(
        &self,
        conn: &mut C,
        predicate: Option<&str>,
        params: &[(&str, Value)],
    ) -> Result<EntityIter<T>>
    where
        T: Entity,
        C: SqlExecutor + ?Sized,
    {
        let descriptor = self.descriptor::<T>()?;
        let stmt = SqlBuilder::new(self.dialect(), &descriptor).select_where(predicate, params);
        self.log("get_list", &descriptor.table, &stmt);

        let rows = conn.query(&stmt)?;
        Ok(EntityIter {
            rows: rows.into_iter(),
            descriptor,
            _marker: PhantomData,
        })
    }

    /// Fetch the first entity matching `predicate`, if any.
    pub fn get_first<T, C>(
        &self,
        conn: &mut C,
        predicate: Option<&str>,
        params: &[(&str, Value)],
    ) -> Result<Option<T>>
    where
        T: Entity,
        C: SqlExecutor + ?Sized,
    {
        self.get_list(conn, predicate, params)?.next().transpose()
    }

    /// Count rows matching `predicate` (all rows when `None`).
    pub fn count<T, C>(
        &self,
        conn: &mut C,
        predicate: Option<&str>,
        params: &[(&str, Value)],
    ) -> Result<i64>
    where
        T: Entity,
        C: SqlExecutor + ?Sized,
    {
        let descriptor = self.descriptor::<T>()?;
        let stmt = SqlBuilder::new(self.dialect(), &descriptor).count_where(predicate, params);
        self.log("count", &descriptor.table, &stmt);

        let rows = conn.query(&stmt)?;
        match rows.first() {
            Some(row) => row.get_index(0),
            None => Ok(0),
        }
    }

    /// Run arbitrary SQL and return untyped rows.
    pub fn query_rows<C>(
        &self,
        conn: &mut C,
        sql: &str,
        params: &[(&str, Value)],
    ) -> Result<Vec<Row>>
    where
        C: SqlExecutor + ?Sized,
    {
        let stmt = Statement::with_params(sql, normalize_params(self.dialect(), params));
        self.log("query", "-", &stmt);
        conn.query(&stmt)
    }

    /// Insert an entity.
    ///
    /// For identity keys the generated key is written back onto `entity` and
    /// returned. Assigned and composite keys are inserted as supplied and
    /// `None` is returned.
    ///
    /// A sequence value is converted to the key type before the INSERT is
    /// sent. Other providers only report the key after the row exists; if
    /// that key cannot be converted or stored on `entity`, the error is
    /// [`Error::GeneratedKeyNotStored`] carrying the raw key, and `entity` is
    /// left unchanged.
    pub fn insert<T, C>(&self, conn: &mut C, entity: &mut T) -> Result<Option<Value>>
    where
        T: Entity,
        C: SqlExecutor + ?Sized,
    {
        let descriptor = self.descriptor::<T>()?;
        let builder = SqlBuilder::new(self.dialect(), &descriptor);
        let values = entity.to_values();
        let table = descriptor.table.as_str();

        if descriptor.key_policy != KeyPolicy::Identity {
            let stmt = builder.insert(&values, None)?;
            self.log("insert", table, &stmt);
            conn.execute(&stmt)?;
            return Ok(None);
        }

        let key_column = descriptor
            .identity_column()
            .ok_or_else(|| Error::mapping(&descriptor.entity, "identity column missing"))?;

        let generated = match self.dialect.identity_retrieval(&descriptor, key_column) {
            IdentityRetrieval::Sequence(sql) => {
                let next = Statement::new(sql);
                self.log("insert", table, &next);
                let key = first_value(conn.query(&next)?, table)?.coerce(key_column.scalar)?;

                let stmt = builder.insert(&values, Some(&key))?;
                self.log("insert", table, &stmt);
                conn.execute(&stmt)?;
                key
            }
            IdentityRetrieval::Batched(sql) => {
                let mut stmt = builder.insert(&values, None)?;
                stmt.sql = format!("{}; {}", stmt.sql, sql);
                self.log("insert", table, &stmt);
                first_value(conn.query(&stmt)?, table)?
            }
            IdentityRetrieval::FollowUp(sql) => {
                let stmt = builder.insert(&values, None)?;
                self.log("insert", table, &stmt);
                conn.execute(&stmt)?;

                let follow_up = Statement::new(sql);
                self.log("insert", table, &follow_up);
                first_value(conn.query(&follow_up)?, table)?
            }
            IdentityRetrieval::Returning(clause) => {
                let mut stmt = builder.insert(&values, None)?;
                stmt.sql = format!("{} {}", stmt.sql, clause);
                self.log("insert", table, &stmt);
                first_value(conn.query(&stmt)?, table)?
            }
        };

        // The row exists from here on; any failure must report its key.
        let stored = generated.clone().coerce(key_column.scalar).and_then(|key| {
            entity.set_field(&key_column.field, key.clone())?;
            Ok(key)
        });
        stored.map(Some).map_err(|source| {
            warn!(table, key = ?generated, error = %source, "Generated key not stored");
            Error::GeneratedKeyNotStored {
                table: table.to_string(),
                key: generated,
                source: Box::new(source),
            }
        })
    }

    /// Update an entity's non-key columns by key.
    ///
    /// Returns the affected row count; 0 when no row has the key. A table
    /// whose columns are all key or computed columns has nothing to update:
    /// no statement is sent and 0 is returned.
    pub fn update<T, C>(&self, conn: &mut C, entity: &T) -> Result<u64>
    where
        T: Entity,
        C: SqlExecutor + ?Sized,
    {
        let descriptor = self.descriptor::<T>()?;
        if descriptor.updatable_columns().next().is_none() {
            trace!(table = %descriptor.table, "No updatable columns, skipping update");
            return Ok(0);
        }
        let stmt = SqlBuilder::new(self.dialect(), &descriptor).update(&entity.to_values())?;
        self.log("update", &descriptor.table, &stmt);
        conn.execute(&stmt)
    }

    /// Delete an entity by its key.
    ///
    /// Returns the affected row count; 0 when no row has the key.
    pub fn delete<T, C>(&self, conn: &mut C, entity: &T) -> Result<u64>
    where
        T: Entity,
        C: SqlExecutor + ?Sized,
    {
        let descriptor = self.descriptor::<T>()?;
        let builder = SqlBuilder::new(self.dialect(), &descriptor);
        let key = builder.key_of(&entity.to_values())?;
        let stmt = builder.delete_by_key(&key)?;
        self.log("delete", &descriptor.table, &stmt);
        conn.execute(&stmt)
    }

    /// Delete a row of `T`'s table by key.
    pub fn delete_by_key<T, C>(&self, conn: &mut C, key: impl Into<Key>) -> Result<u64>
    where
        T: Entity,
        C: SqlExecutor + ?Sized,
    {
        let descriptor = self.descriptor::<T>()?;
        let stmt = SqlBuilder::new(self.dialect(), &descriptor).delete_by_key(&key.into())?;
        self.log("delete", &descriptor.table, &stmt);
        conn.execute(&stmt)
    }

    fn log(&self, operation: &'static str, table: &str, stmt: &Statement) {
        if self.log_statements {
            debug!(
                operation,
                table,
                sql = %stmt.sql,
                params = stmt.params.len(),
                "Dispatching statement"
            );
        } else {
            trace!(operation, table, "Dispatching statement");
        }
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new(&MapperConfig::default())
    }
}

/// First column of the first row; missing or null means no key came back.
fn first_value(rows: Vec<Row>, table: &str) -> Result<Value> {
    let value = rows
        .into_iter()
        .next()
        .and_then(|row| row.into_parts().1.into_iter().next())
        .filter(|v| !v.is_null());
    value.ok_or_else(|| Error::MissingGeneratedKey {
        table: table.to_string(),
    })
}

/// Read a typed scalar from a single-row, single-column result.
pub fn scalar<T: FromValue>(rows: &[Row]) -> Result<Option<T>> {
    rows.first().map(|row| row.get_index(0)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectKind;
    use crate::executor::RecordingExecutor;
    use crate::mapping::{EntityMapping, FieldMapping, ScalarType};
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq)]
    struct User {
        id: i32,
        name: String,
        age: i32,
    }

    impl Entity for User {
        fn mapping() -> EntityMapping {
            EntityMapping::new("User")
                .table("Users")
                .field(FieldMapping::new("Id", ScalarType::Int32))
                .field(FieldMapping::new("Name", ScalarType::String))
                .field(FieldMapping::new("Age", ScalarType::Int32))
        }

        fn to_values(&self) -> Vec<(&'static str, Value)> {
            vec![
                ("Id", self.id.into()),
                ("Name", self.name.clone().into()),
                ("Age", self.age.into()),
            ]
        }

        fn from_row(row: &Row) -> Result<Self> {
            Ok(Self {
                id: row.get("Id")?,
                name: row.get("Name")?,
                age: row.get("Age")?,
            })
        }

        fn set_field(&mut self, field: &str, value: Value) -> Result<()> {
            match field {
                "Id" => self.id = i32::from_value(value)?,
                other => return Err(Error::mapping("User", format!("cannot set {other}"))),
            }
            Ok(())
        }
    }

    fn alice() -> User {
        User {
            id: 0,
            name: "Alice".into(),
            age: 30,
        }
    }

    fn mapper(kind: DialectKind) -> Mapper {
        Mapper::new(&MapperConfig::new(kind))
    }

    #[test]
    fn test_sqlserver_insert_batches_scope_identity() {
        let mut exec = RecordingExecutor::new();
        exec.push_scalar("Id", Value::Decimal("17".into()));

        let mut user = alice();
        let key = mapper(DialectKind::SqlServer)
            .insert(&mut exec, &mut user)
            .unwrap();

        assert_eq!(key, Some(Value::Int32(17)));
        assert_eq!(user.id, 17);
        assert_eq!(
            exec.sql(),
            vec![
                "INSERT INTO [Users] ([Name], [Age]) VALUES (@Name, @Age); \
                 SELECT CAST(SCOPE_IDENTITY() AS BIGINT) AS [Id]"
            ]
        );
    }

    #[test]
    fn test_mysql_insert_follows_up_on_same_connection() {
        let mut exec = RecordingExecutor::new();
        exec.push_affected(1).push_scalar("LAST_INSERT_ID()", Value::Int64(5));

        let mut user = alice();
        mapper(DialectKind::MySql).insert(&mut exec, &mut user).unwrap();

        assert_eq!(user.id, 5);
        assert_eq!(
            exec.sql(),
            vec![
                "INSERT INTO `Users` (`Name`, `Age`) VALUES (@Name, @Age)",
                "SELECT LAST_INSERT_ID()",
            ]
        );
    }

    #[test]
    fn test_oracle_insert_returning() {
        let mut exec = RecordingExecutor::new();
        exec.push_scalar("ID", Value::Float64(8.0));

        let mut user = alice();
        mapper(DialectKind::Oracle).insert(&mut exec, &mut user).unwrap();

        assert_eq!(user.id, 8);
        assert_eq!(
            exec.sql(),
            vec![
                "INSERT INTO \"USERS\" (\"NAME\", \"AGE\") VALUES (:p_Name, :p_Age) \
                 RETURNING \"ID\" INTO :p_Id"
            ]
        );
    }

    #[test]
    fn test_missing_generated_key() {
        let mut exec = RecordingExecutor::new();
        exec.push_affected(1).push_scalar("id", Value::Null);

        let err = mapper(DialectKind::SqlCe)
            .insert(&mut exec, &mut alice())
            .unwrap_err();
        assert!(matches!(err, Error::MissingGeneratedKey { .. }));
    }

    #[test]
    fn test_get_not_found_and_ambiguous() {
        let m = mapper(DialectKind::SqlServer);
        let mut exec = RecordingExecutor::new();
        let err = m.get::<User, _>(&mut exec, 1i32).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));

        let row = || {
            Row::from_pairs([
                ("Id", Value::Int64(1)),
                ("Name", Value::from("a")),
                ("Age", Value::Int64(2)),
            ])
        };
        exec.push_rows(vec![row(), row()]);
        let err = m.get::<User, _>(&mut exec, 1i32).unwrap_err();
        assert!(matches!(err, Error::AmbiguousResult { count: 2, .. }));
    }

    #[test]
    fn test_get_list_maps_lazily() {
        let m = mapper(DialectKind::Oracle);
        let mut exec = RecordingExecutor::new();
        exec.push_rows(vec![
            Row::from_pairs([
                ("ID", Value::Decimal("1".into())),
                ("NAME", Value::from("a")),
                ("AGE", Value::Decimal("20".into())),
            ]),
            Row::from_pairs([
                ("ID", Value::Decimal("2".into())),
                ("NAME", Value::Null),
                ("AGE", Value::Decimal("21".into())),
            ]),
        ]);

        let mut users = m.get_list::<User, _>(&mut exec, None, &[]).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users.next().unwrap().unwrap().age, 20);
        // Null into a non-optional field fails only when that row is reached.
        assert!(users.next().unwrap().is_err());
        assert!(users.next().is_none());
    }

    #[test]
    fn test_update_and_delete_statements() {
        let m = mapper(DialectKind::Sqlite);
        let mut exec = RecordingExecutor::new();
        exec.push_affected(0).push_affected(1);

        let user = User {
            id: 3,
            ..alice()
        };
        assert_eq!(m.update(&mut exec, &user).unwrap(), 0);
        assert_eq!(m.delete(&mut exec, &user).unwrap(), 1);
        assert_eq!(
            exec.sql(),
            vec![
                "UPDATE [Users] SET [Name] = @Name, [Age] = @Age WHERE [Id] = @Id",
                "DELETE FROM [Users] WHERE [Id] = @Id",
            ]
        );
        assert_eq!(exec.statements()[1].param("@Id"), Some(&Value::Int32(3)));
    }

    #[test]
    fn test_count_and_query_rows() {
        let m = mapper(DialectKind::Oracle);
        let mut exec = RecordingExecutor::new();
        exec.push_scalar("COUNT(*)", Value::Decimal("4".into()));
        assert_eq!(m.count::<User, _>(&mut exec, None, &[]).unwrap(), 4);

        exec.push_scalar("X", Value::Int64(1));
        let rows = m
            .query_rows(&mut exec, "SELECT 1 X FROM DUAL WHERE 1 = :One", &[("One", Value::Int32(1))])
            .unwrap();
        assert_eq!(scalar::<i64>(&rows).unwrap(), Some(1));
        assert_eq!(exec.statements()[1].params[0].0, ":One");
    }

    struct PostTag {
        post_id: i32,
        tag_id: i32,
    }

    impl Entity for PostTag {
        fn mapping() -> EntityMapping {
            EntityMapping::new("PostTag")
                .table("PostTags")
                .field(FieldMapping::new("PostId", ScalarType::Int32).assigned_key())
                .field(FieldMapping::new("TagId", ScalarType::Int32).assigned_key())
        }

        fn to_values(&self) -> Vec<(&'static str, Value)> {
            vec![("PostId", self.post_id.into()), ("TagId", self.tag_id.into())]
        }

        fn from_row(row: &Row) -> Result<Self> {
            Ok(Self {
                post_id: row.get("PostId")?,
                tag_id: row.get("TagId")?,
            })
        }

        fn set_field(&mut self, field: &str, _value: Value) -> Result<()> {
            Err(Error::mapping("PostTag", format!("cannot set {field}")))
        }
    }

    #[test]
    fn test_update_all_key_table_is_noop() {
        let m = mapper(DialectKind::SqlServer);
        let mut exec = RecordingExecutor::new();
        exec.push_affected(1);

        let link = PostTag {
            post_id: 1,
            tag_id: 2,
        };
        assert_eq!(m.update(&mut exec, &link).unwrap(), 0);
        assert!(exec.statements().is_empty());

        assert_eq!(m.delete(&mut exec, &link).unwrap(), 1);
        assert_eq!(
            exec.sql(),
            vec!["DELETE FROM [PostTags] WHERE [PostId] = @PostId AND [TagId] = @TagId"]
        );
    }

    #[test]
    fn test_shared_cache_across_mappers() {
        let cache = Arc::new(DescriptorCache::new());
        let a = Mapper::with_cache(&MapperConfig::new(DialectKind::MySql), Arc::clone(&cache));
        let b = Mapper::with_cache(&MapperConfig::new(DialectKind::Oracle), Arc::clone(&cache));

        a.descriptor::<User>().unwrap();
        b.descriptor::<User>().unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().misses(), 1);
    }
}
