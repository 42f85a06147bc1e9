//! Subcommand implementations.

use std::path::Path;

use crudkit_bench::fixtures::{
    Car, GenericType, Membership, NullableDate, ObjectX, ObjectY, ObjectZ, Person, Post,
    ResultRow, Stuff, User,
};
use crudkit_bench::{run_suite, schema_script, Fixture, SuiteReport, TestContext};
use crudkit_core::{
    DialectKind, Entity, IdentityRetrieval, Mapper, MapperConfig, RecordingExecutor,
    SqlBuilder, Statement, Value,
};
use tracing::info;

use crate::error::CliError;

/// Fixture DDL for one provider, one statement per line.
pub fn ddl(kind: DialectKind) -> String {
    schema_script(kind)
        .into_iter()
        .map(|sql| format!("{sql};"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The statements the mapper generates for each CRUD operation on `fixture`.
pub fn sql(
    kind: DialectKind,
    fixture: Fixture,
) -> Result<Vec<(&'static str, Statement)>, CliError> {
    let mapper = Mapper::new(&MapperConfig::new(kind));
    match fixture {
        Fixture::Stuff => crud_statements::<Stuff>(&mapper),
        Fixture::Person => crud_statements::<Person>(&mapper),
        Fixture::User => crud_statements::<User>(&mapper),
        Fixture::Car => crud_statements::<Car>(&mapper),
        Fixture::ResultRow => crud_statements::<ResultRow>(&mapper),
        Fixture::ObjectX => crud_statements::<ObjectX>(&mapper),
        Fixture::ObjectY => crud_statements::<ObjectY>(&mapper),
        Fixture::ObjectZ => crud_statements::<ObjectZ>(&mapper),
        Fixture::GenericType => crud_statements::<GenericType>(&mapper),
        Fixture::NullableDate => crud_statements::<NullableDate>(&mapper),
        Fixture::Membership => crud_statements::<Membership>(&mapper),
        Fixture::Post => crud_statements::<Post>(&mapper),
    }
}

fn crud_statements<T: Entity + Default>(
    mapper: &Mapper,
) -> Result<Vec<(&'static str, Statement)>, CliError> {
    let descriptor = mapper.descriptor::<T>()?;
    let mut entity = T::default();

    // Insert runs through a scripted connection so the identity read-back
    // statements show up in order.
    let mut exec = RecordingExecutor::new();
    let generated = Value::Int64(1);
    match descriptor.identity_column() {
        Some(column) => match mapper.dialect().identity_retrieval(&descriptor, column) {
            IdentityRetrieval::FollowUp(_) => {
                exec.push_affected(1).push_scalar(&column.column, generated);
            }
            IdentityRetrieval::Sequence(_) => {
                exec.push_scalar(&column.column, generated).push_affected(1);
            }
            IdentityRetrieval::Batched(_) | IdentityRetrieval::Returning(_) => {
                exec.push_scalar(&column.column, generated);
            }
        },
        None => {
            exec.push_affected(1);
        }
    }
    mapper.insert(&mut exec, &mut entity)?;

    let mut statements: Vec<(&'static str, Statement)> = exec
        .statements()
        .iter()
        .cloned()
        .map(|stmt| ("insert", stmt))
        .collect();

    let builder = SqlBuilder::new(mapper.dialect(), &descriptor);
    let values = entity.to_values();
    let key = builder.key_of(&values)?;
    statements.push(("get", builder.select_by_key(&key)?));
    statements.push(("get_list", builder.select_where(None, &[])));
    statements.push(("count", builder.count_where(None, &[])));
    if descriptor.updatable_columns().next().is_some() {
        statements.push(("update", builder.update(&values)?));
    }
    statements.push(("delete", builder.delete_by_key(&key)?));

    Ok(statements)
}

/// Run the CRUD suite against SQLite, in memory or at `db`.
pub fn suite(db: Option<&Path>) -> Result<SuiteReport, CliError> {
    let mut ctx = match db {
        Some(path) => TestContext::open(path)?,
        None => TestContext::new()?,
    };
    let report = run_suite(&mut ctx);
    info!(
        passed = report.passed(),
        failed = report.failed(),
        "Suite finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_of(kind: DialectKind, fixture: Fixture) -> Vec<(&'static str, String)> {
        sql(kind, fixture)
            .unwrap()
            .into_iter()
            .map(|(op, stmt)| (op, stmt.sql))
            .collect()
    }

    #[test]
    fn test_ddl_lines() {
        let script = ddl(DialectKind::Sqlite);
        assert_eq!(script.lines().count(), Fixture::ALL.len() * 2);
        assert!(script.lines().all(|l| l.ends_with(';')));
    }

    #[test]
    fn test_sql_identity_follow_up() {
        let stmts = sql_of(DialectKind::MySql, Fixture::User);
        assert_eq!(stmts[0].0, "insert");
        assert_eq!(stmts[1], ("insert", "SELECT LAST_INSERT_ID()".to_string()));
        assert_eq!(
            stmts.iter().map(|(op, _)| *op).collect::<Vec<_>>(),
            vec!["insert", "insert", "get", "get_list", "count", "update", "delete"]
        );
    }

    #[test]
    fn test_sql_oracle_returning() {
        let stmts = sql_of(DialectKind::Oracle, Fixture::ResultRow);
        assert_eq!(
            stmts[0].1,
            "INSERT INTO \"RESULTS\" (\"NAME\", \"ORDER\") VALUES (:p_Name, :p_Order) \
             RETURNING \"ID\" INTO :p_Id"
        );
    }

    #[test]
    fn test_sql_oracle_reserved_column_binds() {
        for (op, sql) in sql_of(DialectKind::Oracle, Fixture::ResultRow) {
            assert!(!sql.contains(":Order"), "{op}: {sql}");
        }
    }

    #[test]
    fn test_sql_composite() {
        let stmts = sql_of(DialectKind::SqlServer, Fixture::Membership);
        let delete = stmts.iter().find(|(op, _)| *op == "delete").unwrap();
        assert_eq!(
            delete.1,
            "DELETE FROM [Memberships] WHERE [GroupId] = @GroupId AND [UserId] = @UserId"
        );
    }

    #[test]
    fn test_suite_in_memory() {
        let report = suite(None).unwrap();
        assert!(report.is_success());
    }
}
