//! SQLite adapter over `rusqlite`.

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{Connection, ErrorCode};

use super::SqlExecutor;
use crate::error::{Error, Result};
use crate::row::Row;
use crate::statement::Statement;
use crate::value::{Value, DATETIME_TEXT_FORMAT};

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Int32(i) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*i))),
            Value::Int64(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Float64(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Decimal(s) | Value::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            Value::DateTime(dt) => {
                ToSqlOutput::Owned(SqlValue::Text(dt.format(DATETIME_TEXT_FORMAT).to_string()))
            }
        })
    }
}

/// TEXT that is not valid UTF-8 is a conversion error, never replaced.
fn value_from_ref(value: ValueRef<'_>) -> Result<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int64(i),
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(t) => std::str::from_utf8(t)
            .map(|s| Value::String(s.to_string()))
            .map_err(|_| Error::conversion("string", "invalid utf-8"))?,
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    })
}

/// Sort a driver error into the mapper's taxonomy without altering it.
fn classify(err: rusqlite::Error) -> Error {
    let code = match &err {
        rusqlite::Error::SqliteFailure(failure, _) => Some(failure.code),
        _ => None,
    };
    match code {
        Some(ErrorCode::ConstraintViolation) => Error::ConstraintViolation(Box::new(err)),
        Some(
            ErrorCode::CannotOpen
            | ErrorCode::NotADatabase
            | ErrorCode::PermissionDenied
            | ErrorCode::SystemIoFailure,
        ) => Error::Connection(Box::new(err)),
        _ => Error::Driver(Box::new(err)),
    }
}

fn named_params(statement: &Statement) -> Vec<(&str, &dyn ToSql)> {
    statement
        .params
        .iter()
        .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
        .collect()
}

impl SqlExecutor for Connection {
    fn execute(&mut self, statement: &Statement) -> Result<u64> {
        let mut stmt = self.prepare_cached(&statement.sql).map_err(classify)?;
        let params = named_params(statement);
        let affected = stmt.execute(params.as_slice()).map_err(classify)?;
        Ok(affected as u64)
    }

    fn query(&mut self, statement: &Statement) -> Result<Vec<Row>> {
        let mut stmt = self.prepare_cached(&statement.sql).map_err(classify)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();
        let columns: std::sync::Arc<[String]> = columns.into();

        let params = named_params(statement);
        let mut rows = stmt.query(params.as_slice()).map_err(classify)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(classify)? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(value_from_ref(row.get_ref(i).map_err(classify)?)?);
            }
            out.push(Row::new(std::sync::Arc::clone(&columns), values));
        }
        Ok(out)
    }
}
