//! SQL execution seam.
//!
//! The mapper never talks to a driver directly. It sends [`Statement`]s
//! through [`SqlExecutor`], which a driver adapter implements. Methods take
//! `&mut self`: one connection handle serves one operation at a time.

mod recording;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use recording::{RecordingExecutor, ScriptedResponse};

use crate::error::Result;
use crate::row::Row;
use crate::statement::Statement;

/// A connection that can run parameterized statements.
pub trait SqlExecutor {
    /// Run a statement that returns no rows; returns the affected row count.
    fn execute(&mut self, statement: &Statement) -> Result<u64>;

    /// Run a statement that returns rows.
    fn query(&mut self, statement: &Statement) -> Result<Vec<Row>>;
}

impl<E: SqlExecutor + ?Sized> SqlExecutor for &mut E {
    fn execute(&mut self, statement: &Statement) -> Result<u64> {
        (**self).execute(statement)
    }

    fn query(&mut self, statement: &Statement) -> Result<Vec<Row>> {
        (**self).query(statement)
    }
}
