//! Scripted executor for providers without a bundled driver.

use std::collections::VecDeque;

use super::SqlExecutor;
use crate::error::{Error, Result};
use crate::row::Row;
use crate::statement::Statement;
use crate::value::Value;

/// A response handed out for the next statement.
#[derive(Debug)]
pub enum ScriptedResponse {
    /// Affected row count for `execute`.
    Affected(u64),
    /// Result rows for `query`.
    Rows(Vec<Row>),
    /// Fail the statement.
    Fail(Error),
}

/// Records every statement it receives and answers from a script.
///
/// With an empty script, `execute` reports 0 rows and `query` returns no
/// rows. A response of the wrong shape for the call is treated the same way.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    statements: Vec<Statement>,
    script: VecDeque<ScriptedResponse>,
}

impl RecordingExecutor {
    /// Create an executor with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an affected row count.
    pub fn push_affected(&mut self, count: u64) -> &mut Self {
        self.script.push_back(ScriptedResponse::Affected(count));
        self
    }

    /// Queue result rows.
    pub fn push_rows(&mut self, rows: Vec<Row>) -> &mut Self {
        self.script.push_back(ScriptedResponse::Rows(rows));
        self
    }

    /// Queue a single-value result, as returned by key retrieval queries.
    pub fn push_scalar(&mut self, column: &str, value: Value) -> &mut Self {
        self.push_rows(vec![Row::from_pairs([(column, value)])])
    }

    /// Queue a failure.
    pub fn push_error(&mut self, error: Error) -> &mut Self {
        self.script.push_back(ScriptedResponse::Fail(error));
        self
    }

    /// Statements received so far.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// SQL text of the statements received so far.
    pub fn sql(&self) -> Vec<&str> {
        self.statements.iter().map(|s| s.sql.as_str()).collect()
    }

    /// Forget recorded statements.
    pub fn clear(&mut self) {
        self.statements.clear();
    }

    fn next(&mut self, statement: &Statement) -> Option<ScriptedResponse> {
        self.statements.push(statement.clone());
        self.script.pop_front()
    }
}

impl SqlExecutor for RecordingExecutor {
    fn execute(&mut self, statement: &Statement) -> Result<u64> {
        match self.next(statement) {
            Some(ScriptedResponse::Affected(count)) => Ok(count),
            Some(ScriptedResponse::Fail(err)) => Err(err),
            _ => Ok(0),
        }
    }

    fn query(&mut self, statement: &Statement) -> Result<Vec<Row>> {
        match self.next(statement) {
            Some(ScriptedResponse::Rows(rows)) => Ok(rows),
            Some(ScriptedResponse::Fail(err)) => Err(err),
            _ => Ok(Vec::new()),
        }
    }
}
