//! SQLite.

use super::{quote_with, Dialect, DialectKind, IdentityRetrieval};
use crate::mapping::{ColumnDescriptor, TableDescriptor};

/// SQLite dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn quote_identifier(&self, ident: &str) -> String {
        quote_with(ident, '[', ']')
    }

    fn identity_retrieval(
        &self,
        _descriptor: &TableDescriptor,
        _key: &ColumnDescriptor,
    ) -> IdentityRetrieval {
        IdentityRetrieval::FollowUp("SELECT last_insert_rowid()".into())
    }
}
