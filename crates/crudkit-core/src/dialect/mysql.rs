//! MySQL / MariaDB.

use super::{quote_with, Dialect, DialectKind, IdentityRetrieval};
use crate::mapping::{ColumnDescriptor, TableDescriptor};

/// MySQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn kind(&self) -> DialectKind {
        DialectKind::MySql
    }

    fn quote_identifier(&self, ident: &str) -> String {
        quote_with(ident, '`', '`')
    }

    fn identity_retrieval(
        &self,
        _descriptor: &TableDescriptor,
        _key: &ColumnDescriptor,
    ) -> IdentityRetrieval {
        // LAST_INSERT_ID() is per connection.
        IdentityRetrieval::FollowUp("SELECT LAST_INSERT_ID()".into())
    }
}
