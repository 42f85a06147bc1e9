//! Microsoft SQL Server.

use super::{quote_with, Dialect, DialectKind, IdentityRetrieval};
use crate::mapping::{ColumnDescriptor, TableDescriptor};

/// SQL Server dialect.
///
/// `SCOPE_IDENTITY()` is only reliable inside the batch that performed the
/// insert, so the key select rides along with the INSERT.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServer;

impl Dialect for SqlServer {
    fn kind(&self) -> DialectKind {
        DialectKind::SqlServer
    }

    fn quote_identifier(&self, ident: &str) -> String {
        quote_with(ident, '[', ']')
    }

    fn identity_retrieval(
        &self,
        _descriptor: &TableDescriptor,
        key: &ColumnDescriptor,
    ) -> IdentityRetrieval {
        IdentityRetrieval::Batched(format!(
            "SELECT CAST(SCOPE_IDENTITY() AS BIGINT) AS {}",
            self.quote_identifier(&key.column)
        ))
    }
}
