//! SQL Server Compact Edition.

use super::{quote_with, Dialect, DialectKind, IdentityRetrieval};
use crate::mapping::{ColumnDescriptor, TableDescriptor};

/// SQL CE dialect. No multi-statement batches and no `SCOPE_IDENTITY()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlCe;

impl Dialect for SqlCe {
    fn kind(&self) -> DialectKind {
        DialectKind::SqlCe
    }

    fn quote_identifier(&self, ident: &str) -> String {
        quote_with(ident, '[', ']')
    }

    fn identity_retrieval(
        &self,
        _descriptor: &TableDescriptor,
        _key: &ColumnDescriptor,
    ) -> IdentityRetrieval {
        IdentityRetrieval::FollowUp("SELECT @@IDENTITY".into())
    }
}
