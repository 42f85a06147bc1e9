//! Oracle Database.

use super::{quote_with, Dialect, DialectKind, IdentityRetrieval};
use crate::mapping::{ColumnDescriptor, TableDescriptor};

/// Oracle dialect.
///
/// Unquoted Oracle identifiers are stored upper-cased, so quoted identifiers
/// are upper-cased too; that keeps `"ORDER"` and an unquoted `Name` column
/// addressable the same way.
///
/// Generated statements bind `:p_<Field>`; a reserved word such as `:Order`
/// is not a legal bind variable name. Caller-written predicates keep their
/// own names.
///
/// Tables with a mapped sequence take their key from `NEXTVAL` before the
/// insert; otherwise the key comes back through `RETURNING ... INTO`, which
/// the driver adapter surfaces as a one-row result.
#[derive(Debug, Clone, Copy, Default)]
pub struct Oracle;

impl Dialect for Oracle {
    fn kind(&self) -> DialectKind {
        DialectKind::Oracle
    }

    fn quote_identifier(&self, ident: &str) -> String {
        quote_with(&ident.to_uppercase(), '"', '"')
    }

    fn parameter_marker(&self) -> char {
        ':'
    }

    fn bind_name(&self, field: &str) -> String {
        format!(":p_{field}")
    }

    fn identity_retrieval(
        &self,
        descriptor: &TableDescriptor,
        key: &ColumnDescriptor,
    ) -> IdentityRetrieval {
        match &descriptor.sequence {
            Some(sequence) => IdentityRetrieval::Sequence(format!(
                "SELECT {}.NEXTVAL FROM DUAL",
                self.quote_qualified(sequence)
            )),
            None => IdentityRetrieval::Returning(format!(
                "RETURNING {} INTO {}",
                self.quote_identifier(&key.column),
                self.bind_name(&key.field)
            )),
        }
    }
}
