//! Provider SQL dialects.
//!
//! A [`Dialect`] decides how identifiers are quoted, how parameters are
//! spelled and how a database-generated key is read back after an insert.
//! Dialects are selected at configuration time through [`DialectKind`].

mod mysql;
mod oracle;
mod sqlce;
mod sqlite;
mod sqlserver;

pub use mysql::MySql;
pub use oracle::Oracle;
pub use sqlce::SqlCe;
pub use sqlite::Sqlite;
pub use sqlserver::SqlServer;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::mapping::{ColumnDescriptor, TableDescriptor};

/// How a generated key is obtained for an identity insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityRetrieval {
    /// Appended to the INSERT and sent as one batch; the batch yields the key.
    Batched(String),
    /// Sent as a separate query on the same connection after the INSERT.
    FollowUp(String),
    /// Queried before the INSERT; the key is then inserted explicitly.
    Sequence(String),
    /// Clause appended to the INSERT; the driver yields the key as a row.
    Returning(String),
}

/// Provider-specific SQL syntax.
pub trait Dialect: fmt::Debug + Send + Sync {
    /// Which provider this is.
    fn kind(&self) -> DialectKind;

    /// Quote a single identifier, escaping embedded quote characters.
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a possibly schema-qualified name (`schema.table`).
    fn quote_qualified(&self, name: &str) -> String {
        name.split('.')
            .map(|part| self.quote_identifier(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Character introducing a named parameter.
    fn parameter_marker(&self) -> char {
        '@'
    }

    /// Placeholder for a named parameter, as written in SQL and bound.
    fn parameter(&self, name: &str) -> String {
        format!("{}{}", self.parameter_marker(), name)
    }

    /// Placeholder the mapper binds `field` to in the statements it generates.
    ///
    /// Caller-written predicates keep using [`parameter`](Self::parameter).
    fn bind_name(&self, field: &str) -> String {
        self.parameter(field)
    }

    /// How to read back the generated key of `key` in `descriptor`'s table.
    fn identity_retrieval(
        &self,
        descriptor: &TableDescriptor,
        key: &ColumnDescriptor,
    ) -> IdentityRetrieval;
}

/// Supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    /// Microsoft SQL Server.
    SqlServer,
    /// MySQL / MariaDB.
    MySql,
    /// SQLite.
    #[default]
    Sqlite,
    /// SQL Server Compact Edition.
    SqlCe,
    /// Oracle Database.
    Oracle,
}

impl DialectKind {
    /// All supported providers.
    pub const ALL: [DialectKind; 5] = [
        DialectKind::SqlServer,
        DialectKind::MySql,
        DialectKind::Sqlite,
        DialectKind::SqlCe,
        DialectKind::Oracle,
    ];

    /// Create the dialect implementation.
    pub fn dialect(self) -> Box<dyn Dialect> {
        match self {
            DialectKind::SqlServer => Box::new(SqlServer),
            DialectKind::MySql => Box::new(MySql),
            DialectKind::Sqlite => Box::new(Sqlite),
            DialectKind::SqlCe => Box::new(SqlCe),
            DialectKind::Oracle => Box::new(Oracle),
        }
    }

    /// Configuration name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DialectKind::SqlServer => "sqlserver",
            DialectKind::MySql => "mysql",
            DialectKind::Sqlite => "sqlite",
            DialectKind::SqlCe => "sqlce",
            DialectKind::Oracle => "oracle",
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialectKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlserver" | "mssql" => Ok(DialectKind::SqlServer),
            "mysql" | "mariadb" => Ok(DialectKind::MySql),
            "sqlite" => Ok(DialectKind::Sqlite),
            "sqlce" => Ok(DialectKind::SqlCe),
            "oracle" => Ok(DialectKind::Oracle),
            other => Err(Error::Config(format!("unknown dialect '{other}'"))),
        }
    }
}

/// Wrap `ident` in `open`/`close`, doubling any embedded `close`.
pub(crate) fn quote_with(ident: &str, open: char, close: char) -> String {
    let mut out = String::with_capacity(ident.len() + 2);
    out.push(open);
    for ch in ident.chars() {
        if ch == close {
            out.push(close);
        }
        out.push(ch);
    }
    out.push(close);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{EntityMapping, FieldMapping, ScalarType};

    fn results() -> TableDescriptor {
        TableDescriptor::build(
            &EntityMapping::new("Result")
                .table("Results")
                .field(FieldMapping::new("Id", ScalarType::Int32))
                .field(FieldMapping::new("Order", ScalarType::Int32)),
        )
        .unwrap()
    }

    #[test]
    fn test_reserved_word_quoting() {
        let expected = [
            (DialectKind::SqlServer, "[Order]"),
            (DialectKind::MySql, "`Order`"),
            (DialectKind::Sqlite, "[Order]"),
            (DialectKind::SqlCe, "[Order]"),
            (DialectKind::Oracle, "\"ORDER\""),
        ];
        for (kind, quoted) in expected {
            assert_eq!(kind.dialect().quote_identifier("Order"), quoted, "{kind}");
        }
    }

    #[test]
    fn test_embedded_quotes_are_doubled() {
        assert_eq!(SqlServer.quote_identifier("a]b"), "[a]]b]");
        assert_eq!(MySql.quote_identifier("a`b"), "`a``b`");
        assert_eq!(Oracle.quote_identifier("a\"b"), "\"A\"\"B\"");
    }

    #[test]
    fn test_qualified_names() {
        assert_eq!(SqlServer.quote_qualified("dbo.Users"), "[dbo].[Users]");
        assert_eq!(
            Oracle.quote_qualified("DapperContribTests.People"),
            "\"DAPPERCONTRIBTESTS\".\"PEOPLE\""
        );
    }

    #[test]
    fn test_parameters() {
        assert_eq!(SqlServer.parameter("Name"), "@Name");
        assert_eq!(Sqlite.parameter("Name"), "@Name");
        assert_eq!(Oracle.parameter("Name"), ":Name");

        assert_eq!(SqlServer.bind_name("Order"), "@Order");
        assert_eq!(MySql.bind_name("Order"), "@Order");
        assert_eq!(Oracle.bind_name("Order"), ":p_Order");
    }

    #[test]
    fn test_identity_retrieval_per_provider() {
        let d = results();
        let key = d.identity_column().unwrap();

        assert!(matches!(
            SqlServer.identity_retrieval(&d, key),
            IdentityRetrieval::Batched(sql) if sql.contains("SCOPE_IDENTITY()")
        ));
        assert_eq!(
            MySql.identity_retrieval(&d, key),
            IdentityRetrieval::FollowUp("SELECT LAST_INSERT_ID()".into())
        );
        assert_eq!(
            Sqlite.identity_retrieval(&d, key),
            IdentityRetrieval::FollowUp("SELECT last_insert_rowid()".into())
        );
        assert_eq!(
            SqlCe.identity_retrieval(&d, key),
            IdentityRetrieval::FollowUp("SELECT @@IDENTITY".into())
        );
        assert_eq!(
            Oracle.identity_retrieval(&d, key),
            IdentityRetrieval::Returning("RETURNING \"ID\" INTO :p_Id".into())
        );
    }

    #[test]
    fn test_oracle_uses_mapped_sequence() {
        let d = TableDescriptor::build(
            &EntityMapping::new("Person")
                .table("People")
                .sequence("People_Seq")
                .field(FieldMapping::new("Id", ScalarType::Int64))
                .field(FieldMapping::new("Name", ScalarType::String)),
        )
        .unwrap();
        let key = d.identity_column().unwrap();
        assert_eq!(
            Oracle.identity_retrieval(&d, key),
            IdentityRetrieval::Sequence("SELECT \"PEOPLE_SEQ\".NEXTVAL FROM DUAL".into())
        );
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("mssql".parse::<DialectKind>().unwrap(), DialectKind::SqlServer);
        assert_eq!(" Oracle ".parse::<DialectKind>().unwrap(), DialectKind::Oracle);
        assert!("db2".parse::<DialectKind>().is_err());

        for kind in DialectKind::ALL {
            assert_eq!(kind.as_str().parse::<DialectKind>().unwrap(), kind);
            assert_eq!(kind.dialect().kind(), kind);
        }

        let json = serde_json::to_string(&DialectKind::SqlCe).unwrap();
        assert_eq!(json, "\"sqlce\"");
    }
}
