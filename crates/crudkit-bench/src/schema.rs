//! Fixture DDL for every supported provider.

use crudkit_core::{Dialect, DialectKind};

use crate::fixtures::Fixture;

/// Column storage classes used by the fixture tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    /// Auto-incrementing integer primary key.
    Identity,
    Int,
    NullableInt,
    Text(u16),
    DateTime,
    NullableDateTime,
}

use ColumnType::*;

type Columns = &'static [(&'static str, ColumnType)];

struct TableDef {
    columns: Columns,
    /// Table-level primary key, for keys that are not identity columns.
    primary_key: &'static [&'static str],
}

const STUFF: Columns = &[
    ("TheId", Identity),
    ("Name", Text(100)),
    ("Created", NullableDateTime),
];
const NAMED_IDENTITY: Columns = &[("Id", Identity), ("Name", Text(100))];
const USERS: Columns = &[("Id", Identity), ("Name", Text(100)), ("Age", Int)];
const RESULTS: Columns = &[("Id", Identity), ("Name", Text(100)), ("Order", Int)];
const OBJECT_X: Columns = &[("ObjectXId", Text(100)), ("Name", Text(100))];
const OBJECT_Y: Columns = &[("ObjectYId", Int), ("Name", Text(100))];
const OBJECT_Z: Columns = &[("Id", Int), ("Name", Text(100))];
const GENERIC_TYPE: Columns = &[("Id", Text(100)), ("Name", Text(100))];
const NULLABLE_DATES: Columns = &[("Id", Identity), ("DateValue", NullableDateTime)];
const MEMBERSHIPS: Columns = &[("GroupId", Int), ("UserId", Int), ("Role", Text(50))];
const POSTS: Columns = &[
    ("Id", Identity),
    ("Text", Text(2000)),
    ("CreationDate", DateTime),
    ("LastChangeDate", DateTime),
    ("Counter1", NullableInt),
    ("Counter2", NullableInt),
    ("Counter3", NullableInt),
    ("Counter4", NullableInt),
    ("Counter5", NullableInt),
    ("Counter6", NullableInt),
    ("Counter7", NullableInt),
    ("Counter8", NullableInt),
    ("Counter9", NullableInt),
];

fn table_def(fixture: Fixture) -> TableDef {
    let (columns, primary_key): (Columns, &'static [&'static str]) = match fixture {
        Fixture::Stuff => (STUFF, &[]),
        Fixture::Person | Fixture::Car => (NAMED_IDENTITY, &[]),
        Fixture::User => (USERS, &[]),
        Fixture::ResultRow => (RESULTS, &[]),
        Fixture::ObjectX => (OBJECT_X, &["ObjectXId"]),
        Fixture::ObjectY => (OBJECT_Y, &["ObjectYId"]),
        Fixture::ObjectZ => (OBJECT_Z, &["Id"]),
        Fixture::GenericType => (GENERIC_TYPE, &["Id"]),
        Fixture::NullableDate => (NULLABLE_DATES, &[]),
        Fixture::Membership => (MEMBERSHIPS, &["GroupId", "UserId"]),
        Fixture::Post => (POSTS, &[]),
    };
    TableDef {
        columns,
        primary_key,
    }
}

fn column_type_sql(kind: DialectKind, ty: ColumnType) -> String {
    let text = |n: u16| match kind {
        DialectKind::Oracle => format!("varchar2({n})"),
        _ => format!("nvarchar({n})"),
    };
    let int = match kind {
        DialectKind::Sqlite | DialectKind::Oracle => "integer",
        _ => "int",
    };
    let datetime = match kind {
        DialectKind::Oracle => "timestamp",
        _ => "DateTime",
    };

    match ty {
        Identity => match kind {
            DialectKind::SqlServer | DialectKind::SqlCe => {
                "int IDENTITY(1,1) not null primary key".into()
            }
            DialectKind::MySql => "int not null AUTO_INCREMENT PRIMARY KEY".into(),
            DialectKind::Sqlite => "integer primary key autoincrement not null".into(),
            DialectKind::Oracle => {
                "integer generated by default on null as identity not null primary key".into()
            }
        },
        Int => format!("{int} not null"),
        NullableInt => format!("{int} null"),
        Text(n) => format!("{} not null", text(n)),
        DateTime => format!("{datetime} not null"),
        NullableDateTime => format!("{datetime} null"),
    }
}

/// `CREATE TABLE` statement for one fixture.
pub fn create_table(kind: DialectKind, fixture: Fixture) -> String {
    let dialect = kind.dialect();
    let def = table_def(fixture);

    let mut parts: Vec<String> = def
        .columns
        .iter()
        .map(|&(name, ty)| {
            format!(
                "{} {}",
                dialect.quote_identifier(name),
                column_type_sql(kind, ty)
            )
        })
        .collect();
    if !def.primary_key.is_empty() {
        let key = def
            .primary_key
            .iter()
            .map(|c| dialect.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");
        parts.push(format!("PRIMARY KEY ({key})"));
    }

    format!(
        "CREATE TABLE {} ({})",
        dialect.quote_qualified(&fixture.table()),
        parts.join(", ")
    )
}

/// Statement dropping a fixture table if it exists.
///
/// SQL CE has no conditional drop; its database file is recreated instead,
/// so there is no statement for it.
pub fn drop_table(kind: DialectKind, fixture: Fixture) -> Option<String> {
    let dialect = kind.dialect();
    let table = fixture.table();
    let quoted = dialect.quote_qualified(&table);

    match kind {
        DialectKind::SqlServer => Some(format!(
            "IF OBJECT_ID('{table}', 'U') IS NOT NULL DROP TABLE {quoted}"
        )),
        DialectKind::MySql | DialectKind::Sqlite => Some(format!("DROP TABLE IF EXISTS {quoted}")),
        DialectKind::SqlCe => None,
        DialectKind::Oracle => Some(format!(
            "BEGIN EXECUTE IMMEDIATE 'DROP TABLE {quoted} CASCADE CONSTRAINTS'; \
             EXCEPTION WHEN OTHERS THEN IF SQLCODE != -942 THEN RAISE; END IF; END;"
        )),
    }
}

/// Drop and create statements for every fixture, in order.
pub fn schema_script(kind: DialectKind) -> Vec<String> {
    let mut script = Vec::with_capacity(Fixture::ALL.len() * 2);
    for fixture in Fixture::ALL {
        script.extend(drop_table(kind, fixture));
        script.push(create_table(kind, fixture));
    }
    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sqlite_results_table() {
        assert_eq!(
            create_table(DialectKind::Sqlite, Fixture::ResultRow),
            "CREATE TABLE [Results] ([Id] integer primary key autoincrement not null, \
             [Name] nvarchar(100) not null, [Order] integer not null)"
        );
    }

    #[test]
    fn test_mysql_identity_and_reserved_word() {
        let sql = create_table(DialectKind::MySql, Fixture::ResultRow);
        assert!(sql.contains("`Id` int not null AUTO_INCREMENT PRIMARY KEY"), "{sql}");
        assert!(sql.contains("`Order` int not null"), "{sql}");
    }

    #[test]
    fn test_oracle_upper_cases_identifiers() {
        let sql = create_table(DialectKind::Oracle, Fixture::Stuff);
        assert!(sql.starts_with("CREATE TABLE \"STUFF\" (\"THEID\" integer generated"), "{sql}");
        assert!(sql.contains("\"CREATED\" timestamp null"), "{sql}");
    }

    #[test]
    fn test_composite_primary_key() {
        assert_eq!(
            create_table(DialectKind::SqlServer, Fixture::Membership),
            "CREATE TABLE [Memberships] ([GroupId] int not null, [UserId] int not null, \
             [Role] nvarchar(50) not null, PRIMARY KEY ([GroupId], [UserId]))"
        );
    }

    #[test]
    fn test_drop_statements() {
        assert_eq!(
            drop_table(DialectKind::SqlServer, Fixture::Car).as_deref(),
            Some("IF OBJECT_ID('Automobiles', 'U') IS NOT NULL DROP TABLE [Automobiles]")
        );
        assert_eq!(drop_table(DialectKind::SqlCe, Fixture::Car), None);
    }

    #[test]
    fn test_schema_script_covers_every_fixture() {
        for kind in DialectKind::ALL {
            let creates = schema_script(kind)
                .iter()
                .filter(|s| s.starts_with("CREATE TABLE"))
                .count();
            assert_eq!(creates, Fixture::ALL.len(), "{kind}");
        }
    }
}
