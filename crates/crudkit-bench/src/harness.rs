//! SQLite-backed test context.
//!
//! Opens a database, installs the fixture schema and hands out the mapper
//! and connection together.

use std::path::Path;

use crudkit_core::{DialectKind, Error, Mapper, MapperConfig, Result, SqlExecutor, Statement};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::fixtures::{generate_posts, Fixture, Scale};
use crate::schema::schema_script;

/// Connection plus mapper over the fixture schema.
pub struct TestContext {
    pub conn: Connection,
    pub mapper: Mapper,
    _dir: Option<tempfile::TempDir>,
}

impl TestContext {
    /// Fresh in-memory database with the fixture schema.
    pub fn new() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(connection_error)?;
        Self::install(conn, None)
    }

    /// Fresh database in a temporary file, for larger data sets.
    pub fn new_temp_file() -> Result<Self> {
        let dir = tempfile::tempdir().map_err(|e| Error::Connection(Box::new(e)))?;
        let conn =
            Connection::open(dir.path().join("crudkit.sqlite")).map_err(connection_error)?;
        Self::install(conn, Some(dir))
    }

    /// Open (or create) the database at `path`, replacing any fixture tables.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(connection_error)?;
        Self::install(conn, None)
    }

    /// Fresh in-memory database populated with generated posts.
    pub fn with_scale(scale: Scale) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.populate_posts(scale.count())?;
        Ok(ctx)
    }

    fn install(mut conn: Connection, dir: Option<tempfile::TempDir>) -> Result<Self> {
        for sql in schema_script(DialectKind::Sqlite) {
            SqlExecutor::execute(&mut conn, &Statement::new(sql))?;
        }
        debug!(tables = Fixture::ALL.len(), "Installed fixture schema");

        Ok(Self {
            conn,
            mapper: Mapper::new(&MapperConfig::new(DialectKind::Sqlite)),
            _dir: dir,
        })
    }

    /// Insert `count` generated posts in one transaction; returns their ids.
    pub fn populate_posts(&mut self, count: usize) -> Result<Vec<i32>> {
        let mut ids = Vec::with_capacity(count);
        SqlExecutor::execute(&mut self.conn, &Statement::new("BEGIN"))?;
        for mut post in generate_posts(count) {
            if let Err(err) = self.mapper.insert(&mut self.conn, &mut post) {
                // Report the insert error, not a rollback failure.
                let _ = SqlExecutor::execute(&mut self.conn, &Statement::new("ROLLBACK"));
                return Err(err);
            }
            ids.push(post.id);
        }
        SqlExecutor::execute(&mut self.conn, &Statement::new("COMMIT"))?;
        info!(count, "Populated posts");
        Ok(ids)
    }

    /// Delete every row from every fixture table.
    pub fn clear(&mut self) -> Result<()> {
        let dialect = self.mapper.dialect();
        for fixture in Fixture::ALL {
            let sql = format!("DELETE FROM {}", dialect.quote_qualified(&fixture.table()));
            SqlExecutor::execute(&mut self.conn, &Statement::new(sql))?;
        }
        Ok(())
    }
}

fn connection_error(err: rusqlite::Error) -> Error {
    Error::Connection(Box::new(err))
}

/// Install a `tracing` subscriber honoring `RUST_LOG`, once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
