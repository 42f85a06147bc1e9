//! crudkit command-line tool
//!
//! Prints fixture DDL and generated CRUD statements per provider, and runs the
//! CRUD suite against SQLite.

mod commands;
mod error;
mod formatter;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use crudkit_bench::Fixture;
use crudkit_core::DialectKind;
use error::CliError;
use formatter::OutputFormat;

/// crudkit command-line tool
#[derive(Parser, Debug)]
#[command(name = "crudkit")]
#[command(version, about = "Inspect and exercise crudkit's CRUD mapping")]
pub struct Args {
    /// Output format
    #[arg(long, global = true, default_value = "table", value_enum)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the fixture schema for a provider
    Ddl {
        /// Target provider
        #[arg(short, long, value_enum)]
        dialect: DialectArg,
    },

    /// Print the statements generated for one fixture type
    Sql {
        /// Target provider
        #[arg(short, long, value_enum)]
        dialect: DialectArg,

        /// Fixture type or table name (e.g. `User`, `Automobiles`)
        #[arg(short, long, value_parser = parse_fixture)]
        table: Fixture,
    },

    /// Run the CRUD suite against SQLite
    Suite {
        /// Database file; an in-memory database when omitted
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

/// Provider names accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DialectArg {
    #[value(alias = "mssql")]
    Sqlserver,
    #[value(alias = "mariadb")]
    Mysql,
    Sqlite,
    Sqlce,
    Oracle,
}

impl From<DialectArg> for DialectKind {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Sqlserver => DialectKind::SqlServer,
            DialectArg::Mysql => DialectKind::MySql,
            DialectArg::Sqlite => DialectKind::Sqlite,
            DialectArg::Sqlce => DialectKind::SqlCe,
            DialectArg::Oracle => DialectKind::Oracle,
        }
    }
}

fn parse_fixture(s: &str) -> Result<Fixture, String> {
    s.parse().map_err(|e: crudkit_core::Error| e.to_string())
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("crudkit_cli=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), CliError> {
    match args.command {
        Command::Ddl { dialect } => {
            println!("{}", commands::ddl(dialect.into()));
        }
        Command::Sql { dialect, table } => {
            let statements = commands::sql(dialect.into(), table)?;
            println!("{}", formatter::format_statements(args.format, &statements)?);
        }
        Command::Suite { db } => {
            let report = commands::suite(db.as_deref())?;
            println!("{}", formatter::format_report(args.format, &report)?);
            if !report.is_success() {
                return Err(CliError::SuiteFailed {
                    failed: report.failed(),
                    total: report.checks.len(),
                });
            }
        }
    }
    Ok(())
}
