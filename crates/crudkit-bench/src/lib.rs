//! crudkit fixture harness and benchmarks
//!
//! Shared by the criterion benches and the `crudkit` CLI.
//!
//! - **fixtures**: entity types covering every key shape, plus seeded post generation
//! - **schema**: per-provider DDL for the fixture tables
//! - **harness**: SQLite test context with the schema installed
//! - **suite**: the CRUD suite, run end to end against a context

pub mod fixtures;
pub mod harness;
pub mod schema;
pub mod suite;

pub use fixtures::{generate_posts, Fixture, Scale};
pub use harness::{init_tracing, TestContext};
pub use schema::{create_table, drop_table, schema_script};
pub use suite::{check_names, run_suite, CheckOutcome, SuiteReport};
