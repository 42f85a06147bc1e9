//! crudkit core - entity mapping, SQL dialects and CRUD statement dispatch.
//!
//! An entity type describes its table through [`Entity::mapping`]. The
//! [`Mapper`] turns that description into a cached [`TableDescriptor`],
//! synthesizes dialect-specific SQL and runs it through any
//! [`SqlExecutor`].

pub mod config;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod mapper;
pub mod mapping;
pub mod row;
pub mod statement;
pub mod value;

pub use config::MapperConfig;
pub use dialect::{Dialect, DialectKind, IdentityRetrieval};
pub use error::{Error, Result};
pub use executor::{RecordingExecutor, ScriptedResponse, SqlExecutor};
pub use mapper::{scalar, EntityIter, Mapper};
pub use mapping::{
    CacheStats, ColumnDescriptor, DescriptorCache, Entity, EntityMapping, FieldMapping, Key,
    KeyAnnotation, KeyPolicy, ScalarType, TableDescriptor,
};
pub use row::Row;
pub use statement::{SqlBuilder, Statement};
pub use value::{FromValue, Value};
