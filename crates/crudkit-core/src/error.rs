//! Core error types.

use thiserror::Error;

use crate::value::Value;

/// Boxed driver error, surfaced without modification.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the mapper.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Mapper errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The entity's mapping cannot be resolved to a table/key shape.
    #[error("mapping error for {entity}: {reason}")]
    Mapping { entity: String, reason: String },

    /// A key lookup matched no row.
    #[error("no row in {table} matches the given key")]
    NotFound { table: String },

    /// A key lookup matched more than one row.
    #[error("key lookup on {table} returned {count} rows")]
    AmbiguousResult { table: String, count: usize },

    /// The supplied key does not fit the table's key columns.
    #[error("invalid key for {table}: {reason}")]
    InvalidKey { table: String, reason: String },

    /// Uniqueness or foreign-key violation reported by the driver.
    #[error("constraint violation: {0}")]
    ConstraintViolation(#[source] BoxError),

    /// Unreachable server, authentication failure, unopenable database.
    #[error("connection error: {0}")]
    Connection(#[source] BoxError),

    /// Any other statement failure reported by the driver.
    #[error("driver error: {0}")]
    Driver(#[source] BoxError),

    /// An identity insert completed but no generated key came back.
    #[error("insert into {table} returned no generated key")]
    MissingGeneratedKey { table: String },

    /// An identity insert committed its row, but the generated key could not
    /// be converted to the key type or written onto the entity. `key` is the
    /// value the database returned, so the row can still be located.
    #[error("row inserted into {table} with generated key {key:?}, but the key could not be stored: {source}")]
    GeneratedKeyNotStored {
        table: String,
        key: Value,
        #[source]
        source: Box<Error>,
    },

    /// A value could not be converted to the requested type.
    #[error("cannot convert {found} to {expected}")]
    Conversion { expected: String, found: String },

    /// Invalid mapper configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a mapping error.
    pub fn mapping(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Mapping {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid key error.
    pub fn invalid_key(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Create a conversion error.
    pub fn conversion(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::Conversion {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Wrap a driver error that is neither a constraint nor a connection failure.
    pub fn driver(err: impl Into<BoxError>) -> Self {
        Self::Driver(err.into())
    }

    /// The key of a committed row whose generated key was not stored.
    pub fn generated_key(&self) -> Option<&Value> {
        match self {
            Error::GeneratedKeyNotStored { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Check if the caller can recover from this error (lookup misses).
    pub fn is_lookup_miss(&self) -> bool {
        matches!(self, Error::NotFound { .. } | Error::AmbiguousResult { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::mapping("Widget", "no key field");
        assert_eq!(err.to_string(), "mapping error for Widget: no key field");

        let err = Error::NotFound {
            table: "Users".into(),
        };
        assert_eq!(err.to_string(), "no row in Users matches the given key");
        assert!(err.is_lookup_miss());
    }

    #[test]
    fn test_driver_source_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = Error::Connection(Box::new(io));
        let source = std::error::Error::source(&err).expect("source");
        assert_eq!(source.to_string(), "refused");
        assert!(!err.is_lookup_miss());
    }

    #[test]
    fn test_generated_key_not_stored_keeps_key() {
        let err = Error::GeneratedKeyNotStored {
            table: "Users".into(),
            key: Value::Int64(1 << 31),
            source: Box::new(Error::conversion("int32", "int64")),
        };
        assert_eq!(err.generated_key(), Some(&Value::Int64(1 << 31)));
        assert!(err.to_string().contains("Int64(2147483648)"));
        let source = std::error::Error::source(&err).expect("source");
        assert_eq!(source.to_string(), "cannot convert int64 to int32");
        assert_eq!(Error::driver("x").generated_key(), None);
    }
}
