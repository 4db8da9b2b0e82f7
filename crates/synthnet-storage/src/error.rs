//! Error types for the storage layer

use thiserror::Error;

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur in the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// A referenced record does not exist
    #[error("{kind} {id} not found")]
    NotFound {
        /// Record kind (table name)
        kind: &'static str,
        /// Identifier that was looked up
        id: i64,
    },

    /// A record failed validation before it reached the backend
    #[error("Invalid record: {reason}")]
    InvalidRecord {
        /// Reason the record was rejected
        reason: String,
    },

    /// Parameter table names are spliced into statements and must be plain identifiers
    #[error("Invalid parameter table name: {name:?}")]
    InvalidTableName {
        /// Offending name
        name: String,
    },

    /// A stored value does not fit the in-memory representation
    #[error("Value out of range in column {column}: {value}")]
    OutOfRange {
        /// Column being decoded
        column: &'static str,
        /// Raw stored value
        value: i64,
    },

    /// SQLite backend error
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {source}")]
    Sqlite {
        #[from]
        /// Source SQLite error
        source: rusqlite::Error,
    },

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        #[from]
        /// Source I/O error
        source: std::io::Error,
    },
}

impl StorageError {
    /// Create a not-found error
    pub fn not_found(kind: &'static str, id: impl Into<i64>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create an invalid record error
    pub fn invalid_record(reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            reason: reason.into(),
        }
    }

    /// Create an invalid table name error
    pub fn invalid_table_name(name: impl Into<String>) -> Self {
        Self::InvalidTableName { name: name.into() }
    }
}
