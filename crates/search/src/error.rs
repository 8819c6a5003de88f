//! Error types for the search engine.
//!
//! Only two kinds of failure are errors here: a parameter bag that cannot be
//! parsed at all, and faults raised by the store while materializing a query.
//! Unknown fields, uncoercible values, blank range bounds and empty condition
//! lists are not errors; they are dropped with a warning and the query runs
//! as if that filter were absent.

// Variant fields are described by their #[error] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all search operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Record decoding errors
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Store faults
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors related to caller input that cannot be interpreted at all.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The parameter bag could not be parsed.
    #[error("invalid search parameters: {message}")]
    InvalidParameters { message: String },
}

/// Errors raised while turning stored rows into records.
#[derive(Error, Debug)]
pub enum SearchError {
    /// A materialized record could not be decoded.
    #[error("failed to decode record {id}: {message}")]
    RecordDecode { id: i64, message: String },
}

/// Errors originating from the store.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Schema creation or migration failed.
    #[error("schema migration failed: {message}")]
    MigrationError { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Query execution error.
    #[error("query execution failed: {message}")]
    QueryError { message: String },
}

/// Result of any fallible search or store call.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Validation(ValidationError::InvalidParameters {
            message: e.to_string(),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Backend(BackendError::QueryError {
            message: e.to_string(),
        })
    }
}
