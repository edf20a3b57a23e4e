//! # Catalog Error Types Module
//!
//! Error types for the book store: libsql failures, schema bootstrap,
//! row decoding, and the domain refusals raised by book and loan operations
//! (missing records, exhausted copies, invalid book data).

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for database operations
#[derive(Debug, Error)]
pub enum DbError {
    /// LibSQL error
    #[error("LibSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// SQL query error
    #[error("SQL query error: {0}")]
    Query(String),

    /// Schema error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Data error
    #[error("Data error: {0}")]
    Data(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// The requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation conflicts with the current state of the record
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Submitted book data failed validation
    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<DbError> for CrateError {
    fn from(err: DbError) -> Self {
        CrateError::Database(err.to_string())
    }
}
