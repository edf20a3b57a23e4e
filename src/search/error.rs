//! # Search Error Types Module
//!
//! Errors raised while turning a prompt or a filter set into catalogue
//! results. Interpretation problems never show up here; the interpreter
//! absorbs them.

use thiserror::Error;

use crate::catalog::DbError;
use crate::error::Error as CrateError;

/// Errors that can occur during search operations
#[derive(Debug, Error)]
pub enum SearchError {
    /// Error occurred during database operations
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Error occurred during result processing
    #[error("Result processing error: {0}")]
    ResultProcessing(String),

    /// Invalid search parameters
    #[error("Invalid search parameters: {0}")]
    InvalidParameters(String),
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::ResultProcessing(err.to_string())
    }
}

impl From<SearchError> for CrateError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Database(e) => e.into(),
            other => CrateError::Search(other.to_string()),
        }
    }
}
