//! Error types for the Lectern crate

use thiserror::Error;

/// Result type for Lectern operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Lectern operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Query interpretation error
    #[error("Interpretation error: {0}")]
    Interpret(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Search error
    #[error("Search error: {0}")]
    Search(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DbError;
    use crate::interpreter::InterpretError;
    use crate::search::SearchError;

    fn not_found() -> Result<()> {
        let lookup: std::result::Result<(), DbError> =
            Err(DbError::NotFound("Book 7 not found".to_string()));
        lookup?;
        Ok(())
    }

    #[test]
    fn test_subsystem_errors_convert() {
        assert!(matches!(not_found(), Err(Error::Database(_))));

        let search: Error = SearchError::Database(DbError::Conflict("busy".to_string())).into();
        assert!(matches!(search, Error::Database(_)));

        let search: Error = SearchError::InvalidParameters("empty".to_string()).into();
        assert!(matches!(search, Error::Search(_)));

        let config: Error = InterpretError::Config("missing model".to_string()).into();
        assert!(matches!(config, Error::Config(msg) if msg == "missing model"));

        let timeout: Error = InterpretError::Timeout.into();
        assert!(matches!(timeout, Error::Interpret(_)));
    }
}
