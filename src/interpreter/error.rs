//! Error types for the query interpreter
//!
//! None of these reach callers of `Interpreter::interpret`; they are logged and
//! the rule-based fallback answers instead. `Config` is the exception: it is
//! raised while building an `AiConfig` and reported by the CLI.

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for the AI-assisted interpretation path
#[derive(Debug, Error)]
pub enum InterpretError {
    /// Transport-level failure talking to the AI provider
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider did not answer within the configured timeout
    #[error("AI request timed out")]
    Timeout,

    /// Non-success status from the provider
    #[error("AI provider error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Local request quota exhausted
    #[error("AI request quota exhausted")]
    RateLimited,

    /// The reply could not be read as a filter object
    #[error("Malformed AI response: {0}")]
    Malformed(String),

    /// Invalid AI configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<InterpretError> for CrateError {
    fn from(err: InterpretError) -> Self {
        match err {
            InterpretError::Http(e) => CrateError::Http(e),
            InterpretError::Config(msg) => CrateError::Config(msg),
            other => CrateError::Interpret(other.to_string()),
        }
    }
}
