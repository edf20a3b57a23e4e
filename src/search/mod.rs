//! Search module
//!
//! Natural-language search over the catalogue: a prompt is interpreted into
//! [`SearchFilters`], compiled to SQL and run against the [`Database`].

mod compiler;
mod error;
pub mod ranking;

pub use compiler::{CompiledQuery, compile, search_by_filters};
pub use error::SearchError;

use crate::catalog::{Book, Database};
use crate::filters::SearchFilters;
use crate::interpreter::{InterpretationResult, Interpreter};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Interpretation of a prompt together with the books it found
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub interpretation: InterpretationResult,
    pub books: Vec<Book>,
}

/// Parse a JSON filter document, tolerating bad fields
pub fn filters_from_json(json: &str) -> Result<SearchFilters, SearchError> {
    let value: serde_json::Value = serde_json::from_str(json)?;

    SearchFilters::from_value(&value).ok_or_else(|| {
        SearchError::InvalidParameters("Filters must be a JSON object".to_string())
    })
}

/// Natural-language search over the catalogue
pub struct SearchSystem {
    db: Database,
    interpreter: Interpreter,
}

impl SearchSystem {
    /// Create a new search system with the given database
    pub fn new(db: Database, interpreter: Interpreter) -> Self {
        Self { db, interpreter }
    }

    /// Interpret `prompt` and return the matching books
    #[instrument(skip(self))]
    pub async fn search(&self, prompt: &str) -> Result<SearchOutcome, SearchError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(SearchError::InvalidParameters(
                "Search prompt cannot be empty".to_string(),
            ));
        }

        let interpretation = self.interpreter.interpret(prompt).await;
        let books = search_by_filters(&self.db, &interpretation.filters).await?;

        info!(
            results = books.len(),
            used_fallback = interpretation.used_fallback,
            "Search completed"
        );

        Ok(SearchOutcome {
            interpretation,
            books,
        })
    }

    /// Get the database reference
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Get the interpreter reference
    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }
}
