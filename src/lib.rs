//! # Lectern - Natural-Language Search for a Library Catalogue
//!
//! This crate manages a small library catalogue and lets patrons search it
//! in plain language. A prompt such as "available french cooking books from
//! the last 10 years" is interpreted into structured filters, either by an
//! OpenAI-compatible language model or by a rule-based fallback, and then
//! compiled into a ranked query over the catalogue.
//!
//! ## Features
//!
//! - Query interpretation with an AI provider and a deterministic fallback
//! - Filter-to-query compilation with relevance re-ranking
//! - Book inventory and loans stored in LibSQL
//! - Async API with Tokio
//!
//! ## Example
//!
//! ```rust,no_run
//! use lectern::catalog::Database;
//! use lectern::interpreter::Interpreter;
//! use lectern::search::SearchSystem;
//!
//! #[tokio::main]
//! async fn main() -> lectern::Result<()> {
//!     let db = Database::new_from_path("lectern.db").await?;
//!     let interpreter = Interpreter::from_env()?;
//!     let search = SearchSystem::new(db, interpreter);
//!
//!     let outcome = search.search("fantasy novels from the last 5 years").await?;
//!     println!("{}", outcome.interpretation.explanation);
//!     for book in outcome.books {
//!         println!("{} by {}", book.title, book.author);
//!     }
//!     Ok(())
//! }
//! ```

mod error;
pub mod catalog;
pub mod filters;
pub mod interpreter;
pub mod search;

pub use error::{Error, Result};

/// Re-export of commonly used types
pub mod prelude {
    pub use crate::catalog::{Book, Database, DbError, NewBook};
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::filters::{SearchFilters, SortBy};
    pub use crate::interpreter::{AiConfig, InterpretationResult, Interpreter};
    pub use crate::search::{SearchError, SearchOutcome, SearchSystem};
}
