//! Filter-to-query compiler
//!
//! Every populated filter becomes an AND-ed condition on the books table.
//! Each free-text term (keywords, then tags) must match at least one of
//! title, author, description, tags or category. Searches with more than one
//! term over-fetch and are re-ranked by how many terms each book matches.

use super::error::SearchError;
use super::ranking;
use crate::catalog::database::BOOK_COLUMNS;
use crate::catalog::{Book, Database, Predicate};
use crate::filters::{SearchFilters, SortBy};
use libsql::Value;
use tracing::{debug, instrument};

/// Columns a free-text term is matched against
const TERM_COLUMNS: &[&str] = &["title", "author", "description", "tags", "category"];

/// Rows fetched per requested result when re-ranking
const OVERFETCH_FACTOR: usize = 3;

/// A ready-to-run catalogue query
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<Value>,

    /// Results to return
    pub limit: usize,

    /// Rows requested from the store; larger than `limit` when re-ranking
    pub fetch_limit: usize,

    /// Terms to re-rank by, when there are several
    pub rerank_terms: Option<Vec<String>>,
}

/// Compile `filters` into SQL. Never fails: unusable values are ignored.
pub fn compile(filters: &SearchFilters) -> CompiledQuery {
    let mut predicate = Predicate::new();

    let scalars = [
        ("title", &filters.title),
        ("author", &filters.author),
        ("isbn", &filters.isbn),
        ("category", &filters.category),
        ("language", &filters.language),
    ];
    for (column, value) in scalars {
        if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            predicate.contains(column, value);
        }
    }

    if filters.available_only == Some(true) {
        predicate.positive("available_copies");
    }
    if let Some(min) = filters.publish_year_min {
        predicate.at_least("publish_year", i64::from(min));
    }
    if let Some(max) = filters.publish_year_max {
        predicate.at_most("publish_year", i64::from(max));
    }

    let terms = filters.terms();
    for term in &terms {
        predicate.any_contains(TERM_COLUMNS, term);
    }

    let limit = filters.effective_limit();
    let (order_by, fetch_limit, rerank_terms) = if terms.len() > 1 {
        ("title COLLATE NOCASE, id", limit * OVERFETCH_FACTOR, Some(terms))
    } else if filters.sort_by == Some(SortBy::Year) {
        ("publish_year DESC, title COLLATE NOCASE, id", limit, None)
    } else {
        ("title COLLATE NOCASE, id", limit, None)
    };

    let sql = format!(
        "SELECT {} FROM books{} ORDER BY {} LIMIT ?",
        BOOK_COLUMNS,
        predicate.where_clause(),
        order_by
    );
    let mut params = predicate.into_params();
    params.push((fetch_limit as i64).into());

    CompiledQuery {
        sql,
        params,
        limit,
        fetch_limit,
        rerank_terms,
    }
}

/// Run `filters` against the catalogue
#[instrument(skip(db))]
pub async fn search_by_filters(
    db: &Database,
    filters: &SearchFilters,
) -> Result<Vec<Book>, SearchError> {
    let query = compile(filters);
    debug!(sql = %query.sql, fetch_limit = query.fetch_limit, "Compiled search query");

    let books = db.query_books(&query.sql, query.params).await?;

    Ok(match query.rerank_terms {
        Some(terms) => ranking::rerank(books, &terms, query.limit),
        None => books,
    })
}
