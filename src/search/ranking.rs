//! Term-overlap relevance ranking for multi-term searches

use crate::catalog::Book;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Number of distinct terms (case-insensitive) found in the book's
/// searchable text
pub fn relevance_score(book: &Book, terms: &[String]) -> usize {
    let text = book.searchable_text();
    let distinct: BTreeSet<String> = terms
        .iter()
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect();

    distinct
        .iter()
        .filter(|term| text.contains(term.as_str()))
        .count()
}

/// Order books by score (highest first) then title, keeping at most `limit`
pub fn rerank(books: Vec<Book>, terms: &[String], limit: usize) -> Vec<Book> {
    let mut scored: Vec<(usize, String, Book)> = books
        .into_iter()
        .map(|book| (relevance_score(&book, terms), book.title.to_lowercase(), book))
        .collect();

    scored.sort_by(|a, b| match b.0.cmp(&a.0) {
        Ordering::Equal => a.1.cmp(&b.1),
        other => other,
    });

    scored
        .into_iter()
        .take(limit)
        .map(|(_, _, book)| book)
        .collect()
}
