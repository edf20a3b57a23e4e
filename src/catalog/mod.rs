//! Catalog module
//!
//! The book store: inventory records, loans, and the libsql-backed
//! `Database` that persists them.

pub(crate) mod database;
pub mod error;
pub mod predicate;
mod schema;

pub use database::Database;
pub use error::DbError;
pub use predicate::Predicate;

use serde::{Deserialize, Serialize};

/// Default number of books per page when browsing
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Default loan period in days
pub const DEFAULT_LOAN_DAYS: i64 = 14;

/// Earliest publish year accepted for a catalogue entry
pub const MIN_PUBLISH_YEAR: i64 = 1000;

/// A book in the catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub category: Option<String>,

    /// Comma-joined tag list
    pub tags: Option<String>,
    pub description: Option<String>,
    pub publish_year: Option<i64>,
    pub language: Option<String>,
    pub location_shelf: Option<String>,
    pub cover_image_url: Option<String>,
    pub total_copies: i64,

    /// Copies currently on the shelf; never exceeds `total_copies`
    pub available_copies: i64,

    /// Unix timestamp of creation
    pub created_at: i64,

    /// Unix timestamp of the last update
    pub updated_at: i64,
}

impl Book {
    /// Text searched by free-text terms: title, author, description, tags and
    /// category, joined by newlines and lowercased
    pub fn searchable_text(&self) -> String {
        [
            self.title.as_str(),
            self.author.as_str(),
            self.description.as_deref().unwrap_or(""),
            self.tags.as_deref().unwrap_or(""),
            self.category.as_deref().unwrap_or(""),
        ]
        .join("\n")
        .to_lowercase()
    }

    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }
}

/// Data for creating or replacing a book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub publish_year: Option<i64>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub location_shelf: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default = "default_copies")]
    pub total_copies: i64,
    #[serde(default = "default_copies")]
    pub available_copies: i64,
}

fn default_copies() -> i64 {
    1
}

impl NewBook {
    /// A single-copy book with only the required fields set
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            isbn: None,
            category: None,
            tags: None,
            description: None,
            publish_year: None,
            language: None,
            location_shelf: None,
            cover_image_url: None,
            total_copies: 1,
            available_copies: 1,
        }
    }

    /// Check the record against the catalogue's field rules.
    ///
    /// `current_year` bounds the publish year from above.
    pub fn validate(&self, current_year: i64) -> Result<(), DbError> {
        require_text("title", &self.title, 300)?;
        require_text("author", &self.author, 200)?;

        let optional_fields = [
            ("isbn", &self.isbn, 20),
            ("category", &self.category, 100),
            ("tags", &self.tags, 500),
            ("description", &self.description, 2000),
            ("language", &self.language, 50),
            ("location_shelf", &self.location_shelf, 100),
        ];
        for (name, value, max) in optional_fields {
            if let Some(value) = value {
                check_length(name, value, max)?;
            }
        }

        if let Some(year) = self.publish_year {
            if year < MIN_PUBLISH_YEAR {
                return Err(DbError::Validation(format!(
                    "Year must be {} or later.",
                    MIN_PUBLISH_YEAR
                )));
            }
            if year > current_year {
                return Err(DbError::Validation(format!(
                    "Year cannot exceed {}.",
                    current_year
                )));
            }
        }

        if self.total_copies < 0 || self.available_copies < 0 {
            return Err(DbError::Validation(
                "Copy counts cannot be negative".to_string(),
            ));
        }
        if self.available_copies > self.total_copies {
            return Err(DbError::Validation(
                "Available copies cannot exceed total copies".to_string(),
            ));
        }

        Ok(())
    }
}

fn require_text(name: &str, value: &str, max: usize) -> Result<(), DbError> {
    if value.trim().is_empty() {
        return Err(DbError::Validation(format!("{} is required", name)));
    }
    check_length(name, value, max)
}

fn check_length(name: &str, value: &str, max: usize) -> Result<(), DbError> {
    if value.chars().count() > max {
        return Err(DbError::Validation(format!(
            "{} must be at most {} characters",
            name, max
        )));
    }
    Ok(())
}

/// Parameters for browsing the catalogue page by page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookQuery {
    /// Matched against title, author, isbn, category and tags
    pub search_term: Option<String>,

    /// Exact category match
    pub category: Option<String>,
    pub available_only: bool,
    pub publish_year_min: Option<i64>,
    pub publish_year_max: Option<i64>,

    /// 1-based page number
    pub page: usize,
    pub page_size: usize,
}

impl Default for BookQuery {
    fn default() -> Self {
        Self {
            search_term: None,
            category: None,
            available_only: false,
            publish_year_min: None,
            publish_year_max: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of browse results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPage {
    pub books: Vec<Book>,
    pub page: usize,
    pub page_size: usize,

    /// Number of books matching the query across all pages
    pub total_count: usize,
}

impl BookPage {
    pub fn total_pages(&self) -> usize {
        if self.page_size == 0 {
            0
        } else {
            self.total_count.div_ceil(self.page_size)
        }
    }
}

/// State of a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    Borrowed,
    Returned,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Borrowed => "Borrowed",
            LoanStatus::Returned => "Returned",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Borrowed" => Some(LoanStatus::Borrowed),
            "Returned" => Some(LoanStatus::Returned),
            _ => None,
        }
    }
}

/// A checkout of one copy of a book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: i64,
    pub book_id: i64,

    /// Identifier of the patron holding the copy
    pub borrower: String,
    pub borrowed_at: i64,
    pub due_at: i64,
    pub returned_at: Option<i64>,
    pub status: LoanStatus,
}
