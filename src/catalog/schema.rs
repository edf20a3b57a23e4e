//! # Database Schema Module
//!
//! Creates the catalogue tables on first use. Bootstrap is idempotent; there
//! is no migration history.
//!
//! - `books` holds the inventory, with `available_copies` tracking how many
//!   copies are currently on the shelf
//! - `loans` records every checkout, with `returned_at` set on checkin

use crate::catalog::error::DbError;
use libsql::{Connection, params};

/// Initialize the database schema
pub async fn initialize_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            isbn TEXT,
            category TEXT,
            tags TEXT,
            description TEXT,
            publish_year INTEGER,
            language TEXT,
            location_shelf TEXT,
            cover_image_url TEXT,
            total_copies INTEGER NOT NULL DEFAULT 1,
            available_copies INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create books table: {}", e)))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS loans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            book_id INTEGER NOT NULL,
            borrower TEXT NOT NULL,
            borrowed_at INTEGER NOT NULL,
            due_at INTEGER NOT NULL,
            returned_at INTEGER,
            status TEXT NOT NULL,
            FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE
        )",
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create loans table: {}", e)))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_books_title ON books(title COLLATE NOCASE)",
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create index on books title: {}", e)))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_loans_book_id ON loans(book_id)",
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create index on loans: {}", e)))?;

    Ok(())
}
