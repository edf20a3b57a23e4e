//! Database operations for the catalog module

use crate::catalog::error::DbError;
use crate::catalog::predicate::Predicate;
use crate::catalog::schema;
use crate::catalog::{
    Book, BookPage, BookQuery, DEFAULT_LOAN_DAYS, DEFAULT_PAGE_SIZE, Loan, LoanStatus, NewBook,
};
use chrono::{Datelike, Utc};
use libsql::{Connection, Row, Rows, Value, params};
use tracing::{debug, info, instrument};

/// Column list matching `row_to_book`
pub(crate) const BOOK_COLUMNS: &str = "id, title, author, isbn, category, tags, description, \
     publish_year, language, location_shelf, cover_image_url, total_copies, available_copies, \
     created_at, updated_at";

const LOAN_COLUMNS: &str = "id, book_id, borrower, borrowed_at, due_at, returned_at, status";

const SECONDS_PER_DAY: i64 = 86_400;

/// Database manager for the catalogue
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create a new database manager
    #[instrument(skip(conn))]
    pub async fn new(conn: Connection) -> Result<Self, DbError> {
        schema::initialize_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Create a new database manager from a path
    pub async fn new_from_path(path: &str) -> Result<Self, DbError> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DbError::Connection(format!("Failed to open database: {}", e)))?;

        let conn = db
            .connect()
            .map_err(|e| DbError::Connection(format!("Failed to connect to database: {}", e)))?;

        Self::new(conn).await
    }

    /// Execute a custom query with parameters
    pub async fn execute_query<P>(&self, sql: &str, params: P) -> Result<Rows, DbError>
    where
        P: libsql::params::IntoParams,
    {
        self.conn
            .query(sql, params)
            .await
            .map_err(|e| DbError::Query(format!("Failed to execute query: {}", e)))
    }

    /// Run a `SELECT` over the books table and decode every row
    pub async fn query_books(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Book>, DbError> {
        let mut rows = self.execute_query(sql, params).await?;

        let mut books = Vec::new();
        while let Some(row) = rows.next().await? {
            books.push(row_to_book(&row)?);
        }

        Ok(books)
    }

    /// Add a book to the catalogue, returning its ID
    #[instrument(skip(self, book), fields(title = %book.title))]
    pub async fn add_book(&self, book: &NewBook) -> Result<i64, DbError> {
        book.validate(current_year())?;
        let now = Utc::now().timestamp();

        self.conn
            .execute(
                "INSERT INTO books (title, author, isbn, category, tags, description, publish_year,
                 language, location_shelf, cover_image_url, total_copies, available_copies,
                 created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    book.title.trim(),
                    book.author.trim(),
                    book.isbn.clone(),
                    book.category.clone(),
                    book.tags.clone(),
                    book.description.clone(),
                    book.publish_year,
                    book.language.clone(),
                    book.location_shelf.clone(),
                    book.cover_image_url.clone(),
                    book.total_copies,
                    book.available_copies,
                    now,
                    now,
                ],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to add book: {}", e)))?;

        let id = last_insert_id(&self.conn).await?;
        debug!(id, "Added book");
        Ok(id)
    }

    /// Get a book by ID
    pub async fn get_book(&self, id: i64) -> Result<Option<Book>, DbError> {
        let sql = format!("SELECT {} FROM books WHERE id = ?", BOOK_COLUMNS);
        let mut books = self.query_books(&sql, vec![id.into()]).await?;

        Ok(books.pop())
    }

    /// Replace a book's fields. Returns `false` when no such book exists.
    #[instrument(skip(self, book))]
    pub async fn update_book(&self, id: i64, book: &NewBook) -> Result<bool, DbError> {
        book.validate(current_year())?;
        let now = Utc::now().timestamp();

        let changed = self
            .conn
            .execute(
                "UPDATE books SET title = ?, author = ?, isbn = ?, category = ?, tags = ?,
                 description = ?, publish_year = ?, language = ?, location_shelf = ?,
                 cover_image_url = ?, total_copies = ?, available_copies = ?, updated_at = ?
                 WHERE id = ?",
                params![
                    book.title.trim(),
                    book.author.trim(),
                    book.isbn.clone(),
                    book.category.clone(),
                    book.tags.clone(),
                    book.description.clone(),
                    book.publish_year,
                    book.language.clone(),
                    book.location_shelf.clone(),
                    book.cover_image_url.clone(),
                    book.total_copies,
                    book.available_copies,
                    now,
                    id,
                ],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to update book: {}", e)))?;

        Ok(changed > 0)
    }

    /// Delete a book and its loan history.
    ///
    /// Refused while any copy is still on loan.
    #[instrument(skip(self))]
    pub async fn delete_book(&self, id: i64) -> Result<(), DbError> {
        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| DbError::Transaction(format!("Failed to start transaction: {}", e)))?;

        let title = match query_text(&tx, "SELECT title FROM books WHERE id = ?", id).await? {
            Some(title) => title,
            None => return Err(DbError::NotFound(format!("Book {} not found", id))),
        };

        let active = query_integer(
            &tx,
            "SELECT COUNT(*) FROM loans WHERE book_id = ? AND status = 'Borrowed'",
            id,
        )
        .await?
        .unwrap_or(0);
        if active > 0 {
            return Err(DbError::Conflict(format!(
                "Cannot delete '{}': it has active loans. All copies must be returned first.",
                title
            )));
        }

        tx.execute("DELETE FROM loans WHERE book_id = ?", params![id])
            .await
            .map_err(|e| DbError::Query(format!("Failed to delete loans: {}", e)))?;
        tx.execute("DELETE FROM books WHERE id = ?", params![id])
            .await
            .map_err(|e| DbError::Query(format!("Failed to delete book: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| DbError::Transaction(format!("Failed to commit transaction: {}", e)))?;

        info!(id, "Deleted book");
        Ok(())
    }

    /// Distinct categories in alphabetical order
    pub async fn list_categories(&self) -> Result<Vec<String>, DbError> {
        let mut rows = self
            .execute_query(
                "SELECT DISTINCT category FROM books WHERE category IS NOT NULL
                 ORDER BY category",
                params![],
            )
            .await?;

        let mut categories = Vec::new();
        while let Some(row) = rows.next().await? {
            categories.push(
                row.get(0)
                    .map_err(|e| DbError::Data(format!("Failed to get category: {}", e)))?,
            );
        }

        Ok(categories)
    }

    /// Books with at least one copy on the shelf, ordered by title
    pub async fn available_books(&self) -> Result<Vec<Book>, DbError> {
        let sql = format!(
            "SELECT {} FROM books WHERE available_copies > 0 ORDER BY title COLLATE NOCASE",
            BOOK_COLUMNS
        );
        self.query_books(&sql, Vec::new()).await
    }

    /// Browse the catalogue one page at a time
    #[instrument(skip(self))]
    pub async fn browse(&self, query: &BookQuery) -> Result<BookPage, DbError> {
        let mut predicate = Predicate::new();

        if let Some(term) = query.search_term.as_deref().map(str::trim) {
            if !term.is_empty() {
                predicate.any_contains(&["title", "author", "isbn", "category", "tags"], term);
            }
        }
        if let Some(category) = query.category.as_deref().filter(|c| !c.trim().is_empty()) {
            predicate.equals("category", category.to_string());
        }
        if query.available_only {
            predicate.positive("available_copies");
        }
        if let Some(min) = query.publish_year_min {
            predicate.at_least("publish_year", min);
        }
        if let Some(max) = query.publish_year_max {
            predicate.at_most("publish_year", max);
        }

        let page = query.page.max(1);
        let page_size = if query.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            query.page_size
        };

        let count_sql = format!("SELECT COUNT(*) FROM books{}", predicate.where_clause());
        let mut rows = self
            .execute_query(&count_sql, predicate.params().to_vec())
            .await?;
        let total_count: i64 = match rows.next().await? {
            Some(row) => row
                .get(0)
                .map_err(|e| DbError::Data(format!("Failed to get count: {}", e)))?,
            None => 0,
        };

        let sql = format!(
            "SELECT {} FROM books{} ORDER BY title COLLATE NOCASE, id LIMIT ? OFFSET ?",
            BOOK_COLUMNS,
            predicate.where_clause()
        );
        let mut params = predicate.into_params();
        params.push((page_size as i64).into());
        params.push((((page - 1) * page_size) as i64).into());

        let books = self.query_books(&sql, params).await?;

        Ok(BookPage {
            books,
            page,
            page_size,
            total_count: total_count.max(0) as usize,
        })
    }

    /// Lend one copy of a book.
    ///
    /// `due_days` sets the loan period; non-positive or absent values use
    /// [`DEFAULT_LOAN_DAYS`].
    #[instrument(skip(self))]
    pub async fn checkout(
        &self,
        book_id: i64,
        borrower: &str,
        due_days: Option<i64>,
    ) -> Result<Loan, DbError> {
        let borrower = borrower.trim();
        if borrower.is_empty() {
            return Err(DbError::Validation("A borrower is required".to_string()));
        }

        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| DbError::Transaction(format!("Failed to start transaction: {}", e)))?;

        let available = query_integer(
            &tx,
            "SELECT available_copies FROM books WHERE id = ?",
            book_id,
        )
        .await?
        .ok_or_else(|| DbError::NotFound(format!("Book {} not found", book_id)))?;

        if available <= 0 {
            return Err(DbError::Conflict(
                "Book is not available for checkout.".to_string(),
            ));
        }

        let now = Utc::now().timestamp();
        let days = due_days.filter(|d| *d > 0).unwrap_or(DEFAULT_LOAN_DAYS);
        let due_at = now + days * SECONDS_PER_DAY;

        tx.execute(
            "INSERT INTO loans (book_id, borrower, borrowed_at, due_at, returned_at, status)
             VALUES (?, ?, ?, ?, NULL, ?)",
            params![
                book_id,
                borrower,
                now,
                due_at,
                LoanStatus::Borrowed.as_str()
            ],
        )
        .await
        .map_err(|e| DbError::Query(format!("Failed to add loan: {}", e)))?;

        let id = last_insert_id(&tx).await?;

        tx.execute(
            "UPDATE books SET available_copies = available_copies - 1, updated_at = ?
             WHERE id = ?",
            params![now, book_id],
        )
        .await
        .map_err(|e| DbError::Query(format!("Failed to update copies: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| DbError::Transaction(format!("Failed to commit transaction: {}", e)))?;

        info!(loan_id = id, book_id, "Checked out book");
        Ok(Loan {
            id,
            book_id,
            borrower: borrower.to_string(),
            borrowed_at: now,
            due_at,
            returned_at: None,
            status: LoanStatus::Borrowed,
        })
    }

    /// Return a borrowed copy
    #[instrument(skip(self))]
    pub async fn checkin(&self, loan_id: i64) -> Result<Loan, DbError> {
        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| DbError::Transaction(format!("Failed to start transaction: {}", e)))?;

        let loan = {
            let sql = format!("SELECT {} FROM loans WHERE id = ?", LOAN_COLUMNS);
            let mut rows = tx
                .query(&sql, params![loan_id])
                .await
                .map_err(|e| DbError::Query(format!("Failed to get loan: {}", e)))?;
            match rows.next().await? {
                Some(row) => row_to_loan(&row)?,
                None => return Err(DbError::NotFound(format!("Loan {} not found", loan_id))),
            }
        };

        if loan.status == LoanStatus::Returned {
            return Err(DbError::Conflict(
                "This loan has already been returned.".to_string(),
            ));
        }

        let now = Utc::now().timestamp();
        tx.execute(
            "UPDATE loans SET returned_at = ?, status = ? WHERE id = ?",
            params![now, LoanStatus::Returned.as_str(), loan_id],
        )
        .await
        .map_err(|e| DbError::Query(format!("Failed to update loan: {}", e)))?;

        tx.execute(
            "UPDATE books SET available_copies = MIN(available_copies + 1, total_copies),
             updated_at = ? WHERE id = ?",
            params![now, loan.book_id],
        )
        .await
        .map_err(|e| DbError::Query(format!("Failed to update copies: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| DbError::Transaction(format!("Failed to commit transaction: {}", e)))?;

        info!(loan_id, book_id = loan.book_id, "Checked in book");
        Ok(Loan {
            returned_at: Some(now),
            status: LoanStatus::Returned,
            ..loan
        })
    }

    /// Loans, most recent first, optionally restricted to one book
    pub async fn loans(&self, book_id: Option<i64>) -> Result<Vec<Loan>, DbError> {
        let mut rows = match book_id {
            Some(book_id) => {
                let sql = format!(
                    "SELECT {} FROM loans WHERE book_id = ? ORDER BY borrowed_at DESC, id DESC",
                    LOAN_COLUMNS
                );
                self.execute_query(&sql, params![book_id]).await?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM loans ORDER BY borrowed_at DESC, id DESC",
                    LOAN_COLUMNS
                );
                self.execute_query(&sql, params![]).await?
            }
        };

        let mut loans = Vec::new();
        while let Some(row) = rows.next().await? {
            loans.push(row_to_loan(&row)?);
        }

        Ok(loans)
    }
}

fn current_year() -> i64 {
    i64::from(Utc::now().year())
}

/// Fetch the rowid of the last insert on this connection
async fn last_insert_id(conn: &Connection) -> Result<i64, DbError> {
    let mut rows = conn
        .query("SELECT last_insert_rowid()", params![])
        .await
        .map_err(|e| DbError::Query(format!("Failed to get last insert ID: {}", e)))?;

    let row = match rows.next().await {
        Ok(Some(row)) => row,
        Ok(None) => {
            return Err(DbError::Data(
                "No ID returned from last_insert_rowid()".to_string(),
            ));
        }
        Err(e) => return Err(DbError::Data(format!("Failed to get ID: {}", e))),
    };

    row.get(0)
        .map_err(|e| DbError::Data(format!("Failed to get ID: {}", e)))
}

/// First column of the first row as an integer, if any row matched
async fn query_integer(conn: &Connection, sql: &str, id: i64) -> Result<Option<i64>, DbError> {
    let mut rows = conn
        .query(sql, params![id])
        .await
        .map_err(|e| DbError::Query(format!("Failed to execute query: {}", e)))?;

    match rows.next().await? {
        Some(row) => Ok(Some(row.get(0).map_err(|e| {
            DbError::Data(format!("Failed to get value: {}", e))
        })?)),
        None => Ok(None),
    }
}

/// First column of the first row as text, if any row matched
async fn query_text(conn: &Connection, sql: &str, id: i64) -> Result<Option<String>, DbError> {
    let mut rows = conn
        .query(sql, params![id])
        .await
        .map_err(|e| DbError::Query(format!("Failed to execute query: {}", e)))?;

    match rows.next().await? {
        Some(row) => Ok(Some(row.get(0).map_err(|e| {
            DbError::Data(format!("Failed to get value: {}", e))
        })?)),
        None => Ok(None),
    }
}

/// Convert a database row selected with `BOOK_COLUMNS` to a Book
pub(crate) fn row_to_book(row: &Row) -> Result<Book, DbError> {
    let field = |name: &str, e: libsql::Error| DbError::Data(format!("Failed to get {}: {}", name, e));

    Ok(Book {
        id: row.get(0).map_err(|e| field("id", e))?,
        title: row.get(1).map_err(|e| field("title", e))?,
        author: row.get(2).map_err(|e| field("author", e))?,
        isbn: row.get(3).map_err(|e| field("isbn", e))?,
        category: row.get(4).map_err(|e| field("category", e))?,
        tags: row.get(5).map_err(|e| field("tags", e))?,
        description: row.get(6).map_err(|e| field("description", e))?,
        publish_year: row.get(7).map_err(|e| field("publish_year", e))?,
        language: row.get(8).map_err(|e| field("language", e))?,
        location_shelf: row.get(9).map_err(|e| field("location_shelf", e))?,
        cover_image_url: row.get(10).map_err(|e| field("cover_image_url", e))?,
        total_copies: row.get(11).map_err(|e| field("total_copies", e))?,
        available_copies: row.get(12).map_err(|e| field("available_copies", e))?,
        created_at: row.get(13).map_err(|e| field("created_at", e))?,
        updated_at: row.get(14).map_err(|e| field("updated_at", e))?,
    })
}

/// Convert a database row selected with `LOAN_COLUMNS` to a Loan
fn row_to_loan(row: &Row) -> Result<Loan, DbError> {
    let field = |name: &str, e: libsql::Error| DbError::Data(format!("Failed to get {}: {}", name, e));

    let status: String = row.get(6).map_err(|e| field("status", e))?;

    Ok(Loan {
        id: row.get(0).map_err(|e| field("id", e))?,
        book_id: row.get(1).map_err(|e| field("book_id", e))?,
        borrower: row.get(2).map_err(|e| field("borrower", e))?,
        borrowed_at: row.get(3).map_err(|e| field("borrowed_at", e))?,
        due_at: row.get(4).map_err(|e| field("due_at", e))?,
        returned_at: row.get(5).map_err(|e| field("returned_at", e))?,
        status: LoanStatus::parse(&status)
            .ok_or_else(|| DbError::Data(format!("Unknown loan status: {}", status)))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    async fn setup_test_db() -> Result<(Database, tempfile::TempDir), DbError> {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();

        let db = Database::new_from_path(&db_path).await?;

        Ok((db, temp_dir))
    }

    fn book(title: &str, author: &str, category: Option<&str>, year: Option<i64>) -> NewBook {
        let mut book = NewBook::new(title, author);
        book.category = category.map(str::to_string);
        book.publish_year = year;
        book
    }

    #[tokio::test]
    async fn test_database_initialization() {
        let (db, _temp_dir) = setup_test_db().await.unwrap();

        let mut result = db
            .execute_query(
                "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('books', 'loans')",
                params![],
            )
            .await
            .unwrap();

        let mut tables = Vec::new();
        while let Ok(Some(row)) = result.next().await {
            let table_name: String = row.get(0).unwrap();
            tables.push(table_name);
        }

        assert_eq!(tables.len(), 2);
        assert!(tables.contains(&"books".to_string()));
        assert!(tables.contains(&"loans".to_string()));
    }

    #[tokio::test]
    async fn test_add_get_and_update_book() {
        let (db, _temp_dir) = setup_test_db().await.unwrap();

        let mut new_book = book("Clean Code", "Robert C. Martin", Some("Software Engineering"), Some(2008));
        new_book.tags = Some("programming,best-practices".to_string());
        new_book.total_copies = 3;
        new_book.available_copies = 3;

        let id = db.add_book(&new_book).await.unwrap();
        assert!(id > 0);

        let stored = db.get_book(id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Clean Code");
        assert_eq!(stored.author, "Robert C. Martin");
        assert_eq!(stored.category.as_deref(), Some("Software Engineering"));
        assert_eq!(stored.tags.as_deref(), Some("programming,best-practices"));
        assert_eq!(stored.publish_year, Some(2008));
        assert_eq!(stored.isbn, None);
        assert_eq!(stored.available_copies, 3);

        new_book.available_copies = 1;
        assert!(db.update_book(id, &new_book).await.unwrap());
        let updated = db.get_book(id).await.unwrap().unwrap();
        assert_eq!(updated.available_copies, 1);

        assert!(!db.update_book(id + 100, &new_book).await.unwrap());
        assert!(db.get_book(id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_book_rejects_invalid_data() {
        let (db, _temp_dir) = setup_test_db().await.unwrap();

        let mut invalid = NewBook::new("Dune", "Frank Herbert");
        invalid.available_copies = 5;

        let result = db.add_book(&invalid).await;
        assert!(matches!(result, Err(DbError::Validation(_))));
    }

    #[tokio::test]
    async fn test_browse_filters_and_pages() {
        let (db, _temp_dir) = setup_test_db().await.unwrap();

        db.add_book(&book("Salt, Fat, Acid, Heat", "Samin Nosrat", Some("Cooking"), Some(2017)))
            .await
            .unwrap();
        db.add_book(&book("The Food Lab", "J. Kenji López-Alt", Some("Cooking"), Some(2015)))
            .await
            .unwrap();
        db.add_book(&book("Deep Work", "Cal Newport", Some("Productivity"), Some(2016)))
            .await
            .unwrap();
        let mut unavailable = book("Ottolenghi Simple", "Yotam Ottolenghi", Some("Cooking"), Some(2018));
        unavailable.available_copies = 0;
        db.add_book(&unavailable).await.unwrap();

        let cooking = db
            .browse(&BookQuery {
                category: Some("Cooking".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(cooking.total_count, 3);
        assert_eq!(cooking.books[0].title, "Ottolenghi Simple");

        let available = db
            .browse(&BookQuery {
                category: Some("Cooking".to_string()),
                available_only: true,
                publish_year_min: Some(2016),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(available.total_count, 1);
        assert_eq!(available.books[0].title, "Salt, Fat, Acid, Heat");

        let by_term = db
            .browse(&BookQuery {
                search_term: Some("newport".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_term.total_count, 1);
        assert_eq!(by_term.books[0].title, "Deep Work");

        let second_page = db
            .browse(&BookQuery {
                page: 2,
                page_size: 3,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(second_page.total_count, 4);
        assert_eq!(second_page.total_pages(), 2);
        assert_eq!(second_page.books.len(), 1);
        assert_eq!(second_page.books[0].title, "The Food Lab");
    }

    #[tokio::test]
    async fn test_list_categories_and_available_books() {
        let (db, _temp_dir) = setup_test_db().await.unwrap();

        db.add_book(&book("Dune", "Frank Herbert", Some("Science Fiction"), None))
            .await
            .unwrap();
        db.add_book(&book("Atomic Habits", "James Clear", Some("Productivity"), None))
            .await
            .unwrap();
        let mut gone = book("Deep Work", "Cal Newport", Some("Productivity"), None);
        gone.available_copies = 0;
        db.add_book(&gone).await.unwrap();
        db.add_book(&book("Untitled", "Anonymous", None, None))
            .await
            .unwrap();

        let categories = db.list_categories().await.unwrap();
        assert_eq!(categories, vec!["Productivity", "Science Fiction"]);

        let available: Vec<String> = db
            .available_books()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(available, vec!["Atomic Habits", "Dune", "Untitled"]);
    }

    #[tokio::test]
    async fn test_checkout_and_checkin() {
        let (db, _temp_dir) = setup_test_db().await.unwrap();

        let id = db
            .add_book(&NewBook::new("Dune", "Frank Herbert"))
            .await
            .unwrap();

        let loan = db.checkout(id, "patron-1", None).await.unwrap();
        assert_eq!(loan.status, LoanStatus::Borrowed);
        assert_eq!(loan.due_at - loan.borrowed_at, DEFAULT_LOAN_DAYS * SECONDS_PER_DAY);
        assert_eq!(db.get_book(id).await.unwrap().unwrap().available_copies, 0);

        let second = db.checkout(id, "patron-2", Some(7)).await;
        assert!(matches!(second, Err(DbError::Conflict(_))));

        let returned = db.checkin(loan.id).await.unwrap();
        assert_eq!(returned.status, LoanStatus::Returned);
        assert!(returned.returned_at.is_some());
        assert_eq!(db.get_book(id).await.unwrap().unwrap().available_copies, 1);

        let again = db.checkin(loan.id).await;
        assert!(matches!(again, Err(DbError::Conflict(_))));

        let loans = db.loans(Some(id)).await.unwrap();
        assert_eq!(loans.len(), 1);
        assert_eq!(loans[0].status, LoanStatus::Returned);
    }

    #[tokio::test]
    async fn test_checkout_missing_book_and_checkin_missing_loan() {
        let (db, _temp_dir) = setup_test_db().await.unwrap();

        assert!(matches!(
            db.checkout(42, "patron-1", None).await,
            Err(DbError::NotFound(_))
        ));
        assert!(matches!(db.checkin(42).await, Err(DbError::NotFound(_))));
        assert!(matches!(
            db.checkout(42, "  ", None).await,
            Err(DbError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_book_blocked_by_active_loan() {
        let (db, _temp_dir) = setup_test_db().await.unwrap();

        let id = db
            .add_book(&NewBook::new("Dune", "Frank Herbert"))
            .await
            .unwrap();
        let loan = db.checkout(id, "patron-1", None).await.unwrap();

        assert!(matches!(db.delete_book(id).await, Err(DbError::Conflict(_))));

        db.checkin(loan.id).await.unwrap();
        db.delete_book(id).await.unwrap();

        assert!(db.get_book(id).await.unwrap().is_none());
        assert!(db.loans(Some(id)).await.unwrap().is_empty());
        assert!(matches!(db.delete_book(id).await, Err(DbError::NotFound(_))));
    }
}
