//! Books repository for database operations

use chrono::Utc;
use sqlx::{PgExecutor, Pool, Postgres};

use super::{search_clause, search_patterns};
use crate::{
    error::{AppError, AppResult},
    models::book::{check_copies, check_outstanding, Book, CreateBook, UpdateBook},
};

const SEARCH_COLUMNS: &[&str] = &["title", "author", "isbn"];

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List books ordered by title, optionally filtered by `?search=`
    pub async fn list(&self, search: Option<&str>) -> AppResult<Vec<Book>> {
        let patterns = search.map(search_patterns).unwrap_or_default();

        let query = format!(
            "SELECT * FROM books {} ORDER BY title, id",
            search_clause(SEARCH_COLUMNS, patterns.len())
        );

        let mut builder = sqlx::query_as::<_, Book>(&query);
        for pattern in &patterns {
            builder = builder.bind(pattern);
        }

        let books = builder.fetch_all(&self.pool).await?;
        Ok(books)
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Create a new book
    pub async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        check_copies(data.total_copies, data.available_copies)?;

        if isbn_taken(&self.pool, &data.isbn, None).await? {
            return Err(duplicate_isbn());
        }

        let now = Utc::now();

        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, isbn, publisher, total_copies, available_copies, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(&data.author)
        .bind(&data.isbn)
        .bind(&data.publisher)
        .bind(data.total_copies)
        .bind(data.available_copies)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(book)
    }

    /// Update a book.
    ///
    /// The row is locked while the patch is merged so that a concurrent loan
    /// cannot change `available_copies` between the invariant checks and the write.
    /// Counter changes must leave room for every copy still on loan.
    pub async fn update(&self, id: i32, patch: &UpdateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let mut book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        book.apply(patch)?;

        if patch.total_copies.is_some() || patch.available_copies.is_some() {
            let active_loans: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM borrowings WHERE book_id = $1 AND status = 'ACTIVE'",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
            check_outstanding(book.total_copies, book.available_copies, active_loans)?;
        }

        if patch.isbn.is_some() && isbn_taken(&mut *tx, &book.isbn, Some(id)).await? {
            return Err(duplicate_isbn());
        }

        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = $1, author = $2, isbn = $3, publisher = $4,
                total_copies = $5, available_copies = $6, updated_at = $7
            WHERE id = $8
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(book.total_copies)
        .bind(book.available_copies)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(book)
    }

    /// Delete a book. Refused while any borrowing references it.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let referenced: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM borrowings WHERE book_id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if referenced {
            return Err(AppError::Conflict(format!(
                "Book with id {} has borrowings and cannot be deleted",
                id
            )));
        }

        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }
}

/// Check if an ISBN is already used by another book
async fn isbn_taken<'e, E>(executor: E, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool>
where
    E: PgExecutor<'e>,
{
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND ($2::int IS NULL OR id <> $2))",
    )
    .bind(isbn)
    .bind(exclude_id)
    .fetch_one(executor)
    .await?;
    Ok(exists)
}

fn duplicate_isbn() -> AppError {
    AppError::field("isbn", "book with this isbn already exists.")
}
