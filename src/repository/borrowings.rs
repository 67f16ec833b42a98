//! Borrowings repository for database operations
//!
//! Every operation that changes whether a loan is active also changes the
//! book's `available_copies`. Both writes share one transaction, and the
//! book row is taken with `FOR UPDATE` before the availability check so that
//! concurrent loans of the same book are serialized.

use chrono::Utc;
use sqlx::{PgConnection, PgExecutor, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        borrowing::{
            ensure_lendable, unknown_reference, Borrowing, BorrowingDetails, BorrowingOrdering,
            BorrowingQuery, BorrowingStatus, CreateBorrowing, Transition, UpdateBorrowing,
        },
    },
};

const DETAILS_SELECT: &str = r#"
    SELECT br.id, br.book_id, b.title AS book_title, br.member_id, m.first_name AS member_name,
           br.borrow_date, br.return_date, br.status, br.due_date
    FROM borrowings br
    JOIN books b ON b.id = br.book_id
    JOIN members m ON m.id = br.member_id
"#;

#[derive(Clone)]
pub struct BorrowingsRepository {
    pool: Pool<Postgres>,
}

impl BorrowingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List borrowings filtered by member, book and status
    pub async fn list(&self, query: &BorrowingQuery) -> AppResult<Vec<BorrowingDetails>> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.member_id.is_some() {
            conditions.push(format!("br.member_id = ${}", idx));
            idx += 1;
        }
        if query.book_id.is_some() {
            conditions.push(format!("br.book_id = ${}", idx));
            idx += 1;
        }
        if query.status.is_some() {
            conditions.push(format!("br.status = ${}", idx));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let ordering = BorrowingOrdering::parse(query.ordering.as_deref());
        let sql = format!("{} {} ORDER BY {}", DETAILS_SELECT, where_clause, ordering.order_by());

        let mut builder = sqlx::query_as::<_, BorrowingDetails>(&sql);
        if let Some(member_id) = query.member_id {
            builder = builder.bind(member_id);
        }
        if let Some(book_id) = query.book_id {
            builder = builder.bind(book_id);
        }
        if let Some(status) = query.status {
            builder = builder.bind(status);
        }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Get borrowing details by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<BorrowingDetails> {
        fetch_details(&self.pool, id).await
    }

    /// Open a new active loan, taking one copy of the book
    pub async fn create(&self, data: &CreateBorrowing) -> AppResult<BorrowingDetails> {
        let mut tx = self.pool.begin().await?;

        let book = lock_book(&mut tx, data.book)
            .await?
            .ok_or_else(|| unknown_reference("book", data.book))?;

        if !member_exists(&mut *tx, data.member).await? {
            return Err(unknown_reference("member", data.member));
        }

        let duplicate = has_active_loan(&mut *tx, data.book, data.member, None).await?;
        ensure_lendable(&book, duplicate)?;

        adjust_available_copies(&mut tx, book.id, -1).await?;

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO borrowings (book_id, member_id, borrow_date, status, due_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(data.book)
        .bind(data.member)
        .bind(Utc::now())
        .bind(BorrowingStatus::Active)
        .bind(data.due_date)
        .fetch_one(&mut *tx)
        .await?;

        let details = fetch_details(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(details)
    }

    /// Close an active loan and give the copy back
    pub async fn return_book(&self, id: i32) -> AppResult<BorrowingDetails> {
        let mut tx = self.pool.begin().await?;

        let borrowing = lock_borrowing(&mut tx, id).await?;
        if borrowing.status == BorrowingStatus::Returned {
            return Err(AppError::BadRequest(
                "This book has already been returned.".to_string(),
            ));
        }

        lock_book(&mut tx, borrowing.book_id).await?;
        adjust_available_copies(&mut tx, borrowing.book_id, 1).await?;

        sqlx::query(
            "UPDATE borrowings SET status = $1, return_date = COALESCE(return_date, $2) WHERE id = $3",
        )
        .bind(BorrowingStatus::Returned)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let details = fetch_details(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(details)
    }

    /// Update a borrowing.
    ///
    /// - `status: RETURNED` on an active loan closes it like `return_book`.
    /// - Changing the book of an active loan moves the copy: the old book gets
    ///   it back, the new one must have a copy available.
    /// - Changing book or member of an active loan re-checks the duplicate guard.
    pub async fn update(&self, id: i32, patch: &UpdateBorrowing) -> AppResult<BorrowingDetails> {
        let mut tx = self.pool.begin().await?;

        let current = lock_borrowing(&mut tx, id).await?;

        let book_id = patch.book.unwrap_or(current.book_id);
        let member_id = patch.member.unwrap_or(current.member_id);
        let status = patch.status.unwrap_or(current.status);
        let due_date = match patch.due_date {
            Some(due_date) => due_date,
            None => current.due_date,
        };

        let transition = current.status.transition(status)?;
        let book_changed = book_id != current.book_id;
        let member_changed = member_id != current.member_id;

        if member_changed && !member_exists(&mut *tx, member_id).await? {
            return Err(unknown_reference("member", member_id));
        }

        let mut return_date = current.return_date;

        match (current.status, transition) {
            (BorrowingStatus::Active, Transition::Close) => {
                if book_changed {
                    return Err(AppError::field(
                        "book",
                        "The book cannot be changed while the borrowing is being returned.",
                    ));
                }
                lock_book(&mut tx, current.book_id).await?;
                adjust_available_copies(&mut tx, current.book_id, 1).await?;
                return_date = Some(return_date.unwrap_or_else(Utc::now));
            }
            (BorrowingStatus::Active, _) if book_changed => {
                let books = lock_books(&mut tx, &[current.book_id, book_id]).await?;
                let new_book = books
                    .iter()
                    .find(|b| b.id == book_id)
                    .ok_or_else(|| unknown_reference("book", book_id))?;

                let duplicate = has_active_loan(&mut *tx, book_id, member_id, Some(id)).await?;
                ensure_lendable(new_book, duplicate)?;

                adjust_available_copies(&mut tx, current.book_id, 1).await?;
                adjust_available_copies(&mut tx, book_id, -1).await?;
            }
            (BorrowingStatus::Active, _) if member_changed => {
                if has_active_loan(&mut *tx, book_id, member_id, Some(id)).await? {
                    return Err(AppError::non_field(
                        "This member already has an active borrowing of this book.",
                    ));
                }
            }
            _ => {
                if book_changed && !book_exists(&mut *tx, book_id).await? {
                    return Err(unknown_reference("book", book_id));
                }
            }
        }

        sqlx::query(
            r#"
            UPDATE borrowings
            SET book_id = $1, member_id = $2, status = $3, return_date = $4, due_date = $5
            WHERE id = $6
            "#,
        )
        .bind(book_id)
        .bind(member_id)
        .bind(status)
        .bind(return_date)
        .bind(due_date)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let details = fetch_details(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(details)
    }

    /// Delete a borrowing; an active one gives its copy back first
    pub async fn delete(&self, id: i32) -> AppResult<BorrowingStatus> {
        let mut tx = self.pool.begin().await?;

        let borrowing = lock_borrowing(&mut tx, id).await?;
        if borrowing.status == BorrowingStatus::Active {
            lock_book(&mut tx, borrowing.book_id).await?;
            adjust_available_copies(&mut tx, borrowing.book_id, 1).await?;
        }

        sqlx::query("DELETE FROM borrowings WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(borrowing.status)
    }
}

async fn fetch_details<'e, E>(executor: E, id: i32) -> AppResult<BorrowingDetails>
where
    E: PgExecutor<'e>,
{
    let sql = format!("{} WHERE br.id = $1", DETAILS_SELECT);
    sqlx::query_as::<_, BorrowingDetails>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))
}

async fn lock_borrowing(conn: &mut PgConnection, id: i32) -> AppResult<Borrowing> {
    sqlx::query_as::<_, Borrowing>("SELECT * FROM borrowings WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))
}

async fn lock_book(conn: &mut PgConnection, id: i32) -> AppResult<Option<Book>> {
    let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(book)
}

/// Lock several books in ascending id order
async fn lock_books(conn: &mut PgConnection, ids: &[i32]) -> AppResult<Vec<Book>> {
    let books = sqlx::query_as::<_, Book>(
        "SELECT * FROM books WHERE id = ANY($1) ORDER BY id FOR UPDATE",
    )
    .bind(ids)
    .fetch_all(conn)
    .await?;
    Ok(books)
}

async fn adjust_available_copies(conn: &mut PgConnection, book_id: i32, delta: i32) -> AppResult<()> {
    sqlx::query(
        "UPDATE books SET available_copies = available_copies + $1, updated_at = $2 WHERE id = $3",
    )
    .bind(delta)
    .bind(Utc::now())
    .bind(book_id)
    .execute(conn)
    .await?;
    Ok(())
}

async fn book_exists<'e, E>(executor: E, id: i32) -> AppResult<bool>
where
    E: PgExecutor<'e>,
{
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
        .bind(id)
        .fetch_one(executor)
        .await?;
    Ok(exists)
}

async fn member_exists<'e, E>(executor: E, id: i32) -> AppResult<bool>
where
    E: PgExecutor<'e>,
{
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM members WHERE id = $1)")
        .bind(id)
        .fetch_one(executor)
        .await?;
    Ok(exists)
}

/// Whether `member_id` already holds an active loan of `book_id` (other than `exclude_id`)
async fn has_active_loan<'e, E>(
    executor: E,
    book_id: i32,
    member_id: i32,
    exclude_id: Option<i32>,
) -> AppResult<bool>
where
    E: PgExecutor<'e>,
{
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM borrowings
            WHERE book_id = $1 AND member_id = $2 AND status = 'ACTIVE'
              AND ($3::int IS NULL OR id <> $3)
        )
        "#,
    )
    .bind(book_id)
    .bind(member_id)
    .bind(exclude_id)
    .fetch_one(executor)
    .await?;
    Ok(exists)
}
