//! Borrowing (loan) model and lifecycle rules
//!
//! A borrowing is opened in `ACTIVE` status, taking one copy of its book, and
//! closed exactly once into `RETURNED`, giving the copy back. The functions
//! here decide whether a transition is allowed; the repository applies the
//! status change and the copy counter change in one transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::book::Book;
use crate::error::{AppError, AppResult};

/// Loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "borrowing_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum BorrowingStatus {
    Active,
    Returned,
}

/// Effect of a requested status change on the book inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Status stays as it is
    Unchanged,
    /// ACTIVE -> RETURNED: the copy goes back on the shelf
    Close,
}

impl BorrowingStatus {
    /// Validate moving from `self` to `next`. RETURNED is terminal.
    pub fn transition(self, next: BorrowingStatus) -> AppResult<Transition> {
        match (self, next) {
            (BorrowingStatus::Active, BorrowingStatus::Returned) => Ok(Transition::Close),
            (BorrowingStatus::Returned, BorrowingStatus::Active) => Err(AppError::field(
                "status",
                "A returned borrowing cannot be reopened.",
            )),
            _ => Ok(Transition::Unchanged),
        }
    }
}

/// Borrowing row as stored
#[derive(Debug, Clone, FromRow)]
pub struct Borrowing {
    pub id: i32,
    pub book_id: i32,
    pub member_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: BorrowingStatus,
    pub due_date: Option<DateTime<Utc>>,
}

/// Borrowing as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowingDetails {
    pub id: i32,
    /// Book ID
    #[serde(rename = "book")]
    pub book_id: i32,
    pub book_title: String,
    /// Member ID
    #[serde(rename = "member")]
    pub member_id: i32,
    /// Member first name
    pub member_name: String,
    pub borrow_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: BorrowingStatus,
    /// Informational only, never enforced
    pub due_date: Option<DateTime<Utc>>,
}

/// Create borrowing request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateBorrowing {
    /// Book ID
    #[serde(alias = "book_id")]
    pub book: i32,
    /// Member ID
    #[serde(alias = "member_id")]
    pub member: i32,
    pub due_date: Option<DateTime<Utc>>,
}

/// Full replacement request (`PUT`)
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReplaceBorrowing {
    #[serde(alias = "book_id")]
    pub book: i32,
    #[serde(alias = "member_id")]
    pub member: i32,
    #[serde(default)]
    pub status: Option<BorrowingStatus>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update request (`PATCH`)
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateBorrowing {
    #[serde(alias = "book_id")]
    pub book: Option<i32>,
    #[serde(alias = "member_id")]
    pub member: Option<i32>,
    pub status: Option<BorrowingStatus>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl From<ReplaceBorrowing> for UpdateBorrowing {
    fn from(data: ReplaceBorrowing) -> Self {
        Self {
            book: Some(data.book),
            member: Some(data.member),
            status: data.status,
            due_date: Some(data.due_date),
        }
    }
}

/// Borrowing list query parameters, combined with AND
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BorrowingQuery {
    pub member_id: Option<i32>,
    pub book_id: Option<i32>,
    pub status: Option<BorrowingStatus>,
    /// `borrow_date` or `status`, prefix with `-` for descending (default `-borrow_date`)
    pub ordering: Option<String>,
}

/// Sort orders accepted by `?ordering=`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowingOrdering {
    BorrowDateAsc,
    BorrowDateDesc,
    StatusAsc,
    StatusDesc,
}

impl BorrowingOrdering {
    /// Unknown values fall back to the default ordering
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("borrow_date") => BorrowingOrdering::BorrowDateAsc,
            Some("status") => BorrowingOrdering::StatusAsc,
            Some("-status") => BorrowingOrdering::StatusDesc,
            _ => BorrowingOrdering::BorrowDateDesc,
        }
    }

    /// ORDER BY clause over the `br` (borrowings) alias
    pub fn order_by(self) -> &'static str {
        match self {
            BorrowingOrdering::BorrowDateAsc => "br.borrow_date ASC, br.id DESC",
            BorrowingOrdering::BorrowDateDesc => "br.borrow_date DESC, br.id DESC",
            BorrowingOrdering::StatusAsc => "br.status ASC, br.id DESC",
            BorrowingOrdering::StatusDesc => "br.status DESC, br.id DESC",
        }
    }
}

/// Check that `book` may be lent out to a member.
///
/// The duplicate-loan guard is checked first so that a member asking twice for
/// the last copy gets the duplicate error rather than "not available".
pub fn ensure_lendable(book: &Book, member_has_active_loan: bool) -> AppResult<()> {
    if member_has_active_loan {
        return Err(AppError::non_field(
            "This member already has an active borrowing of this book.",
        ));
    }
    if book.available_copies < 1 {
        return Err(AppError::field(
            "book",
            format!("Book '{}' is not currently available.", book.title),
        ));
    }
    Ok(())
}

/// Error for a borrowing referencing a record that does not exist
pub fn unknown_reference(field: &str, id: i32) -> AppError {
    AppError::field(field, format!("Invalid pk \"{}\" - object does not exist.", id))
}
