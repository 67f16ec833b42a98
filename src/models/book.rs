//! Book model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Book record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    /// 13 character ISBN, unique across the catalog
    pub isbn: String,
    pub publisher: String,
    pub total_copies: i32,
    /// Copies not currently on loan
    pub available_copies: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_copies() -> i32 {
    1
}

/// Create book request (also the body of a full `PUT`)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 255, message = "Author must be between 1 and 255 characters"))]
    pub author: String,
    #[validate(length(min = 1, max = 13, message = "ISBN must be between 1 and 13 characters"))]
    pub isbn: String,
    #[serde(default)]
    #[validate(length(max = 255, message = "Publisher must be at most 255 characters"))]
    pub publisher: String,
    #[serde(default = "default_copies")]
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub total_copies: i32,
    #[serde(default = "default_copies")]
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub available_copies: i32,
}

/// Partial update request (`PATCH`)
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Author must be between 1 and 255 characters"))]
    pub author: Option<String>,
    #[validate(length(min = 1, max = 13, message = "ISBN must be between 1 and 13 characters"))]
    pub isbn: Option<String>,
    #[validate(length(max = 255, message = "Publisher must be at most 255 characters"))]
    pub publisher: Option<String>,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub total_copies: Option<i32>,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub available_copies: Option<i32>,
}

/// Full update request (`PUT`)
///
/// Omitted optional fields keep their stored value; the copy counters are
/// never reset to their creation defaults.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReplaceBook {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 255, message = "Author must be between 1 and 255 characters"))]
    pub author: String,
    #[validate(length(min = 1, max = 13, message = "ISBN must be between 1 and 13 characters"))]
    pub isbn: String,
    #[validate(length(max = 255, message = "Publisher must be at most 255 characters"))]
    pub publisher: Option<String>,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub total_copies: Option<i32>,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub available_copies: Option<i32>,
}

impl From<ReplaceBook> for UpdateBook {
    fn from(data: ReplaceBook) -> Self {
        Self {
            title: Some(data.title),
            author: Some(data.author),
            isbn: Some(data.isbn),
            publisher: data.publisher,
            total_copies: data.total_copies,
            available_copies: data.available_copies,
        }
    }
}

/// Book list query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Terms matched against title, author and ISBN
    pub search: Option<String>,
}

/// Enforce `available_copies <= total_copies`
pub fn check_copies(total_copies: i32, available_copies: i32) -> AppResult<()> {
    if available_copies > total_copies {
        return Err(AppError::non_field(
            "Available copies cannot exceed total copies.",
        ));
    }
    Ok(())
}

/// Copies currently on loan must stay accounted for: `total - available >= active_loans`
pub fn check_outstanding(total_copies: i32, available_copies: i32, active_loans: i64) -> AppResult<()> {
    if i64::from(total_copies - available_copies) < active_loans {
        return Err(AppError::non_field(format!(
            "Total copies minus available copies cannot be less than the {} copies on loan.",
            active_loans
        )));
    }
    Ok(())
}

impl Book {
    /// Merge a partial update into this record, then re-check the copies invariant
    pub fn apply(&mut self, patch: &UpdateBook) -> AppResult<()> {
        if let Some(ref title) = patch.title {
            self.title = title.clone();
        }
        if let Some(ref author) = patch.author {
            self.author = author.clone();
        }
        if let Some(ref isbn) = patch.isbn {
            self.isbn = isbn.clone();
        }
        if let Some(ref publisher) = patch.publisher {
            self.publisher = publisher.clone();
        }
        if let Some(total) = patch.total_copies {
            self.total_copies = total;
        }
        if let Some(available) = patch.available_copies {
            self.available_copies = available;
        }
        check_copies(self.total_copies, self.available_copies)
    }
}
