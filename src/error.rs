//! Error types for the library server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Field name -> messages, rendered as the `errors` object of a 400 envelope
pub type FieldErrors = IndexMap<String, Vec<String>>;

/// Key used for validation failures not tied to a single field
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0:?}")]
    Validation(FieldErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Validation error attached to a single field
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        AppError::Validation(errors)
    }

    /// Validation error that concerns the record as a whole
    pub fn non_field(message: impl Into<String>) -> Self {
        Self::field(NON_FIELD_ERRORS, message)
    }

    fn status_and_errors(&self) -> (StatusCode, Value) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, detail(msg)),
            AppError::Validation(fields) => (StatusCode::BAD_REQUEST, json!(fields)),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, detail(msg)),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, detail(msg)),
            AppError::Database(e) => match constraint_violation(e) {
                Some(mapped) => mapped.status_and_errors(),
                None => {
                    tracing::error!("Database error: {:?}", e);
                    (StatusCode::INTERNAL_SERVER_ERROR, detail("Database error"))
                }
            },
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, detail("Internal server error"))
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<(String, Vec<String>)> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| match &e.message {
                        Some(msg) => msg.to_string(),
                        None => format!("Invalid value ({})", e.code),
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        AppError::Validation(fields.into_iter().collect())
    }
}

fn detail(msg: &str) -> Value {
    json!({ "detail": msg })
}

/// Map Postgres constraint violations that slipped past the explicit checks
/// (e.g. two concurrent inserts of the same ISBN) to client errors.
fn constraint_violation(e: &sqlx::Error) -> Option<AppError> {
    let db = e.as_database_error()?;
    match db.code().as_deref() {
        // unique_violation
        Some("23505") => Some(match db.constraint() {
            Some("books_isbn_key") => AppError::field("isbn", "book with this isbn already exists."),
            Some("members_email_key") => {
                AppError::field("email", "member with this email already exists.")
            }
            Some("borrowings_one_active_loan_idx") => {
                AppError::non_field("This member already has an active borrowing of this book.")
            }
            _ => AppError::non_field("Duplicate record."),
        }),
        // foreign_key_violation
        Some("23503") => Some(AppError::Conflict(
            "Record is referenced by existing borrowings.".to_string(),
        )),
        // check_violation
        Some("23514") => Some(AppError::non_field(
            "Available copies must be between 0 and total copies.",
        )),
        _ => None,
    }
}

/// Error envelope body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Always "error"
    pub status: String,
    /// HTTP status code
    pub code: u16,
    pub message: String,
    /// Field map (`{"isbn": ["..."]}`) or `{"detail": "..."}`
    #[schema(value_type = Object)]
    pub errors: Value,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, errors) = self.status_and_errors();

        let message = if status == StatusCode::BAD_REQUEST {
            "Request validation failed"
        } else {
            "An error occurred"
        };

        let body = Json(ErrorResponse {
            status: "error".to_string(),
            code: status.as_u16(),
            message: message.to_string(),
            errors,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
