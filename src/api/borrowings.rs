//! Borrowing (loan) endpoints

use axum::{extract::State, http::StatusCode};

use super::{
    extract::{AppJson, AppPath, AppQuery},
    response::ApiResponse,
};
use crate::{
    error::AppResult,
    models::borrowing::{
        BorrowingDetails, BorrowingQuery, CreateBorrowing, ReplaceBorrowing, UpdateBorrowing,
    },
    AppState,
};

/// List borrowings
#[utoipa::path(
    get,
    path = "/borrowings",
    tag = "borrowings",
    params(BorrowingQuery),
    responses(
        (status = 200, description = "Borrowings, most recent first by default", body = Vec<BorrowingDetails>),
        (status = 400, description = "Invalid filter", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_borrowings(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<BorrowingQuery>,
) -> AppResult<ApiResponse<Vec<BorrowingDetails>>> {
    let borrowings = state.services.borrowings.list(&query).await?;
    Ok(ApiResponse::ok(borrowings))
}

/// Get borrowing by ID
#[utoipa::path(
    get,
    path = "/borrowings/{id}",
    tag = "borrowings",
    params(("id" = i32, Path, description = "Borrowing ID")),
    responses(
        (status = 200, description = "Borrowing details", body = BorrowingDetails),
        (status = 404, description = "Borrowing not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_borrowing(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> AppResult<ApiResponse<BorrowingDetails>> {
    let borrowing = state.services.borrowings.get_by_id(id).await?;
    Ok(ApiResponse::ok(borrowing))
}

/// Lend a book to a member
#[utoipa::path(
    post,
    path = "/borrowings",
    tag = "borrowings",
    request_body = CreateBorrowing,
    responses(
        (status = 201, description = "Borrowing created, one copy taken", body = BorrowingDetails),
        (status = 400, description = "Book unavailable, duplicate active loan or unknown reference", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_borrowing(
    State(state): State<AppState>,
    AppJson(data): AppJson<CreateBorrowing>,
) -> AppResult<ApiResponse<BorrowingDetails>> {
    let borrowing = state.services.borrowings.create(&data).await?;
    Ok(ApiResponse::created(borrowing))
}

/// Replace a borrowing
#[utoipa::path(
    put,
    path = "/borrowings/{id}",
    tag = "borrowings",
    params(("id" = i32, Path, description = "Borrowing ID")),
    request_body = ReplaceBorrowing,
    responses(
        (status = 200, description = "Borrowing updated", body = BorrowingDetails),
        (status = 400, description = "Invalid change", body = crate::error::ErrorResponse),
        (status = 404, description = "Borrowing not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn replace_borrowing(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(data): AppJson<ReplaceBorrowing>,
) -> AppResult<ApiResponse<BorrowingDetails>> {
    let borrowing = state.services.borrowings.replace(id, data).await?;
    Ok(ApiResponse::ok(borrowing))
}

/// Partially update a borrowing
#[utoipa::path(
    patch,
    path = "/borrowings/{id}",
    tag = "borrowings",
    params(("id" = i32, Path, description = "Borrowing ID")),
    request_body = UpdateBorrowing,
    responses(
        (status = 200, description = "Borrowing updated", body = BorrowingDetails),
        (status = 400, description = "Invalid change", body = crate::error::ErrorResponse),
        (status = 404, description = "Borrowing not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_borrowing(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(data): AppJson<UpdateBorrowing>,
) -> AppResult<ApiResponse<BorrowingDetails>> {
    let borrowing = state.services.borrowings.update(id, &data).await?;
    Ok(ApiResponse::ok(borrowing))
}

/// Delete a borrowing
#[utoipa::path(
    delete,
    path = "/borrowings/{id}",
    tag = "borrowings",
    params(("id" = i32, Path, description = "Borrowing ID")),
    responses(
        (status = 204, description = "Borrowing deleted"),
        (status = 404, description = "Borrowing not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_borrowing(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> AppResult<StatusCode> {
    state.services.borrowings.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/borrowings/{id}/return_book",
    tag = "borrowings",
    params(("id" = i32, Path, description = "Borrowing ID")),
    responses(
        (status = 200, description = "Book returned, one copy given back", body = BorrowingDetails),
        (status = 400, description = "Already returned", body = crate::error::ErrorResponse),
        (status = 404, description = "Borrowing not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> AppResult<ApiResponse<BorrowingDetails>> {
    let borrowing = state.services.borrowings.return_book(id).await?;
    Ok(ApiResponse::ok(borrowing))
}
