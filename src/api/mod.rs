//! API handlers for the library REST endpoints

pub mod books;
pub mod borrowings;
pub mod extract;
pub mod health;
pub mod members;
pub mod openapi;
pub mod response;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, AppState};

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::replace_book)
                .patch(books::update_book)
                .delete(books::delete_book),
        )
        // Members
        .route("/members", get(members::list_members).post(members::create_member))
        .route(
            "/members/:id",
            get(members::get_member)
                .put(members::replace_member)
                .patch(members::update_member)
                .delete(members::delete_member),
        )
        // Borrowings
        .route(
            "/borrowings",
            get(borrowings::list_borrowings).post(borrowings::create_borrowing),
        )
        .route(
            "/borrowings/:id",
            get(borrowings::get_borrowing)
                .put(borrowings::replace_borrowing)
                .patch(borrowings::update_borrowing)
                .delete(borrowings::delete_borrowing),
        )
        .route("/borrowings/:id/return_book", post(borrowings::return_book))
        .with_state(state);

    // OpenAPI documentation
    let openapi = openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Enveloped 404 for unknown routes
async fn not_found() -> AppError {
    AppError::NotFound("Not found.".to_string())
}
