//! Library Management Server
//!
//! A REST JSON API tracking books, members and the borrowings between them.
//! Lending a book takes one of its available copies and returning it gives the
//! copy back; both happen in the same transaction as the status change.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
