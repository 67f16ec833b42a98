//! Data models for the library

pub mod book;
pub mod borrowing;
pub mod member;

// Re-export commonly used types
pub use book::Book;
pub use borrowing::{Borrowing, BorrowingDetails, BorrowingStatus};
pub use member::Member;
