//! Borrowing (loan) service

use crate::{
    error::AppResult,
    models::borrowing::{
        BorrowingDetails, BorrowingQuery, BorrowingStatus, CreateBorrowing, ReplaceBorrowing,
        UpdateBorrowing,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct BorrowingsService {
    repository: Repository,
}

impl BorrowingsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List borrowings, most recent first unless `ordering` says otherwise
    pub async fn list(&self, query: &BorrowingQuery) -> AppResult<Vec<BorrowingDetails>> {
        tracing::debug!(
            "Listing borrowings (member: {:?}, book: {:?}, status: {:?})",
            query.member_id,
            query.book_id,
            query.status
        );
        self.repository.borrowings.list(query).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<BorrowingDetails> {
        self.repository.borrowings.get_by_id(id).await
    }

    /// Lend a book to a member
    pub async fn create(&self, data: &CreateBorrowing) -> AppResult<BorrowingDetails> {
        let borrowing = self.repository.borrowings.create(data).await?;
        tracing::info!(
            "Borrowing {} created: book {} lent to member {}",
            borrowing.id,
            borrowing.book_id,
            borrowing.member_id
        );
        Ok(borrowing)
    }

    /// Mark a borrowing as returned
    pub async fn return_book(&self, id: i32) -> AppResult<BorrowingDetails> {
        let borrowing = self.repository.borrowings.return_book(id).await?;
        tracing::info!("Borrowing {} returned: book {}", borrowing.id, borrowing.book_id);
        Ok(borrowing)
    }

    pub async fn update(&self, id: i32, data: &UpdateBorrowing) -> AppResult<BorrowingDetails> {
        let borrowing = self.repository.borrowings.update(id, data).await?;
        tracing::info!(
            "Borrowing {} updated: book {}, member {}, status {:?}",
            borrowing.id,
            borrowing.book_id,
            borrowing.member_id,
            borrowing.status
        );
        Ok(borrowing)
    }

    pub async fn replace(&self, id: i32, data: ReplaceBorrowing) -> AppResult<BorrowingDetails> {
        self.update(id, &UpdateBorrowing::from(data)).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let status = self.repository.borrowings.delete(id).await?;
        if status == BorrowingStatus::Active {
            tracing::info!("Active borrowing {} deleted, copy restored", id);
        } else {
            tracing::info!("Borrowing {} deleted", id);
        }
        Ok(())
    }
}
