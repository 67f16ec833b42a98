//! Book catalog service

use validator::Validate;

use crate::{
    error::AppResult,
    models::book::{Book, BookQuery, CreateBook, ReplaceBook, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
}

impl BooksService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List books, optionally filtered by search terms
    pub async fn list(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        tracing::debug!("Listing books (search: {:?})", query.search);
        self.repository.books.list(query.search.as_deref()).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Create a book after field validation
    pub async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        data.validate()?;
        let book = self.repository.books.create(data).await?;
        tracing::info!("Book {} created (isbn {})", book.id, book.isbn);
        Ok(book)
    }

    /// Apply a partial update
    pub async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        data.validate()?;
        let book = self.repository.books.update(id, data).await?;
        tracing::info!(
            "Book {} updated ({}/{} copies available)",
            book.id,
            book.available_copies,
            book.total_copies
        );
        Ok(book)
    }

    /// Replace the required fields; omitted optional ones keep their stored value
    pub async fn replace(&self, id: i32, data: ReplaceBook) -> AppResult<Book> {
        self.update(id, &UpdateBook::from(data)).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!("Book {} deleted", id);
        Ok(())
    }
}
