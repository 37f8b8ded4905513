//! Catalog service: book availability and copy counts

use validator::Validate;

use crate::{
    error::AppResult,
    models::book::{Book, UpdateCopies},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Check that the catalog store answers
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.books.ping().await
    }

    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list().await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Set a book's total copies.
    ///
    /// Availability is reset to the new total, which forgets copies that are
    /// currently out on approved reservations.
    pub async fn set_total_copies(&self, id: i32, update: UpdateCopies) -> AppResult<Book> {
        update.validate()?;

        let before = self.repository.books.get_by_id(id).await?;
        let book = self
            .repository
            .books
            .set_total_copies(id, update.total_copies)
            .await?;

        if before.available_copies != before.total_copies {
            tracing::warn!(
                book_id = id,
                on_loan = before.total_copies - before.available_copies,
                "Copy count edited while copies are on loan, availability reset to total"
            );
        }
        tracing::info!(book_id = id, total_copies = book.total_copies, "Book copy count updated");

        Ok(book)
    }
}
