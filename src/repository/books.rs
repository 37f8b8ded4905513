//! Books repository: catalog reads and the copy ledger

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::Book,
};

/// Available-copy accounting for catalog books.
///
/// `reserve_copy` and `release_copy` must each be a single atomic update so
/// that concurrent approvals cannot both take the last copy.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogLedger: Send + Sync {
    /// Round-trip to the store, used by readiness checks
    async fn ping(&self) -> AppResult<()>;

    /// List all books, ordered by title
    async fn list(&self) -> AppResult<Vec<Book>>;

    async fn get_by_id(&self, id: i32) -> AppResult<Book>;

    /// Take one copy out of the available pool.
    /// Fails with `Unavailable` when none is left.
    async fn reserve_copy(&self, id: i32) -> AppResult<Book>;

    /// Put one copy back, never exceeding `total_copies`.
    async fn release_copy(&self, id: i32) -> AppResult<Book>;

    /// Overwrite the copy count. Availability is reset to the new total.
    async fn set_total_copies(&self, id: i32, total: i32) -> AppResult<Book>;
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogLedger for BooksRepository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY title, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn reserve_copy(&self, id: i32) -> AppResult<Book> {
        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET available_copies = available_copies - 1
            WHERE id = $1 AND available_copies > 0
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(book) => Ok(book),
            None => {
                // Distinguish a missing book from an exhausted one
                let book = self.get_by_id(id).await?;
                Err(AppError::Unavailable(format!(
                    "No copies of \"{}\" are available",
                    book.title
                )))
            }
        }
    }

    async fn release_copy(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET available_copies = LEAST(available_copies + 1, total_copies)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn set_total_copies(&self, id: i32, total: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            "UPDATE books SET total_copies = $2, available_copies = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(total)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }
}
