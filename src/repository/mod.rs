//! Repository layer for database operations
//!
//! Each store is a trait so the services can run against Postgres in
//! production and against other implementations in tests.

pub mod books;
pub mod reservations;
pub mod users;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

pub use books::CatalogLedger;
pub use reservations::ReservationStore;
pub use users::MemberDirectory;

/// Main repository struct holding the store handles
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn CatalogLedger>,
    pub reservations: Arc<dyn ReservationStore>,
    pub users: Arc<dyn MemberDirectory>,
}

impl Repository {
    /// Create a Postgres-backed repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            reservations: Arc::new(reservations::ReservationsRepository::new(pool.clone())),
            users: Arc::new(users::UsersRepository::new(pool)),
        }
    }

    /// Assemble a repository from individual stores
    pub fn from_parts(
        books: Arc<dyn CatalogLedger>,
        reservations: Arc<dyn ReservationStore>,
        users: Arc<dyn MemberDirectory>,
    ) -> Self {
        Self {
            books,
            reservations,
            users,
        }
    }
}
