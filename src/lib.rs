//! Medlib hospital library server
//!
//! REST JSON API for book reservations: members request books, administrators
//! move requests through their lifecycle, and a background sweep marks late
//! loans overdue and posts fines.

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
