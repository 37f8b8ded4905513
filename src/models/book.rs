//! Book (catalog entry) model and its copy ledger

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Catalog category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookCategory {
    Medicine,
    Nursing,
    Pharmacy,
    Laboratory,
    Science,
    Reference,
    General,
}

impl BookCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookCategory::Medicine => "medicine",
            BookCategory::Nursing => "nursing",
            BookCategory::Pharmacy => "pharmacy",
            BookCategory::Laboratory => "laboratory",
            BookCategory::Science => "science",
            BookCategory::Reference => "reference",
            BookCategory::General => "general",
        }
    }
}

impl std::str::FromStr for BookCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "medicine" => Ok(BookCategory::Medicine),
            "nursing" => Ok(BookCategory::Nursing),
            "pharmacy" => Ok(BookCategory::Pharmacy),
            "laboratory" => Ok(BookCategory::Laboratory),
            "science" => Ok(BookCategory::Science),
            "reference" => Ok(BookCategory::Reference),
            "general" => Ok(BookCategory::General),
            _ => Err(format!("Invalid book category: {}", s)),
        }
    }
}

text_column!(BookCategory);

/// Book model from database.
///
/// `available_copies` stays within `0..=total_copies`; the database enforces it
/// with a CHECK constraint and the ledger updates never cross it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub category: BookCategory,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    pub total_copies: i32,
    pub available_copies: i32,
}

impl Book {
    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }
}

/// Direct edit of a book's copy count
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCopies {
    #[validate(range(min = 0, message = "total_copies must not be negative"))]
    pub total_copies: i32,
}
