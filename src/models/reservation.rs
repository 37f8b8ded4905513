//! Reservation model and its status lifecycle

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Reservation status.
///
/// ```text
/// PENDING ──► APPROVED ──► COMPLETED
///    │            │  └───► OVERDUE ──► COMPLETED
///    │            └──────► DECLINED | CANCELLED
///    └──────────────────► DECLINED | CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReservationStatus {
    Pending,
    Approved,
    Declined,
    Cancelled,
    Completed,
    Overdue,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Approved => "APPROVED",
            ReservationStatus::Declined => "DECLINED",
            ReservationStatus::Cancelled => "CANCELLED",
            ReservationStatus::Completed => "COMPLETED",
            ReservationStatus::Overdue => "OVERDUE",
        }
    }

    /// Statuses counted against a member's reservation limit
    pub fn counts_against_limit(&self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Approved)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Declined | ReservationStatus::Cancelled | ReservationStatus::Completed
        )
    }

    /// Whether an administrator may move a reservation from `self` to `next`.
    /// Re-asserting the current status is allowed so notes can be edited.
    pub fn can_transition_to(&self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;

        if *self == next {
            return true;
        }
        match self {
            Pending => matches!(next, Approved | Declined | Cancelled),
            Approved => matches!(next, Completed | Overdue | Declined | Cancelled),
            Overdue => matches!(next, Completed),
            Declined | Cancelled | Completed => false,
        }
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(ReservationStatus::Pending),
            "APPROVED" => Ok(ReservationStatus::Approved),
            "DECLINED" => Ok(ReservationStatus::Declined),
            "CANCELLED" => Ok(ReservationStatus::Cancelled),
            "COMPLETED" => Ok(ReservationStatus::Completed),
            "OVERDUE" => Ok(ReservationStatus::Overdue),
            _ => Err(format!("Invalid reservation status: {}", s)),
        }
    }
}

text_column!(ReservationStatus);

/// Reservation model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: i32,
    pub book_id: i32,
    pub user_id: i32,
    /// Requester details as they were when the reservation was made
    pub user_name: String,
    pub user_email: Option<String>,
    pub user_phone: String,
    pub reservation_date: DateTime<Utc>,
    pub pickup_date: DateTime<Utc>,
    pub expected_return_date: DateTime<Utc>,
    pub actual_return_date: Option<DateTime<Utc>>,
    pub status: ReservationStatus,
    pub admin_notes: Option<String>,
    #[schema(value_type = String)]
    pub fine_amount: Decimal,
    pub fine_paid: bool,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Whether this reservation currently keeps one of the book's copies out
    /// of the available pool.
    pub fn holds_copy(&self) -> bool {
        holds_copy(self.status, self.actual_return_date)
    }
}

pub(crate) fn holds_copy(status: ReservationStatus, actual_return_date: Option<DateTime<Utc>>) -> bool {
    match status {
        ReservationStatus::Approved => true,
        ReservationStatus::Overdue => actual_return_date.is_none(),
        _ => false,
    }
}

/// Values for a reservation about to be inserted
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub book_id: i32,
    pub user_id: i32,
    pub user_name: String,
    pub user_email: Option<String>,
    pub user_phone: String,
    pub reservation_date: DateTime<Utc>,
    pub pickup_date: DateTime<Utc>,
    pub expected_return_date: DateTime<Utc>,
}

/// Reservation request submitted by a member
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateReservation {
    pub book_id: i32,
    /// Day the member intends to collect the book
    pub pickup_date: DateTime<Utc>,
    /// Contact phone for this request
    #[validate(length(min = 5, max = 32, message = "user_phone must be 5-32 characters"))]
    pub user_phone: String,
}

/// Administrator status change
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateReservationStatus {
    pub status: ReservationStatus,
    #[validate(length(max = 2000, message = "admin_notes must be at most 2000 characters"))]
    pub admin_notes: Option<String>,
    /// When the book actually came back
    pub actual_return_date: Option<DateTime<Utc>>,
}
