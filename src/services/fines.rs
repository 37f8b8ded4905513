//! Late-return fine computation.
//!
//! Computing a fine and moving a reservation to OVERDUE are separate steps;
//! callers run [`compute_fine`] first and apply [`apply_overdue_transition`]
//! only when the fine is positive.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::reservation::ReservationStatus;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Whole days between `expected` and `actual`, rounded up. Zero when on time.
pub fn days_late(expected: DateTime<Utc>, actual: DateTime<Utc>) -> i64 {
    let late_ms = (actual - expected).num_milliseconds();
    if late_ms <= 0 {
        return 0;
    }
    (late_ms + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

/// Fine owed for returning at `actual` something due at `expected`
pub fn compute_fine(expected: DateTime<Utc>, actual: DateTime<Utc>, rate_per_day: Decimal) -> Decimal {
    let days = days_late(expected, actual);
    if days == 0 || rate_per_day <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    Decimal::from(days) * rate_per_day
}

/// Status a reservation takes once it has been found late.
///
/// Only loans that went out can be late: APPROVED, OVERDUE and a COMPLETED
/// return become OVERDUE. Requests that never left the shelf keep their status.
pub fn apply_overdue_transition(status: ReservationStatus) -> ReservationStatus {
    match status {
        ReservationStatus::Approved | ReservationStatus::Overdue | ReservationStatus::Completed => {
            ReservationStatus::Overdue
        }
        ReservationStatus::Pending | ReservationStatus::Declined | ReservationStatus::Cancelled => {
            status
        }
    }
}
