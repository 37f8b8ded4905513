//! Reservation lifecycle service

use std::sync::Arc;

use chrono::Duration;
use rust_decimal::Decimal;
use validator::Validate;

use crate::{
    config::ReservationsConfig,
    error::{AppError, AppResult},
    models::reservation::{
        CreateReservation, NewReservation, Reservation, ReservationStatus,
        UpdateReservationStatus,
    },
    repository::Repository,
};

use super::{
    clock::Clock,
    fines::{apply_overdue_transition, compute_fine},
};

/// Loan period and fine rate applied to every reservation
#[derive(Debug, Clone, Copy)]
pub struct ReservationPolicy {
    pub loan_period: Duration,
    pub fine_per_day: Decimal,
}

impl From<&ReservationsConfig> for ReservationPolicy {
    fn from(config: &ReservationsConfig) -> Self {
        Self {
            loan_period: Duration::days(config.loan_period_days),
            fine_per_day: config.fine_per_day,
        }
    }
}

/// What a status change did to the book's available copies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LedgerEffect {
    None,
    Reserved,
    Released,
}

#[derive(Clone)]
pub struct ReservationsService {
    repository: Repository,
    clock: Arc<dyn Clock>,
    policy: ReservationPolicy,
}

impl ReservationsService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>, policy: ReservationPolicy) -> Self {
        Self {
            repository,
            clock,
            policy,
        }
    }

    /// Create a PENDING reservation for `user_id`.
    ///
    /// The copy is not taken from the ledger here; that happens on approval,
    /// so two members can both hold a pending request for the last copy.
    pub async fn create_reservation(
        &self,
        user_id: i32,
        request: CreateReservation,
    ) -> AppResult<Reservation> {
        request.validate()?;

        let now = self.clock.now();
        if request.pickup_date.date_naive() < now.date_naive() {
            return Err(AppError::Validation(
                "pickup_date cannot be in the past".to_string(),
            ));
        }

        let member = self.repository.users.get_by_id(user_id).await?;
        if !member.may_reserve() {
            return Err(AppError::MembershipInactive(format!(
                "Membership is {}, an active membership is required to reserve books",
                member.membership_status
            )));
        }

        let active = self.repository.reservations.count_active_for_user(user_id).await?;
        if active >= i64::from(member.reservation_limit) {
            return Err(AppError::LimitExceeded(format!(
                "Maximum reservations reached ({}/{})",
                active, member.reservation_limit
            )));
        }

        let book = self.repository.books.get_by_id(request.book_id).await?;
        if !book.is_available() {
            return Err(AppError::Unavailable(format!(
                "No copies of \"{}\" are available",
                book.title
            )));
        }

        let new_reservation = NewReservation {
            book_id: book.id,
            user_id,
            user_name: member.name.clone(),
            user_email: member.email.clone(),
            user_phone: request.user_phone,
            reservation_date: now,
            pickup_date: request.pickup_date,
            expected_return_date: request.pickup_date + self.policy.loan_period,
        };

        let reservation = self
            .repository
            .reservations
            .create(&new_reservation, member.reservation_limit)
            .await?
            .ok_or_else(|| {
                AppError::LimitExceeded(format!(
                    "Maximum reservations reached (limit {})",
                    member.reservation_limit
                ))
            })?;

        tracing::info!(
            reservation_id = reservation.id,
            book_id = reservation.book_id,
            user_id,
            "Reservation created"
        );

        Ok(reservation)
    }

    /// Cancel one of the caller's own PENDING reservations
    pub async fn cancel_reservation(&self, reservation_id: i32, user_id: i32) -> AppResult<Reservation> {
        let current = self.repository.reservations.get_by_id(reservation_id).await?;

        if current.user_id != user_id {
            return Err(AppError::Unauthorized(format!(
                "Reservation {} does not belong to user {}",
                reservation_id, user_id
            )));
        }
        if current.status != ReservationStatus::Pending {
            return Err(AppError::InvalidTransition(format!(
                "Only pending reservations can be cancelled (reservation is {})",
                current.status
            )));
        }

        let mut next = current.clone();
        next.status = ReservationStatus::Cancelled;
        next.updated_at = self.clock.now();

        if !self
            .repository
            .reservations
            .update_if_status(ReservationStatus::Pending, &next, Decimal::ZERO)
            .await?
        {
            return Err(concurrent_update(reservation_id));
        }

        tracing::info!(reservation_id, user_id, "Reservation cancelled by owner");

        Ok(next)
    }

    /// Administrator status change.
    ///
    /// Ledger effects follow whether the reservation holds a copy before and
    /// after the change. A supplied return date is checked for lateness; a
    /// late return raises the fine and forces OVERDUE.
    pub async fn update_reservation_status(
        &self,
        reservation_id: i32,
        update: UpdateReservationStatus,
    ) -> AppResult<Reservation> {
        update.validate()?;

        let current = self.repository.reservations.get_by_id(reservation_id).await?;

        if !current.status.can_transition_to(update.status) {
            return Err(AppError::InvalidTransition(format!(
                "Cannot move reservation {} from {} to {}",
                reservation_id, current.status, update.status
            )));
        }
        if update.actual_return_date.is_some()
            && !matches!(update.status, ReservationStatus::Completed | ReservationStatus::Overdue)
        {
            return Err(AppError::Validation(
                "actual_return_date is only accepted with COMPLETED or OVERDUE".to_string(),
            ));
        }

        let mut next = current.clone();
        next.status = update.status;
        if let Some(notes) = update.admin_notes {
            next.admin_notes = Some(notes);
        }
        if let Some(returned) = update.actual_return_date {
            next.actual_return_date = Some(returned);
            let fine = compute_fine(current.expected_return_date, returned, self.policy.fine_per_day);
            if fine > Decimal::ZERO {
                next.fine_amount = fine.max(current.fine_amount);
                next.status = apply_overdue_transition(next.status);
            }
        }
        next.updated_at = self.clock.now();

        let effect = match (current.holds_copy(), next.holds_copy()) {
            (false, true) => {
                self.repository.books.reserve_copy(current.book_id).await?;
                LedgerEffect::Reserved
            }
            (true, false) => {
                self.repository.books.release_copy(current.book_id).await?;
                LedgerEffect::Released
            }
            _ => LedgerEffect::None,
        };

        // Fines only grow; the member is charged the difference
        let fine_increase = (next.fine_amount - current.fine_amount).max(Decimal::ZERO);

        let written = self
            .repository
            .reservations
            .update_if_status(current.status, &next, fine_increase)
            .await;

        match written {
            Ok(true) => {}
            Ok(false) => {
                self.undo_ledger_effect(current.book_id, effect).await;
                return Err(concurrent_update(reservation_id));
            }
            Err(e) => {
                self.undo_ledger_effect(current.book_id, effect).await;
                return Err(e);
            }
        }

        tracing::info!(
            reservation_id,
            book_id = current.book_id,
            from = %current.status,
            to = %next.status,
            fine = %next.fine_amount,
            "Reservation status updated"
        );

        Ok(next)
    }

    async fn undo_ledger_effect(&self, book_id: i32, effect: LedgerEffect) {
        let undone = match effect {
            LedgerEffect::None => return,
            LedgerEffect::Reserved => self.repository.books.release_copy(book_id).await,
            LedgerEffect::Released => self.repository.books.reserve_copy(book_id).await,
        };
        if let Err(e) = undone {
            tracing::error!(book_id, ?effect, error = %e, "Failed to undo copy ledger change");
        }
    }

    /// Get one reservation; members only see their own
    pub async fn get_reservation(
        &self,
        reservation_id: i32,
        user_id: i32,
        is_admin: bool,
    ) -> AppResult<Reservation> {
        let reservation = self.repository.reservations.get_by_id(reservation_id).await?;
        if !is_admin && reservation.user_id != user_id {
            return Err(AppError::Unauthorized(format!(
                "Reservation {} does not belong to user {}",
                reservation_id, user_id
            )));
        }
        Ok(reservation)
    }

    /// Reservations of one user, newest first
    pub async fn list_user_reservations(&self, user_id: i32) -> AppResult<Vec<Reservation>> {
        self.repository.reservations.list_for_user(user_id).await
    }

    /// All reservations, newest first
    pub async fn list_reservations(&self) -> AppResult<Vec<Reservation>> {
        self.repository.reservations.list_all().await
    }
}

fn concurrent_update(reservation_id: i32) -> AppError {
    AppError::InvalidTransition(format!(
        "Reservation {} was modified concurrently, reload and retry",
        reservation_id
    ))
}
