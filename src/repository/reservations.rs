//! Reservations repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::reservation::{NewReservation, Reservation, ReservationStatus},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Insert a new PENDING reservation unless the user already has `limit`
    /// PENDING or APPROVED ones. Returns `None` when the limit is reached.
    async fn create(
        &self,
        reservation: &NewReservation,
        limit: i32,
    ) -> AppResult<Option<Reservation>>;

    async fn get_by_id(&self, id: i32) -> AppResult<Reservation>;

    /// All reservations, newest first
    async fn list_all(&self) -> AppResult<Vec<Reservation>>;

    /// Reservations of one user, newest first
    async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<Reservation>>;

    /// Number of PENDING or APPROVED reservations held by a user
    async fn count_active_for_user(&self, user_id: i32) -> AppResult<i64>;

    /// Persist `next` only if the stored status is still `expected`, and add
    /// `fine_increase` to the owner's fines in the same transaction.
    /// Returns `false` when another writer changed the status first; nothing
    /// is written in that case or on error.
    async fn update_if_status(
        &self,
        expected: ReservationStatus,
        next: &Reservation,
        fine_increase: Decimal,
    ) -> AppResult<bool>;

    /// APPROVED reservations due before `now` and not yet returned
    async fn list_overdue_candidates(&self, now: DateTime<Utc>) -> AppResult<Vec<Reservation>>;
}

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationStore for ReservationsRepository {
    async fn create(
        &self,
        reservation: &NewReservation,
        limit: i32,
    ) -> AppResult<Option<Reservation>> {
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent creates by the same user
        let member: Option<i32> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(reservation.user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if member.is_none() {
            return Err(AppError::NotFound(format!(
                "User with id {} not found",
                reservation.user_id
            )));
        }

        let created = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations (
                book_id, user_id, user_name, user_email, user_phone,
                reservation_date, pickup_date, expected_return_date,
                status, fine_amount, fine_paid, updated_at
            )
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, 0, FALSE, $6
            WHERE (
                SELECT COUNT(*) FROM reservations
                WHERE user_id = $2 AND status IN ($9, $10)
            ) < $11
            RETURNING *
            "#,
        )
        .bind(reservation.book_id)
        .bind(reservation.user_id)
        .bind(&reservation.user_name)
        .bind(&reservation.user_email)
        .bind(&reservation.user_phone)
        .bind(reservation.reservation_date)
        .bind(reservation.pickup_date)
        .bind(reservation.expected_return_date)
        .bind(ReservationStatus::Pending)
        .bind(ReservationStatus::Approved)
        .bind(i64::from(limit))
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    async fn list_all(&self) -> AppResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations ORDER BY reservation_date DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE user_id = $1 ORDER BY reservation_date DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_active_for_user(&self, user_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservations WHERE user_id = $1 AND status IN ($2, $3)",
        )
        .bind(user_id)
        .bind(ReservationStatus::Pending)
        .bind(ReservationStatus::Approved)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn update_if_status(
        &self,
        expected: ReservationStatus,
        next: &Reservation,
        fine_increase: Decimal,
    ) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET status = $3, admin_notes = $4, actual_return_date = $5,
                fine_amount = $6, fine_paid = $7, updated_at = $8
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(next.id)
        .bind(expected)
        .bind(next.status)
        .bind(&next.admin_notes)
        .bind(next.actual_return_date)
        .bind(next.fine_amount)
        .bind(next.fine_paid)
        .bind(next.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(false);
        }

        if fine_increase > Decimal::ZERO {
            let posted = sqlx::query("UPDATE users SET fines = fines + $2 WHERE id = $1")
                .bind(next.user_id)
                .bind(fine_increase)
                .execute(&mut *tx)
                .await?;
            if posted.rows_affected() == 0 {
                return Err(AppError::NotFound(format!(
                    "User with id {} not found",
                    next.user_id
                )));
            }
        }

        tx.commit().await?;

        Ok(true)
    }

    async fn list_overdue_candidates(&self, now: DateTime<Utc>) -> AppResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservations
            WHERE status = $1
              AND expected_return_date < $2
              AND actual_return_date IS NULL
            ORDER BY expected_return_date, id
            "#,
        )
        .bind(ReservationStatus::Approved)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
