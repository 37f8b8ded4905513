//! Overdue sweeper.
//!
//! Periodically moves APPROVED reservations whose expected return date has
//! passed to OVERDUE and posts the fine to the member. A reservation is
//! charged once, when it is first swept; later sweeps skip it because it is
//! no longer APPROVED.
//!
//! Only one sweep runs at a time. A sweep requested while another is in
//! progress (a slow scheduled run plus a manual trigger, for example) is
//! skipped rather than queued.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use utoipa::ToSchema;

use crate::{
    config::ReservationsConfig,
    error::AppResult,
    models::reservation::{Reservation, ReservationStatus},
    repository::Repository,
};

use super::{
    clock::Clock,
    fines::{apply_overdue_transition, compute_fine},
};

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct SweepReport {
    /// Candidates found past their expected return date
    pub examined: usize,
    pub marked_overdue: usize,
    #[schema(value_type = String)]
    pub fines_posted: Decimal,
    /// Candidates that could not be processed and are retried next run
    pub failures: usize,
}

/// Resets the in-progress flag when a sweep ends, however it ends
struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct OverdueSweeper {
    repository: Repository,
    clock: Arc<dyn Clock>,
    fine_per_day: Decimal,
    interval: Duration,
    running: AtomicBool,
}

impl OverdueSweeper {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>, config: &ReservationsConfig) -> Self {
        Self {
            repository,
            clock,
            fine_per_day: config.fine_per_day,
            interval: config.sweep_interval(),
            running: AtomicBool::new(false),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one sweep now. Returns `None` if a sweep is already in progress.
    pub async fn sweep(&self) -> AppResult<Option<SweepReport>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(None);
        }
        let _guard = SweepGuard(&self.running);

        self.run_sweep().await.map(Some)
    }

    async fn run_sweep(&self) -> AppResult<SweepReport> {
        let now = self.clock.now();
        let candidates = self.repository.reservations.list_overdue_candidates(now).await?;

        let mut report = SweepReport {
            examined: candidates.len(),
            ..Default::default()
        };

        for reservation in candidates {
            match self.mark_overdue(&reservation, now).await {
                Ok(Some(fine)) => {
                    report.marked_overdue += 1;
                    report.fines_posted += fine;
                }
                Ok(None) => {
                    tracing::debug!(
                        reservation_id = reservation.id,
                        "Reservation changed since listing, skipped"
                    );
                }
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!(
                        reservation_id = reservation.id,
                        error = %e,
                        "Failed to mark reservation overdue"
                    );
                }
            }
        }

        Ok(report)
    }

    /// Returns the fine posted, or `None` when the reservation left APPROVED
    /// between listing and update. The status change and the fine posting
    /// are one write, so a failed row stays APPROVED for the next run.
    async fn mark_overdue(
        &self,
        reservation: &Reservation,
        now: chrono::DateTime<chrono::Utc>,
    ) -> AppResult<Option<Decimal>> {
        let fine = compute_fine(reservation.expected_return_date, now, self.fine_per_day);

        let mut next = reservation.clone();
        next.fine_amount = fine.max(reservation.fine_amount);
        next.status = apply_overdue_transition(reservation.status);
        next.updated_at = now;
        let posted = next.fine_amount - reservation.fine_amount;

        if !self
            .repository
            .reservations
            .update_if_status(ReservationStatus::Approved, &next, posted)
            .await?
        {
            return Ok(None);
        }

        tracing::info!(
            reservation_id = reservation.id,
            user_id = reservation.user_id,
            fine = %next.fine_amount,
            "Reservation marked overdue"
        );

        Ok(Some(posted))
    }

    async fn run_scheduled(&self) {
        match self.sweep().await {
            Ok(Some(report)) => tracing::info!(
                examined = report.examined,
                marked_overdue = report.marked_overdue,
                fines_posted = %report.fines_posted,
                failures = report.failures,
                "Overdue sweep finished"
            ),
            Ok(None) => tracing::debug!("Overdue sweep already running, tick skipped"),
            Err(e) => tracing::warn!(error = %e, "Overdue sweep failed, retrying next tick"),
        }
    }

    /// Start the periodic sweep as a background task.
    ///
    /// With `run_immediately` the first sweep happens at once, otherwise after
    /// one full interval.
    pub fn start(self: Arc<Self>, run_immediately: bool) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            if !run_immediately {
                // The first tick completes immediately
                ticker.tick().await;
            }

            loop {
                tokio::select! {
                    _ = ticker.tick() => self.run_scheduled().await,
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::info!("Overdue sweeper stopped");
        });

        SweeperHandle { shutdown_tx, task }
    }
}

/// Handle to a running sweeper task
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the task to stop and wait for the current sweep to finish
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Overdue sweeper task panicked");
        }
    }
}
