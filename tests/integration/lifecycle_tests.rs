//! Reservation lifecycle and copy accounting against the in-memory store

use chrono::Duration;
use rust_decimal::Decimal;

use medlib_server::{
    error::AppError,
    models::{
        reservation::{CreateReservation, Reservation, ReservationStatus, UpdateReservationStatus},
        user::MembershipStatus,
    },
};

use crate::common::{start, Harness};

const BOOK: i32 = 1;
const ALICE: i32 = 10;
const BOB: i32 = 20;
const CAROL: i32 = 30;

fn request(book_id: i32) -> CreateReservation {
    CreateReservation {
        book_id,
        pickup_date: start() + Duration::days(1),
        user_phone: "555-0142".to_string(),
    }
}

fn set_status(status: ReservationStatus) -> UpdateReservationStatus {
    UpdateReservationStatus {
        status,
        admin_notes: None,
        actual_return_date: None,
    }
}

fn harness(total: i32) -> Harness {
    let h = Harness::new();
    h.store.add_book(BOOK, total, total);
    h.store.add_member(ALICE, MembershipStatus::Active, 2);
    h.store.add_member(BOB, MembershipStatus::Active, 2);
    h
}

async fn reserve(h: &Harness, user_id: i32) -> Reservation {
    h.services
        .reservations
        .create_reservation(user_id, request(BOOK))
        .await
        .unwrap()
}

async fn approve(h: &Harness, reservation_id: i32) -> Result<Reservation, AppError> {
    h.services
        .reservations
        .update_reservation_status(reservation_id, set_status(ReservationStatus::Approved))
        .await
}

#[tokio::test]
async fn test_expected_return_is_two_weeks_after_pickup() {
    let h = harness(1);
    let reservation = reserve(&h, ALICE).await;

    assert_eq!(reservation.status, ReservationStatus::Pending);
    assert_eq!(
        reservation.expected_return_date,
        reservation.pickup_date + Duration::days(14)
    );
    assert_eq!(reservation.reservation_date, start());
    assert_eq!(reservation.user_name, "Member 10");
    // Requesting does not hold a copy
    assert_eq!(h.store.book(BOOK).available_copies, 1);
}

#[tokio::test]
async fn test_no_new_requests_once_the_last_copy_is_out() {
    let h = harness(1);

    let a = reserve(&h, ALICE).await;
    let approved = approve(&h, a.id).await.unwrap();
    assert_eq!(approved.status, ReservationStatus::Approved);
    assert_eq!(h.store.book(BOOK).available_copies, 0);

    // Requests are checked against availability when they are made
    let b = h
        .services
        .reservations
        .create_reservation(BOB, request(BOOK))
        .await;
    assert!(matches!(b, Err(AppError::Unavailable(_))));
}

#[tokio::test]
async fn test_pending_request_for_the_last_copy_cannot_be_approved() {
    let h = harness(1);

    let a = reserve(&h, ALICE).await;
    let b = reserve(&h, BOB).await;
    assert_eq!(b.status, ReservationStatus::Pending);

    approve(&h, a.id).await.unwrap();

    let result = approve(&h, b.id).await;
    assert!(matches!(result, Err(AppError::Unavailable(_))));
    assert_eq!(h.store.reservation(b.id).status, ReservationStatus::Pending);
    assert_eq!(h.store.reservation(a.id).status, ReservationStatus::Approved);
    assert_eq!(h.store.book(BOOK).available_copies, 0);
}

#[tokio::test]
async fn test_competing_approvals_for_the_last_copy() {
    let h = harness(1);
    let a = reserve(&h, ALICE).await;
    let b = reserve(&h, BOB).await;

    let (first, second) = tokio::join!(approve(&h, a.id), approve(&h, b.id));

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(AppError::Unavailable(_))))
            .count(),
        1
    );
    assert_eq!(h.store.book(BOOK).available_copies, 0);

    let approved = [a.id, b.id]
        .into_iter()
        .filter(|id| h.store.reservation(*id).status == ReservationStatus::Approved)
        .count();
    assert_eq!(approved, 1);
}

#[tokio::test]
async fn test_cancelling_pending_leaves_copies_alone() {
    let h = harness(2);
    let a = reserve(&h, ALICE).await;

    let cancelled = h
        .services
        .reservations
        .cancel_reservation(a.id, ALICE)
        .await
        .unwrap();

    assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    assert_eq!(h.store.book(BOOK).available_copies, 2);
}

#[tokio::test]
async fn test_owner_cannot_cancel_after_approval() {
    let h = harness(2);
    let a = reserve(&h, ALICE).await;
    approve(&h, a.id).await.unwrap();

    let result = h.services.reservations.cancel_reservation(a.id, ALICE).await;

    assert!(matches!(result, Err(AppError::InvalidTransition(_))));
    assert_eq!(h.store.book(BOOK).available_copies, 1);
}

#[tokio::test]
async fn test_approved_then_closed_nets_zero_copies() {
    for closing in [
        ReservationStatus::Declined,
        ReservationStatus::Cancelled,
        ReservationStatus::Completed,
    ] {
        let h = harness(3);
        let a = reserve(&h, ALICE).await;
        approve(&h, a.id).await.unwrap();
        assert_eq!(h.store.book(BOOK).available_copies, 2);

        h.services
            .reservations
            .update_reservation_status(a.id, set_status(closing))
            .await
            .unwrap();

        assert_eq!(h.store.book(BOOK).available_copies, 3, "closing with {}", closing);
    }
}

#[tokio::test]
async fn test_repeated_terminal_transitions_cannot_inflate_copies() {
    let h = harness(1);
    let a = reserve(&h, ALICE).await;
    approve(&h, a.id).await.unwrap();
    h.services
        .reservations
        .update_reservation_status(a.id, set_status(ReservationStatus::Completed))
        .await
        .unwrap();

    for status in [ReservationStatus::Completed, ReservationStatus::Cancelled] {
        let _ = h
            .services
            .reservations
            .update_reservation_status(a.id, set_status(status))
            .await;
    }

    let book = h.store.book(BOOK);
    assert!(book.available_copies <= book.total_copies);
    assert_eq!(book.available_copies, 1);
}

#[tokio::test]
async fn test_reservation_limit() {
    let h = harness(5);
    reserve(&h, ALICE).await;
    reserve(&h, ALICE).await;

    let third = h
        .services
        .reservations
        .create_reservation(ALICE, request(BOOK))
        .await;

    assert!(matches!(third, Err(AppError::LimitExceeded(_))));
}

#[tokio::test]
async fn test_concurrent_requests_respect_the_limit() {
    let h = harness(5);
    h.store.add_member(CAROL, MembershipStatus::Active, 1);

    let (first, second) = tokio::join!(
        h.services.reservations.create_reservation(CAROL, request(BOOK)),
        h.services.reservations.create_reservation(CAROL, request(BOOK)),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(AppError::LimitExceeded(_)))));
    assert_eq!(
        h.services
            .reservations
            .list_user_reservations(CAROL)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_closed_reservations_free_up_the_limit() {
    let h = harness(5);
    let first = reserve(&h, ALICE).await;
    reserve(&h, ALICE).await;
    h.services
        .reservations
        .cancel_reservation(first.id, ALICE)
        .await
        .unwrap();

    let third = h
        .services
        .reservations
        .create_reservation(ALICE, request(BOOK))
        .await;

    assert!(third.is_ok());
}

#[tokio::test]
async fn test_inactive_member_cannot_reserve() {
    let h = harness(1);
    h.store.add_member(30, MembershipStatus::Inactive, 5);

    let result = h
        .services
        .reservations
        .create_reservation(30, request(BOOK))
        .await;

    assert!(matches!(result, Err(AppError::MembershipInactive(_))));
}

#[tokio::test]
async fn test_missing_book_and_member() {
    let h = harness(1);

    let no_book = h.services.reservations.create_reservation(ALICE, request(99)).await;
    assert!(matches!(no_book, Err(AppError::NotFound(_))));

    let no_member = h.services.reservations.create_reservation(77, request(BOOK)).await;
    assert!(matches!(no_member, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_late_return_fines_and_marks_overdue() {
    let h = harness(1);
    let a = reserve(&h, ALICE).await;
    approve(&h, a.id).await.unwrap();

    let returned = h
        .services
        .reservations
        .update_reservation_status(
            a.id,
            UpdateReservationStatus {
                status: ReservationStatus::Completed,
                admin_notes: Some("returned at front desk".to_string()),
                actual_return_date: Some(a.expected_return_date + Duration::days(3)),
            },
        )
        .await
        .unwrap();

    assert_eq!(returned.fine_amount, Decimal::from(3));
    assert_eq!(returned.status, ReservationStatus::Overdue);
    assert_eq!(h.store.member(ALICE).fines, Decimal::from(3));
    // The book is back on the shelf even though the status is OVERDUE
    assert_eq!(h.store.book(BOOK).available_copies, 1);
}

#[tokio::test]
async fn test_on_time_return_is_not_fined() {
    let h = harness(1);
    let a = reserve(&h, ALICE).await;
    approve(&h, a.id).await.unwrap();

    let returned = h
        .services
        .reservations
        .update_reservation_status(
            a.id,
            UpdateReservationStatus {
                status: ReservationStatus::Completed,
                admin_notes: None,
                actual_return_date: Some(a.expected_return_date),
            },
        )
        .await
        .unwrap();

    assert_eq!(returned.fine_amount, Decimal::ZERO);
    assert_eq!(returned.status, ReservationStatus::Completed);
    assert_eq!(h.store.member(ALICE).fines, Decimal::ZERO);
}

#[tokio::test]
async fn test_sweep_marks_overdue_once() {
    let h = harness(1);
    let a = reserve(&h, ALICE).await;
    approve(&h, a.id).await.unwrap();

    // Due 15 days after start, sweep 2 days after that
    h.clock.advance(Duration::days(17));

    let first = h.services.sweeper.sweep().await.unwrap().unwrap();
    assert_eq!(first.marked_overdue, 1);

    let swept = h.store.reservation(a.id);
    assert_eq!(swept.status, ReservationStatus::Overdue);
    assert_eq!(swept.fine_amount, Decimal::from(2));

    let second = h.services.sweeper.sweep().await.unwrap().unwrap();
    assert_eq!(second.examined, 0);
    assert_eq!(h.store.reservation(a.id).fine_amount, Decimal::from(2));
    assert_eq!(h.store.member(ALICE).fines, Decimal::from(2));
}

#[tokio::test]
async fn test_failed_sweep_write_is_retried_next_run() {
    let h = harness(1);
    let a = reserve(&h, ALICE).await;
    approve(&h, a.id).await.unwrap();
    h.clock.advance(Duration::days(18));

    h.store.fail_next_write();
    let first = h.services.sweeper.sweep().await.unwrap().unwrap();
    assert_eq!(first.failures, 1);
    assert_eq!(first.marked_overdue, 0);
    // Neither the status nor the fine was written
    assert_eq!(h.store.reservation(a.id).status, ReservationStatus::Approved);
    assert_eq!(h.store.reservation(a.id).fine_amount, Decimal::ZERO);
    assert_eq!(h.store.member(ALICE).fines, Decimal::ZERO);

    let second = h.services.sweeper.sweep().await.unwrap().unwrap();
    assert_eq!(second.examined, 1);
    assert_eq!(second.marked_overdue, 1);
    assert_eq!(h.store.reservation(a.id).status, ReservationStatus::Overdue);
    assert_eq!(h.store.reservation(a.id).fine_amount, Decimal::from(3));
    assert_eq!(h.store.member(ALICE).fines, Decimal::from(3));
}

#[tokio::test]
async fn test_failed_return_write_can_be_resubmitted() {
    let h = harness(1);
    let a = reserve(&h, ALICE).await;
    approve(&h, a.id).await.unwrap();
    let late_return = UpdateReservationStatus {
        status: ReservationStatus::Completed,
        admin_notes: None,
        actual_return_date: Some(a.expected_return_date + Duration::days(2)),
    };

    h.store.fail_next_write();
    let failed = h
        .services
        .reservations
        .update_reservation_status(a.id, late_return.clone())
        .await;
    assert!(matches!(failed, Err(AppError::Internal(_))));
    assert_eq!(h.store.reservation(a.id).status, ReservationStatus::Approved);
    assert_eq!(h.store.member(ALICE).fines, Decimal::ZERO);
    assert_eq!(h.store.book(BOOK).available_copies, 0);

    let returned = h
        .services
        .reservations
        .update_reservation_status(a.id, late_return)
        .await
        .unwrap();
    assert_eq!(returned.fine_amount, Decimal::from(2));
    assert_eq!(h.store.member(ALICE).fines, Decimal::from(2));
    assert_eq!(h.store.book(BOOK).available_copies, 1);
}

#[tokio::test]
async fn test_overlapping_sweeps_run_once() {
    let h = harness(1);
    let a = reserve(&h, ALICE).await;
    approve(&h, a.id).await.unwrap();
    h.clock.advance(Duration::days(17));

    let gate = h.store.gate_sweeps();
    let sweeper = h.services.sweeper.clone();
    let running = tokio::spawn(async move { sweeper.sweep().await });
    gate.entered.notified().await;

    let overlapping = h.services.sweeper.sweep().await.unwrap();
    assert_eq!(overlapping, None);

    gate.release.notify_one();
    let report = running.await.unwrap().unwrap().unwrap();
    assert_eq!(report.marked_overdue, 1);
    assert_eq!(h.store.member(ALICE).fines, Decimal::from(2));
}

#[tokio::test]
async fn test_swept_fine_does_not_grow_on_later_sweeps() {
    let h = harness(1);
    let a = reserve(&h, ALICE).await;
    approve(&h, a.id).await.unwrap();

    h.clock.advance(Duration::days(16));
    h.services.sweeper.sweep().await.unwrap();
    h.clock.advance(Duration::days(10));
    h.services.sweeper.sweep().await.unwrap();

    assert_eq!(h.store.reservation(a.id).fine_amount, Decimal::from(1));
    // Still out, so the copy is still held
    assert_eq!(h.store.book(BOOK).available_copies, 0);
}

#[tokio::test]
async fn test_returning_a_swept_book_releases_it_and_tops_up_the_fine() {
    let h = harness(1);
    let a = reserve(&h, ALICE).await;
    approve(&h, a.id).await.unwrap();
    h.clock.advance(Duration::days(16));
    h.services.sweeper.sweep().await.unwrap();

    let returned = h
        .services
        .reservations
        .update_reservation_status(
            a.id,
            UpdateReservationStatus {
                status: ReservationStatus::Completed,
                admin_notes: None,
                actual_return_date: Some(a.expected_return_date + Duration::days(4)),
            },
        )
        .await
        .unwrap();

    assert_eq!(returned.fine_amount, Decimal::from(4));
    assert_eq!(h.store.member(ALICE).fines, Decimal::from(4));
    assert_eq!(h.store.book(BOOK).available_copies, 1);
}

#[tokio::test]
async fn test_not_yet_due_is_left_alone() {
    let h = harness(1);
    let a = reserve(&h, ALICE).await;
    approve(&h, a.id).await.unwrap();
    h.clock.advance(Duration::days(3));

    let report = h.services.sweeper.sweep().await.unwrap().unwrap();

    assert_eq!(report.examined, 0);
    assert_eq!(h.store.reservation(a.id).status, ReservationStatus::Approved);
}

#[tokio::test]
async fn test_copy_count_edit_resets_availability() {
    let h = harness(2);
    let a = reserve(&h, ALICE).await;
    approve(&h, a.id).await.unwrap();

    let book = h
        .services
        .catalog
        .set_total_copies(BOOK, medlib_server::models::book::UpdateCopies { total_copies: 4 })
        .await
        .unwrap();

    assert_eq!(book.total_copies, 4);
    assert_eq!(book.available_copies, 4);
}

#[tokio::test]
async fn test_negative_copy_count_rejected() {
    let h = harness(2);

    let result = h
        .services
        .catalog
        .set_total_copies(BOOK, medlib_server::models::book::UpdateCopies { total_copies: -1 })
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(h.store.book(BOOK).total_copies, 2);
}

#[tokio::test]
async fn test_mine_lists_newest_first() {
    let h = harness(5);
    let first = reserve(&h, ALICE).await;
    h.clock.advance(Duration::hours(1));
    let second = reserve(&h, ALICE).await;
    reserve(&h, BOB).await;

    let mine = h
        .services
        .reservations
        .list_user_reservations(ALICE)
        .await
        .unwrap();

    let ids: Vec<i32> = mine.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}
