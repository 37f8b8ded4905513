//! Reservation endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::reservation::{CreateReservation, Reservation, UpdateReservationStatus},
    services::sweeper::SweepReport,
};

use super::AuthenticatedUser;

/// Result of a manually triggered overdue sweep
#[derive(Serialize, ToSchema)]
pub struct SweepResponse {
    /// `completed`, or `skipped` when a sweep was already running
    pub status: String,
    pub report: Option<SweepReport>,
}

/// Request a book
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    request_body = CreateReservation,
    responses(
        (status = 200, description = "Reservation created", body = Reservation),
        (status = 400, description = "Invalid request, inactive membership, limit reached or no copy available"),
        (status = 404, description = "Book or user not found")
    )
)]
pub async fn create_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateReservation>,
) -> AppResult<Json<Reservation>> {
    let reservation = state
        .services
        .reservations
        .create_reservation(claims.user_id, request)
        .await?;
    Ok(Json(reservation))
}

/// List the caller's reservations, newest first
#[utoipa::path(
    get,
    path = "/reservations/mine",
    tag = "reservations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's reservations", body = Vec<Reservation>)
    )
)]
pub async fn list_my_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Reservation>>> {
    let reservations = state
        .services
        .reservations
        .list_user_reservations(claims.user_id)
        .await?;
    Ok(Json(reservations))
}

/// List all reservations, newest first
#[utoipa::path(
    get,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All reservations", body = Vec<Reservation>),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn list_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Reservation>>> {
    claims.require_admin()?;

    let reservations = state.services.reservations.list_reservations().await?;
    Ok(Json(reservations))
}

/// Get a reservation
#[utoipa::path(
    get,
    path = "/reservations/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation", body = Reservation),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn get_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    let reservation = state
        .services
        .reservations
        .get_reservation(id, claims.user_id, claims.is_admin())
        .await?;
    Ok(Json(reservation))
}

/// Cancel one of the caller's pending reservations
#[utoipa::path(
    post,
    path = "/reservations/{id}/cancel",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation cancelled", body = Reservation),
        (status = 400, description = "Reservation is not pending"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn cancel_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    let reservation = state
        .services
        .reservations
        .cancel_reservation(id, claims.user_id)
        .await?;
    Ok(Json(reservation))
}

/// Change a reservation's status
#[utoipa::path(
    patch,
    path = "/reservations/{id}/status",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    request_body = UpdateReservationStatus,
    responses(
        (status = 200, description = "Reservation updated", body = Reservation),
        (status = 400, description = "Transition not allowed or no copy available"),
        (status = 403, description = "Administrator privileges required"),
        (status = 404, description = "Reservation or book not found")
    )
)]
pub async fn update_reservation_status(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(update): Json<UpdateReservationStatus>,
) -> AppResult<Json<Reservation>> {
    claims.require_admin()?;

    let reservation = state
        .services
        .reservations
        .update_reservation_status(id, update)
        .await?;
    Ok(Json(reservation))
}

/// Run the overdue sweep now
#[utoipa::path(
    post,
    path = "/reservations/sweep",
    tag = "reservations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Sweep result", body = SweepResponse),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn run_overdue_sweep(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<SweepResponse>> {
    claims.require_admin()?;

    let report = state.services.sweeper.sweep().await?;
    let status = if report.is_some() { "completed" } else { "skipped" };

    Ok(Json(SweepResponse {
        status: status.to_string(),
        report,
    }))
}
