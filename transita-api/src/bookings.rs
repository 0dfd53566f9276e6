use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;
use transita_core::{AcquireOutcome, Booking, ConfirmOutcome, ConflictReason, ReleaseOutcome};

#[derive(Debug, Deserialize)]
struct LockSeatRequest {
    trip_id: Uuid,
    seat_id: Uuid,
    /// Lock TTL in seconds; defaults to the configured business rule.
    ttl: Option<u64>,
}

#[derive(Debug, Serialize)]
struct LockSeatResponse {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ConfirmBookingRequest {
    trip_id: Uuid,
    seat_id: Uuid,
    token: String,
    booker_id: Uuid,
}

#[derive(Debug, Serialize)]
struct BookingResponse {
    booking_id: Uuid,
    trip_id: Uuid,
    seat_id: Uuid,
    status: String,
    booked_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            booking_id: b.id,
            trip_id: b.trip_id,
            seat_id: b.seat_id,
            status: b.status.to_string(),
            booked_at: b.booked_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReleaseLockRequest {
    trip_id: Uuid,
    seat_id: Uuid,
    token: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings/locks/lock", post(lock_seat))
        .route("/v1/bookings/locks/confirm", post(confirm_booking))
        .route("/v1/bookings/locks/release", post(release_lock))
        .route("/v1/bookings/{id}", get(get_booking))
}

/// POST /v1/bookings/locks/lock
/// Lock a seat for a short TTL and return the ownership token.
async fn lock_seat(
    State(state): State<AppState>,
    Json(req): Json<LockSeatRequest>,
) -> Result<Json<LockSeatResponse>, AppError> {
    let start = std::time::Instant::now();
    let outcome = state.locks.acquire(req.trip_id, req.seat_id, req.ttl).await?;
    state
        .metrics
        .seat_lock_latency
        .observe(start.elapsed().as_secs_f64());

    match outcome {
        AcquireOutcome::Held(lease) => {
            state
                .metrics
                .seat_lock_attempts
                .with_label_values(&["success"])
                .inc();
            Ok(Json(LockSeatResponse {
                token: lease.token,
                expires_at: lease.expires_at,
            }))
        }
        AcquireOutcome::Conflict => {
            state
                .metrics
                .seat_lock_attempts
                .with_label_values(&["conflict"])
                .inc();
            Err(AppError::ConflictError("Seat already locked".to_string()))
        }
    }
}

/// POST /v1/bookings/locks/confirm
/// Consume the lock token and create the booking transactionally.
async fn confirm_booking(
    State(state): State<AppState>,
    Json(req): Json<ConfirmBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let outcome = state
        .coordinator
        .confirm(req.trip_id, req.seat_id, &req.token, req.booker_id)
        .await?;

    match outcome {
        ConfirmOutcome::Confirmed(booking) => Ok(Json(booking.into())),
        ConfirmOutcome::Expired => Err(AppError::ConflictError(
            "Invalid or expired lock token".to_string(),
        )),
        ConfirmOutcome::Conflict(ConflictReason::NoSeats) => {
            Err(AppError::ConflictError("No seats available".to_string()))
        }
        ConfirmOutcome::Conflict(ConflictReason::SeatBooked) => {
            Err(AppError::ConflictError("Seat already booked".to_string()))
        }
    }
}

/// POST /v1/bookings/locks/release
/// Voluntary release with a token, or unconditional without one.
async fn release_lock(
    State(state): State<AppState>,
    Json(req): Json<ReleaseLockRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let outcome = state
        .locks
        .release(req.trip_id, req.seat_id, req.token.as_deref())
        .await?;

    match outcome {
        ReleaseOutcome::Released => Ok(Json(json!({ "released": true }))),
        ReleaseOutcome::Invalid => Err(AppError::ConflictError(
            "Token mismatch or lock not owned".to_string(),
        )),
    }
}

/// GET /v1/bookings/{id}
async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state
        .ledger
        .booking(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("booking not found".to_string()))?;
    Ok(Json(booking.into()))
}
