//! Booking lifecycle handlers

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Instant;

use horae_booking_core::{CheckoutSession, CreateBookingRequest};
use horae_types::{Booking, BookingId, BookingMode, Session, UserId};

use crate::error::{ApiError, ApiResult};
use crate::extractors::Caller;
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateBookingBody {
    pub provider_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub mode: BookingMode,
    pub location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelBookingBody {
    pub reason: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/bookings
pub async fn create_booking(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<CreateBookingBody>,
) -> ApiResult<Json<Booking>> {
    let start = Instant::now();

    let provider_id = UserId::parse(&body.provider_id)
        .map_err(|_| ApiError::BadRequest("Invalid provider id".to_string()))?;

    let booking = state
        .bookings
        .create_booking(
            caller.user_id,
            CreateBookingRequest {
                provider_id,
                scheduled_at: body.scheduled_at,
                duration_minutes: body.duration_minutes,
                mode: body.mode,
                location: body.location,
            },
        )
        .await?;

    metrics::counter!("bookings_created_total").increment(1);
    metrics::histogram!("booking_operation_duration_seconds", "operation" => "create_booking")
        .record(start.elapsed().as_secs_f64());

    Ok(Json(booking))
}

/// GET /api/v1/bookings/{id}
pub async fn get_booking(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Booking>> {
    let booking_id = parse_booking_id(&id)?;
    let booking = state.bookings.get_booking(booking_id, &caller).await?;
    Ok(Json(booking))
}

/// POST /api/v1/bookings/{id}/cancel
pub async fn cancel_booking(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    body: Option<Json<CancelBookingBody>>,
) -> ApiResult<Json<Booking>> {
    let start = Instant::now();

    let booking_id = parse_booking_id(&id)?;
    let reason = body.and_then(|Json(b)| b.reason);
    let booking = state
        .bookings
        .cancel_booking(booking_id, &caller, reason)
        .await?;

    metrics::counter!("bookings_cancelled_total").increment(1);
    metrics::histogram!("booking_operation_duration_seconds", "operation" => "cancel_booking")
        .record(start.elapsed().as_secs_f64());

    Ok(Json(booking))
}

/// POST /api/v1/bookings/{id}/checkout
pub async fn create_checkout(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<CheckoutSession>> {
    let start = Instant::now();

    let booking_id = parse_booking_id(&id)?;
    let checkout = state.bookings.create_checkout(booking_id, &caller).await?;

    metrics::histogram!("booking_operation_duration_seconds", "operation" => "create_checkout")
        .record(start.elapsed().as_secs_f64());

    Ok(Json(checkout))
}

/// POST /api/v1/bookings/{id}/start
pub async fn start_booking(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Booking>> {
    let booking_id = parse_booking_id(&id)?;
    let booking = state.bookings.start_booking(booking_id, &caller).await?;
    Ok(Json(booking))
}

/// POST /api/v1/bookings/{id}/no-show
pub async fn mark_no_show(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Booking>> {
    let booking_id = parse_booking_id(&id)?;
    let booking = state.bookings.mark_no_show(booking_id, &caller).await?;
    Ok(Json(booking))
}

/// POST /api/v1/bookings/{id}/session
///
/// Open (or return) the recording session attached to a booking.
pub async fn open_session(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Session>> {
    let booking_id = parse_booking_id(&id)?;
    let session = state.sessions.create_session(booking_id, &caller).await?;
    Ok(Json(session))
}

pub(crate) fn parse_booking_id(raw: &str) -> Result<BookingId, ApiError> {
    BookingId::parse(raw).map_err(|_| ApiError::BadRequest("Invalid booking id".to_string()))
}
