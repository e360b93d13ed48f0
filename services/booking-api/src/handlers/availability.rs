//! Availability window and slot handlers

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use horae_types::{AvailabilityWindow, TimeOfDay, UserId, WindowId};

use crate::error::{ApiError, ApiResult};
use crate::extractors::Caller;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    /// Calendar day, `YYYY-MM-DD`
    pub date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct SlotsResponse {
    pub provider_id: UserId,
    pub date: NaiveDate,
    pub slots: Vec<TimeOfDay>,
}

#[derive(Debug, Deserialize)]
pub struct CreateWindowRequest {
    pub day_of_week: i16,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

#[derive(Debug, Serialize)]
pub struct WindowsResponse {
    pub windows: Vec<AvailabilityWindow>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/providers/{id}/slots?date=YYYY-MM-DD
pub async fn get_slots(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> ApiResult<Json<SlotsResponse>> {
    let start = Instant::now();

    let provider_id = UserId::parse(&id)
        .map_err(|_| ApiError::BadRequest("Invalid provider id".to_string()))?;

    let slots = state.availability.available_slots(provider_id, query.date).await?;

    metrics::histogram!("booking_operation_duration_seconds", "operation" => "get_slots")
        .record(start.elapsed().as_secs_f64());

    Ok(Json(SlotsResponse {
        provider_id,
        date: query.date,
        slots,
    }))
}

/// GET /api/v1/providers/{id}/availability
pub async fn list_windows(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<WindowsResponse>> {
    let provider_id = UserId::parse(&id)
        .map_err(|_| ApiError::BadRequest("Invalid provider id".to_string()))?;

    let windows = state.availability.list_windows(provider_id).await?;
    Ok(Json(WindowsResponse { windows }))
}

/// POST /api/v1/availability
///
/// The caller adds a window to their own calendar.
pub async fn create_window(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<CreateWindowRequest>,
) -> ApiResult<Json<AvailabilityWindow>> {
    let window = state
        .availability
        .add_window(caller.user_id, req.day_of_week, req.start, req.end)
        .await?;

    Ok(Json(window))
}

/// DELETE /api/v1/availability/{id}
pub async fn delete_window(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let window_id = WindowId::parse(&id)
        .map_err(|_| ApiError::BadRequest("Invalid window id".to_string()))?;

    state
        .availability
        .remove_window(caller.user_id, window_id)
        .await?;

    Ok(Json(serde_json::json!({ "deleted": true })))
}
