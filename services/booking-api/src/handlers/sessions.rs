//! Session and consent handlers

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use horae_types::{ConsentKind, RecordingAuthorization, Session, SessionId};

use crate::error::{ApiError, ApiResult};
use crate::extractors::Caller;
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GrantConsentBody {
    pub kind: ConsentKind,
}

#[derive(Debug, Deserialize)]
pub struct ValidateSummaryBody {
    pub summary: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Session>> {
    let session_id = parse_session_id(&id)?;
    let session = state.sessions.get_session(session_id, &caller).await?;
    Ok(Json(session))
}

/// POST /api/v1/sessions/{id}/consents
pub async fn grant_consent(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(body): Json<GrantConsentBody>,
) -> ApiResult<Json<RecordingAuthorization>> {
    let session_id = parse_session_id(&id)?;
    state
        .sessions
        .grant_consent(session_id, &caller, body.kind)
        .await?;

    // Echo back where the gate stands so the client can show progress.
    let authorization = state.sessions.recording_authorization(session_id).await?;
    Ok(Json(authorization))
}

/// GET /api/v1/sessions/{id}/recording-authorization
pub async fn recording_authorization(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<RecordingAuthorization>> {
    let session_id = parse_session_id(&id)?;
    // Visibility check; the gate itself is keyed to the booking's client.
    state.sessions.get_session(session_id, &caller).await?;

    let authorization = state.sessions.recording_authorization(session_id).await?;
    Ok(Json(authorization))
}

/// POST /api/v1/sessions/{id}/recording/start
pub async fn start_recording(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Session>> {
    let session_id = parse_session_id(&id)?;
    let session = state.sessions.start_recording(session_id, &caller).await?;
    Ok(Json(session))
}

/// POST /api/v1/sessions/{id}/summary
pub async fn validate_summary(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(body): Json<ValidateSummaryBody>,
) -> ApiResult<Json<Session>> {
    let session_id = parse_session_id(&id)?;
    let session = state
        .sessions
        .validate_summary(session_id, &caller, &body.summary)
        .await?;
    Ok(Json(session))
}

/// POST /api/v1/sessions/{id}/reset
///
/// Diagnostic path: wipes the pipeline output and hands the booking back.
pub async fn reset_session(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Session>> {
    let session_id = parse_session_id(&id)?;
    let session = state.sessions.reset_session(session_id, &caller).await?;
    Ok(Json(session))
}

pub(crate) fn parse_session_id(raw: &str) -> Result<SessionId, ApiError> {
    SessionId::parse(raw).map_err(|_| ApiError::BadRequest("Invalid session id".to_string()))
}
