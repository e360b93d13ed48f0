//! Recording upload handler
//!
//! Multipart endpoint that drives the whole upload/transcribe/summarize
//! pipeline in one request. It runs under its own timeout layer because
//! the pipeline can legitimately take minutes.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::Serialize;

use horae_session_core::{AudioUpload, SessionError};
use horae_types::{MarkedMoment, Session, SessionStatus};

use crate::error::{ApiError, ApiResult};
use crate::extractors::Caller;
use crate::handlers::sessions::parse_session_id;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RecordingResponse {
    pub session_id: horae_types::SessionId,
    pub status: SessionStatus,
    pub transcript: Option<String>,
    pub summary_raw: Option<String>,
}

/// POST /api/v1/sessions/{id}/recording
///
/// Parts:
/// - `audio` (required): the recording bytes; content type and filename
///   extension describe the container
/// - `moments` (optional): JSON array of marked moments
/// - `duration_secs` (optional): recording length as reported by the client
/// - `format` (optional): explicit container format, overrides the filename
pub async fn upload_recording(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<Json<RecordingResponse>> {
    let session_id = parse_session_id(&id)?;

    let mut audio: Option<AudioUpload> = None;
    let mut moments: Vec<MarkedMoment> = Vec::new();
    let mut duration_secs: Option<f64> = None;
    let mut format_override: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("audio") => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let format = field
                    .file_name()
                    .and_then(|name| name.rsplit_once('.'))
                    .map(|(_, ext)| ext.to_ascii_lowercase());
                let body = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read audio: {e}")))?;
                audio = Some(AudioUpload {
                    body,
                    content_type,
                    format,
                    duration_secs: None,
                });
            }
            Some("moments") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read moments: {e}")))?;
                moments = serde_json::from_str(&raw)
                    .map_err(|e| ApiError::BadRequest(format!("Invalid moments payload: {e}")))?;
            }
            Some("duration_secs") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read field: {e}")))?;
                duration_secs = Some(raw.parse().map_err(|_| {
                    ApiError::BadRequest("duration_secs must be a number".to_string())
                })?);
            }
            Some("format") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read field: {e}")))?;
                format_override = Some(raw);
            }
            _ => {
                // Unknown parts are skipped, not rejected.
            }
        }
    }

    let mut audio =
        audio.ok_or_else(|| ApiError::BadRequest("Missing 'audio' part".to_string()))?;
    audio.duration_secs = duration_secs;
    if format_override.is_some() {
        audio.format = format_override;
    }

    let result = state
        .sessions
        .process_recording(session_id, &caller, audio, moments)
        .await;

    metrics::counter!(
        "session_recordings_processed_total",
        "outcome" => outcome_label(&result)
    )
    .increment(1);

    let session = result?;
    Ok(Json(RecordingResponse {
        session_id: session.id,
        status: session.status,
        transcript: session.transcript.clone(),
        summary_raw: session.summary_raw.clone(),
    }))
}

fn outcome_label(result: &Result<Session, SessionError>) -> &'static str {
    match result {
        Ok(_) => "completed",
        Err(SessionError::StoreError(_)) => "upload_failed",
        Err(SessionError::TranscribeError(_)) => "transcribe_failed",
        Err(e) if e.is_conflict() || e.is_not_found() => "rejected",
        Err(SessionError::Validation(_))
        | Err(SessionError::Forbidden(_))
        | Err(SessionError::ConsentMissing(_)) => "rejected",
        Err(_) => "failed",
    }
}
