//! Consent-gated recording pipeline
//!
//! A session walks `Idle → Recording → Uploading → Transcribing →
//! Summarizing → Completed`. Stage entry and exit statuses are written
//! with compare-and-swap updates, so a duplicate of an in-flight call
//! loses the swap and surfaces a conflict instead of double-running a
//! stage. Upstream failures land in the stage's failure status with a
//! message; they never leave the session in a lying state.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};

use horae_db::{
    AudioMetadata, BookingRepository, ConsentRepository, CreateSession, MarkedMomentRepository,
    SessionRepository,
};
use horae_types::{
    Actor, Booking, BookingId, BookingStatus, ConsentKind, MarkedMoment, RecordingAuthorization,
    Session, SessionId, SessionStatus,
};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::store::{ObjectStore, StoredObject};
use crate::transcribe::TranscriptionProvider;

/// A client-captured audio file ready for upload
#[derive(Debug, Clone)]
pub struct AudioUpload {
    /// Raw audio bytes
    pub body: Bytes,
    /// MIME type reported by the client
    pub content_type: String,
    /// Container format, e.g. `m4a`
    pub format: Option<String>,
    /// Recording length in seconds, as reported by the client
    pub duration_secs: Option<f64>,
}

/// Owns the session lifecycle from consent collection to the validated
/// summary
#[derive(Clone)]
pub struct SessionService {
    bookings: Arc<dyn BookingRepository>,
    sessions: Arc<dyn SessionRepository>,
    consents: Arc<dyn ConsentRepository>,
    moments: Arc<dyn MarkedMomentRepository>,
    store: Arc<dyn ObjectStore>,
    transcriber: Arc<dyn TranscriptionProvider>,
    config: SessionConfig,
}

impl SessionService {
    /// Create a new session service
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        sessions: Arc<dyn SessionRepository>,
        consents: Arc<dyn ConsentRepository>,
        moments: Arc<dyn MarkedMomentRepository>,
        store: Arc<dyn ObjectStore>,
        transcriber: Arc<dyn TranscriptionProvider>,
        config: SessionConfig,
    ) -> Self {
        Self {
            bookings,
            sessions,
            consents,
            moments,
            store,
            transcriber,
            config,
        }
    }

    /// Open the session for a booking, creating it on first call
    ///
    /// Idempotent: an existing session is returned as-is, whatever state
    /// the booking has moved to since.
    pub async fn create_session(
        &self,
        booking_id: BookingId,
        actor: &Actor,
    ) -> Result<Session, SessionError> {
        let booking = self
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or(SessionError::BookingNotFound)?;
        ensure_party(&booking, actor, "open a session for")?;

        if let Some(existing) = self.sessions.find_by_booking(booking_id).await? {
            return Ok(existing);
        }
        if !matches!(
            booking.status,
            BookingStatus::Confirmed | BookingStatus::InProgress
        ) {
            return Err(SessionError::BookingNotReady(booking.status));
        }

        let create = CreateSession {
            id: SessionId::new(),
            booking_id,
        };
        match self.sessions.create(create).await {
            Ok(session) => {
                info!(session_id = %session.id, booking_id = %booking_id, "Session created");
                Ok(session)
            }
            // Lost a creation race; the winner's session is the session.
            Err(e) if e.is_unique_violation() => self
                .sessions
                .find_by_booking(booking_id)
                .await?
                .ok_or_else(|| {
                    SessionError::Internal("session missing after unique violation".to_string())
                }),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch a session the actor is allowed to see
    pub async fn get_session(
        &self,
        session_id: SessionId,
        actor: &Actor,
    ) -> Result<Session, SessionError> {
        let (session, booking) = self.session_with_booking(session_id).await?;
        ensure_party(&booking, actor, "view")?;
        Ok(session)
    }

    /// Record a consent grant by the actor; granting twice is a no-op
    pub async fn grant_consent(
        &self,
        session_id: SessionId,
        actor: &Actor,
        kind: ConsentKind,
    ) -> Result<(), SessionError> {
        let (_, booking) = self.session_with_booking(session_id).await?;
        ensure_party(&booking, actor, "grant consent on")?;

        self.consents.grant(session_id, actor.user_id, kind).await?;
        info!(session_id = %session_id, user_id = %actor.user_id, kind = %kind, "Consent granted");
        Ok(())
    }

    /// Whether recording may start, and which client consents are missing
    pub async fn recording_authorization(
        &self,
        session_id: SessionId,
    ) -> Result<RecordingAuthorization, SessionError> {
        let (_, booking) = self.session_with_booking(session_id).await?;
        let granted = self
            .consents
            .kinds_for(session_id, booking.client_id)
            .await?;
        let missing: Vec<ConsentKind> = ConsentKind::REQUIRED
            .iter()
            .copied()
            .filter(|kind| !granted.contains(kind))
            .collect();
        Ok(RecordingAuthorization {
            authorized: missing.is_empty(),
            missing,
        })
    }

    /// Report that capture started on the client device
    ///
    /// This is the capture-initiating call, so the consent gate bites
    /// here. A repeated report for an already recording session is a
    /// no-op.
    pub async fn start_recording(
        &self,
        session_id: SessionId,
        actor: &Actor,
    ) -> Result<Session, SessionError> {
        let (session, booking) = self.session_with_booking(session_id).await?;
        ensure_party(&booking, actor, "record")?;

        let authorization = self.recording_authorization(session_id).await?;
        if !authorization.authorized {
            return Err(SessionError::ConsentMissing(authorization.missing));
        }

        match session.status {
            SessionStatus::Recording => Ok(session),
            SessionStatus::Idle => {
                if !self
                    .sessions
                    .update_status(session_id, SessionStatus::Idle, SessionStatus::Recording)
                    .await?
                {
                    return Err(SessionError::ConcurrentUpdate);
                }
                info!(session_id = %session_id, "Recording started");
                self.refreshed(session_id).await
            }
            status => Err(SessionError::InvalidTransition {
                from: status,
                to: SessionStatus::Recording,
            }),
        }
    }

    /// Run the full pipeline over an uploaded recording
    ///
    /// Safe to re-run after an `UploadFailed`/`TranscribeFailed` outcome;
    /// every stage overwrites the previous attempt's partial state.
    #[instrument(skip(self, actor, audio, moments), fields(size = audio.body.len()))]
    pub async fn process_recording(
        &self,
        session_id: SessionId,
        actor: &Actor,
        audio: AudioUpload,
        moments: Vec<MarkedMoment>,
    ) -> Result<Session, SessionError> {
        let (session, booking) = self.session_with_booking(session_id).await?;
        ensure_party(&booking, actor, "upload a recording for")?;

        if audio.body.is_empty() {
            return Err(SessionError::Validation("audio body is empty".to_string()));
        }
        if !session.status.can_accept_recording() {
            return Err(SessionError::InvalidTransition {
                from: session.status,
                to: SessionStatus::Uploading,
            });
        }
        // Entering Uploading is the mutual exclusion point; a concurrent
        // duplicate loses this swap.
        if !self
            .sessions
            .update_status(session_id, session.status, SessionStatus::Uploading)
            .await?
        {
            return Err(SessionError::ConcurrentUpdate);
        }

        let stored = self.upload_stage(session_id, &booking, &audio).await?;
        self.persist_stage(session_id, &audio, &stored, &moments)
            .await?;
        let hints = self.load_hints(session_id).await?;
        let transcript = self
            .transcribe_stage(session_id, &stored.url, &hints)
            .await?;
        let session = self
            .summarize_stage(session_id, &booking, &transcript, &hints)
            .await?;

        info!(
            session_id = %session_id,
            booking_id = %booking.id,
            transcript_chars = transcript.len(),
            "Recording pipeline completed"
        );
        Ok(session)
    }

    /// Store the provider-validated summary on a completed session
    pub async fn validate_summary(
        &self,
        session_id: SessionId,
        actor: &Actor,
        final_text: &str,
    ) -> Result<Session, SessionError> {
        let (session, booking) = self.session_with_booking(session_id).await?;
        if booking.provider_id != actor.user_id && !actor.is_admin() {
            return Err(SessionError::Forbidden(
                "only the provider may validate the summary".to_string(),
            ));
        }
        if session.status != SessionStatus::Completed {
            return Err(SessionError::SummaryNotReady(session.status));
        }
        if final_text.trim().is_empty() {
            return Err(SessionError::Validation(
                "validated summary must not be empty".to_string(),
            ));
        }

        self.sessions
            .set_summary_final(session_id, final_text)
            .await?;
        info!(session_id = %session_id, "Summary validated");
        self.refreshed(session_id).await
    }

    /// Wipe the session back to `Idle` and hand the booking back
    ///
    /// Clears pipeline fields, consents and marked moments. A booking the
    /// pipeline completed reverts to `Confirmed`.
    pub async fn reset_session(
        &self,
        session_id: SessionId,
        actor: &Actor,
    ) -> Result<Session, SessionError> {
        let (_, booking) = self.session_with_booking(session_id).await?;
        ensure_party(&booking, actor, "reset")?;

        self.sessions.reset(session_id).await?;
        self.consents.delete_for_session(session_id).await?;
        self.moments.delete_for_session(session_id).await?;

        if booking.status == BookingStatus::Completed {
            let reverted = self
                .bookings
                .update_status(booking.id, BookingStatus::Completed, BookingStatus::Confirmed)
                .await?;
            if !reverted {
                warn!(booking_id = %booking.id, "Booking moved during reset; leaving it alone");
            }
        }

        info!(session_id = %session_id, booking_id = %booking.id, "Session reset");
        self.refreshed(session_id).await
    }

    async fn upload_stage(
        &self,
        session_id: SessionId,
        booking: &Booking,
        audio: &AudioUpload,
    ) -> Result<StoredObject, SessionError> {
        let key = audio_key(booking.id, session_id, audio.format.as_deref());
        let uploaded = timeout(
            self.config.upload_timeout,
            self.store.put(&key, &audio.content_type, audio.body.clone()),
        )
        .await;

        match uploaded {
            Ok(Ok(stored)) => Ok(stored),
            Ok(Err(e)) => {
                self.record_failure(
                    session_id,
                    SessionStatus::Uploading,
                    SessionStatus::UploadFailed,
                    &e.to_string(),
                )
                .await;
                Err(e)
            }
            Err(_) => {
                let message = "audio upload timed out";
                self.record_failure(
                    session_id,
                    SessionStatus::Uploading,
                    SessionStatus::UploadFailed,
                    message,
                )
                .await;
                Err(SessionError::StoreError(message.to_string()))
            }
        }
    }

    async fn persist_stage(
        &self,
        session_id: SessionId,
        audio: &AudioUpload,
        stored: &StoredObject,
        moments: &[MarkedMoment],
    ) -> Result<(), SessionError> {
        let metadata = AudioMetadata {
            url: stored.url.clone(),
            size_bytes: stored.size_bytes,
            duration_secs: audio.duration_secs,
            format: audio.format.clone(),
        };
        if let Err(e) = self.sessions.set_audio(session_id, metadata, Utc::now()).await {
            self.record_failure(
                session_id,
                SessionStatus::Uploading,
                SessionStatus::Failed,
                "failed to persist audio metadata",
            )
            .await;
            return Err(e.into());
        }

        match self
            .sessions
            .update_status(session_id, SessionStatus::Uploading, SessionStatus::Transcribing)
            .await
        {
            Ok(true) => {}
            Ok(false) => return Err(SessionError::ConcurrentUpdate),
            Err(e) => {
                self.record_failure(
                    session_id,
                    SessionStatus::Uploading,
                    SessionStatus::Failed,
                    "failed to advance past upload",
                )
                .await;
                return Err(e.into());
            }
        }

        if let Err(e) = self.moments.replace_for_session(session_id, moments).await {
            self.record_failure(
                session_id,
                SessionStatus::Transcribing,
                SessionStatus::Failed,
                "failed to save marked moments",
            )
            .await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Notes of the just-saved moments, in timestamp order, as provider
    /// hints
    async fn load_hints(&self, session_id: SessionId) -> Result<Vec<String>, SessionError> {
        match self.moments.find_by_session(session_id).await {
            Ok(saved) => Ok(saved.into_iter().filter_map(|m| m.note).collect()),
            Err(e) => {
                self.record_failure(
                    session_id,
                    SessionStatus::Transcribing,
                    SessionStatus::Failed,
                    "failed to load marked moments",
                )
                .await;
                Err(e.into())
            }
        }
    }

    async fn transcribe_stage(
        &self,
        session_id: SessionId,
        audio_url: &str,
        hints: &[String],
    ) -> Result<String, SessionError> {
        let transcribed = timeout(
            self.config.transcribe_timeout,
            self.transcriber.transcribe(audio_url, hints),
        )
        .await;
        let transcript = match transcribed {
            Ok(Ok(transcript)) => transcript,
            Ok(Err(e)) => {
                self.record_failure(
                    session_id,
                    SessionStatus::Transcribing,
                    SessionStatus::TranscribeFailed,
                    &e.to_string(),
                )
                .await;
                return Err(e);
            }
            Err(_) => {
                let message = "transcription timed out";
                self.record_failure(
                    session_id,
                    SessionStatus::Transcribing,
                    SessionStatus::TranscribeFailed,
                    message,
                )
                .await;
                return Err(SessionError::TranscribeError(message.to_string()));
            }
        };

        if let Err(e) = self
            .sessions
            .set_transcript(session_id, &transcript, Utc::now())
            .await
        {
            self.record_failure(
                session_id,
                SessionStatus::Transcribing,
                SessionStatus::Failed,
                "failed to persist transcript",
            )
            .await;
            return Err(e.into());
        }
        Ok(transcript)
    }

    async fn summarize_stage(
        &self,
        session_id: SessionId,
        booking: &Booking,
        transcript: &str,
        hints: &[String],
    ) -> Result<Session, SessionError> {
        match self
            .sessions
            .update_status(session_id, SessionStatus::Transcribing, SessionStatus::Summarizing)
            .await
        {
            Ok(true) => {}
            Ok(false) => return Err(SessionError::ConcurrentUpdate),
            Err(e) => {
                self.record_failure(
                    session_id,
                    SessionStatus::Transcribing,
                    SessionStatus::Failed,
                    "failed to advance past transcription",
                )
                .await;
                return Err(e.into());
            }
        }

        let summarized = timeout(
            self.config.transcribe_timeout,
            self.transcriber.summarize(transcript, hints),
        )
        .await;
        let summary = match summarized {
            Ok(Ok(summary)) => summary,
            Ok(Err(e)) => {
                self.record_failure(
                    session_id,
                    SessionStatus::Summarizing,
                    SessionStatus::Failed,
                    &e.to_string(),
                )
                .await;
                return Err(e);
            }
            Err(_) => {
                let message = "summarization timed out";
                self.record_failure(
                    session_id,
                    SessionStatus::Summarizing,
                    SessionStatus::Failed,
                    message,
                )
                .await;
                return Err(SessionError::TranscribeError(message.to_string()));
            }
        };

        if let Err(e) = self.sessions.set_summary_raw(session_id, &summary).await {
            self.record_failure(
                session_id,
                SessionStatus::Summarizing,
                SessionStatus::Failed,
                "failed to persist summary",
            )
            .await;
            return Err(e.into());
        }

        if !self
            .sessions
            .complete(session_id, SessionStatus::Summarizing, Utc::now())
            .await?
        {
            return Err(SessionError::ConcurrentUpdate);
        }
        self.cascade_booking_completion(booking.id).await;
        self.refreshed(session_id).await
    }

    /// Move the owning booking to `Completed` once the pipeline finished
    ///
    /// Best effort: the session already completed, so cascade problems
    /// are logged rather than surfaced to the uploader.
    async fn cascade_booking_completion(&self, booking_id: BookingId) {
        let current = match self.bookings.find_by_id(booking_id).await {
            Ok(Some(b)) => b,
            Ok(None) => {
                error!(booking_id = %booking_id, "Booking disappeared before completion cascade");
                return;
            }
            Err(e) => {
                error!(booking_id = %booking_id, error = %e, "Failed to load booking for completion cascade");
                return;
            }
        };
        if !matches!(
            current.status,
            BookingStatus::Confirmed | BookingStatus::InProgress
        ) {
            warn!(
                booking_id = %booking_id,
                status = %current.status,
                "Booking not in a completable state; skipping cascade"
            );
            return;
        }
        match self
            .bookings
            .update_status(booking_id, current.status, BookingStatus::Completed)
            .await
        {
            Ok(true) => {
                info!(booking_id = %booking_id, "Booking completed by session pipeline");
            }
            Ok(false) => {
                warn!(booking_id = %booking_id, "Booking moved during the pipeline; not cascading");
            }
            Err(e) => {
                error!(booking_id = %booking_id, error = %e, "Failed to cascade booking completion");
            }
        }
    }

    /// Put the session into a failure status with a message, best effort
    async fn record_failure(
        &self,
        session_id: SessionId,
        from: SessionStatus,
        to: SessionStatus,
        message: &str,
    ) {
        match self.sessions.mark_failed(session_id, from, to, message).await {
            Ok(true) => {
                warn!(session_id = %session_id, status = %to, message = %message, "Pipeline stage failed");
            }
            Ok(false) => {
                warn!(session_id = %session_id, "Session moved while recording a stage failure");
            }
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Failed to record a stage failure");
            }
        }
    }

    async fn session_with_booking(
        &self,
        session_id: SessionId,
    ) -> Result<(Session, Booking), SessionError> {
        let session = self
            .sessions
            .find_by_id(session_id)
            .await?
            .ok_or(SessionError::SessionNotFound)?;
        let booking = self
            .bookings
            .find_by_id(session.booking_id)
            .await?
            .ok_or_else(|| {
                SessionError::Internal(format!("booking missing for session {session_id}"))
            })?;
        Ok((session, booking))
    }

    async fn refreshed(&self, session_id: SessionId) -> Result<Session, SessionError> {
        self.sessions
            .find_by_id(session_id)
            .await?
            .ok_or(SessionError::SessionNotFound)
    }
}

/// Allow the booking's client, its provider, or an admin
fn ensure_party(booking: &Booking, actor: &Actor, action: &str) -> Result<(), SessionError> {
    if actor.is_admin()
        || booking.client_id == actor.user_id
        || booking.provider_id == actor.user_id
    {
        Ok(())
    } else {
        Err(SessionError::Forbidden(format!(
            "not allowed to {action} this session"
        )))
    }
}

/// Object key for a session's audio, stable across re-uploads
fn audio_key(booking_id: BookingId, session_id: SessionId, format: Option<&str>) -> String {
    let ext = format
        .filter(|f| !f.is_empty() && f.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin");
    format!("recordings/{booking_id}/{session_id}.{ext}")
}
