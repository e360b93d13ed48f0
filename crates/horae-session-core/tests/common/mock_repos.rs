//! Mock repositories, object store and transcriber for pipeline testing

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, Entry};

use horae_db::{
    AudioMetadata, BookingRepository, ConsentRepository, CreateBooking, CreateSession, DbError,
    DbResult, MarkedMomentRepository, SessionRepository,
};
use horae_session_core::{
    MemoryObjectStore, ObjectStore, SessionError, StoredObject, TranscriptionProvider,
};
use horae_types::{
    Booking, BookingId, BookingStatus, ConsentKind, MarkedMoment, Session, SessionId,
    SessionStatus, UserId,
};

/// In-memory booking repository; no slot bookkeeping, session tests do
/// not contend on slots
#[derive(Default, Clone)]
pub struct MockBookingRepository {
    bookings: Arc<DashMap<BookingId, Booking>>,
}

impl MockBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_booking(&self, booking: Booking) {
        self.bookings.insert(booking.id, booking);
    }

    #[allow(dead_code)]
    pub fn get(&self, id: BookingId) -> Option<Booking> {
        self.bookings.get(&id).map(|r| r.value().clone())
    }
}

#[async_trait]
impl BookingRepository for MockBookingRepository {
    async fn create(&self, create: CreateBooking) -> DbResult<Booking> {
        let now = Utc::now();
        let booking = Booking {
            id: create.id,
            client_id: create.client_id,
            provider_id: create.provider_id,
            scheduled_at: create.scheduled_at,
            duration_minutes: create.duration_minutes,
            mode: create.mode,
            location: create.location,
            price_cents: create.price_cents,
            currency: create.currency,
            status: BookingStatus::Pending,
            payment_session_id: None,
            payment_intent_id: None,
            paid_at: None,
            cancelled_at: None,
            cancelled_by: None,
            cancel_reason: None,
            refunded_at: None,
            created_at: now,
            updated_at: now,
        };
        self.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn find_by_id(&self, id: BookingId) -> DbResult<Option<Booking>> {
        Ok(self.bookings.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_payment_intent(&self, payment_intent_id: &str) -> DbResult<Option<Booking>> {
        Ok(self
            .bookings
            .iter()
            .find(|r| r.value().payment_intent_id.as_deref() == Some(payment_intent_id))
            .map(|r| r.value().clone()))
    }

    async fn slot_holding_starts(
        &self,
        provider_id: UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<DateTime<Utc>>> {
        let mut starts: Vec<_> = self
            .bookings
            .iter()
            .filter(|r| {
                let b = r.value();
                b.provider_id == provider_id
                    && b.status.holds_slot()
                    && b.scheduled_at >= from
                    && b.scheduled_at < to
            })
            .map(|r| r.value().scheduled_at)
            .collect();
        starts.sort();
        Ok(starts)
    }

    async fn update_status(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
    ) -> DbResult<bool> {
        let Some(mut booking) = self.bookings.get_mut(&id) else {
            return Ok(false);
        };
        if booking.status != from {
            return Ok(false);
        }
        booking.status = to;
        booking.updated_at = Utc::now();
        Ok(true)
    }

    async fn record_payment_session(&self, id: BookingId, session_id: &str) -> DbResult<()> {
        if let Some(mut booking) = self.bookings.get_mut(&id) {
            booking.payment_session_id = Some(session_id.to_string());
        }
        Ok(())
    }

    async fn confirm_payment(
        &self,
        id: BookingId,
        from: BookingStatus,
        payment_session_id: &str,
        payment_intent_id: Option<&str>,
        paid_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let Some(mut booking) = self.bookings.get_mut(&id) else {
            return Ok(false);
        };
        if booking.status != from {
            return Ok(false);
        }
        booking.status = BookingStatus::Confirmed;
        booking.payment_session_id = Some(payment_session_id.to_string());
        booking.payment_intent_id = payment_intent_id.map(str::to_string);
        booking.paid_at = Some(paid_at);
        Ok(true)
    }

    async fn record_cancellation(
        &self,
        id: BookingId,
        from: BookingStatus,
        cancelled_by: UserId,
        reason: Option<&str>,
    ) -> DbResult<bool> {
        let Some(mut booking) = self.bookings.get_mut(&id) else {
            return Ok(false);
        };
        if booking.status != from {
            return Ok(false);
        }
        booking.status = BookingStatus::Cancelled;
        booking.cancelled_at = Some(Utc::now());
        booking.cancelled_by = Some(cancelled_by);
        booking.cancel_reason = reason.map(str::to_string);
        Ok(true)
    }

    async fn record_refund(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
        refunded_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let Some(mut booking) = self.bookings.get_mut(&id) else {
            return Ok(false);
        };
        if booking.status != from {
            return Ok(false);
        }
        booking.status = to;
        booking.refunded_at = Some(refunded_at);
        Ok(true)
    }

    async fn set_refunded_at(&self, id: BookingId, refunded_at: DateTime<Utc>) -> DbResult<()> {
        if let Some(mut booking) = self.bookings.get_mut(&id) {
            booking.refunded_at = Some(refunded_at);
        }
        Ok(())
    }
}

/// In-memory session repository enforcing one session per booking and
/// recording every successful pipeline status write
#[derive(Default, Clone)]
pub struct MockSessionRepository {
    sessions: Arc<DashMap<SessionId, Session>>,
    by_booking: Arc<DashMap<BookingId, SessionId>>,
    history: Arc<DashMap<SessionId, Vec<SessionStatus>>>,
}

impl MockSessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session directly, bypassing creation rules
    #[allow(dead_code)]
    pub fn insert_session(&self, session: Session) {
        self.by_booking.insert(session.booking_id, session.id);
        self.sessions.insert(session.id, session);
    }

    #[allow(dead_code)]
    pub fn get(&self, id: SessionId) -> Option<Session> {
        self.sessions.get(&id).map(|r| r.value().clone())
    }

    /// Successful pipeline status writes, in order; resets are not
    /// status writes and do not appear
    pub fn status_history(&self, id: SessionId) -> Vec<SessionStatus> {
        self.history.get(&id).map(|r| r.value().clone()).unwrap_or_default()
    }

    fn record(&self, id: SessionId, to: SessionStatus) {
        self.history.entry(id).or_default().push(to);
    }
}

#[async_trait]
impl SessionRepository for MockSessionRepository {
    async fn create(&self, create: CreateSession) -> DbResult<Session> {
        match self.by_booking.entry(create.booking_id) {
            Entry::Occupied(_) => {
                return Err(DbError::UniqueViolation(
                    "sessions_booking_id_key".to_string(),
                ))
            }
            Entry::Vacant(v) => {
                v.insert(create.id);
            }
        }
        let now = Utc::now();
        let session = Session {
            id: create.id,
            booking_id: create.booking_id,
            status: SessionStatus::Idle,
            status_message: None,
            audio_url: None,
            audio_size_bytes: None,
            audio_duration_secs: None,
            audio_format: None,
            transcript: None,
            summary_raw: None,
            summary_final: None,
            uploaded_at: None,
            transcribed_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_by_id(&self, id: SessionId) -> DbResult<Option<Session>> {
        Ok(self.sessions.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_booking(&self, booking_id: BookingId) -> DbResult<Option<Session>> {
        let Some(id) = self.by_booking.get(&booking_id).map(|r| *r.value()) else {
            return Ok(None);
        };
        Ok(self.sessions.get(&id).map(|r| r.value().clone()))
    }

    async fn update_status(
        &self,
        id: SessionId,
        from: SessionStatus,
        to: SessionStatus,
    ) -> DbResult<bool> {
        let Some(mut session) = self.sessions.get_mut(&id) else {
            return Ok(false);
        };
        if session.status != from {
            return Ok(false);
        }
        session.status = to;
        session.updated_at = Utc::now();
        drop(session);
        self.record(id, to);
        Ok(true)
    }

    async fn mark_failed(
        &self,
        id: SessionId,
        from: SessionStatus,
        to: SessionStatus,
        message: &str,
    ) -> DbResult<bool> {
        let Some(mut session) = self.sessions.get_mut(&id) else {
            return Ok(false);
        };
        if session.status != from {
            return Ok(false);
        }
        session.status = to;
        session.status_message = Some(message.to_string());
        session.updated_at = Utc::now();
        drop(session);
        self.record(id, to);
        Ok(true)
    }

    async fn set_audio(
        &self,
        id: SessionId,
        audio: AudioMetadata,
        uploaded_at: DateTime<Utc>,
    ) -> DbResult<()> {
        if let Some(mut session) = self.sessions.get_mut(&id) {
            session.audio_url = Some(audio.url);
            session.audio_size_bytes = Some(audio.size_bytes);
            session.audio_duration_secs = audio.duration_secs;
            session.audio_format = audio.format;
            session.uploaded_at = Some(uploaded_at);
            session.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_transcript(
        &self,
        id: SessionId,
        transcript: &str,
        transcribed_at: DateTime<Utc>,
    ) -> DbResult<()> {
        if let Some(mut session) = self.sessions.get_mut(&id) {
            session.transcript = Some(transcript.to_string());
            session.transcribed_at = Some(transcribed_at);
            session.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_summary_raw(&self, id: SessionId, summary: &str) -> DbResult<()> {
        if let Some(mut session) = self.sessions.get_mut(&id) {
            session.summary_raw = Some(summary.to_string());
            session.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn complete(
        &self,
        id: SessionId,
        from: SessionStatus,
        completed_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let Some(mut session) = self.sessions.get_mut(&id) else {
            return Ok(false);
        };
        if session.status != from {
            return Ok(false);
        }
        session.status = SessionStatus::Completed;
        session.status_message = None;
        session.completed_at = Some(completed_at);
        session.updated_at = Utc::now();
        drop(session);
        self.record(id, SessionStatus::Completed);
        Ok(true)
    }

    async fn set_summary_final(&self, id: SessionId, summary: &str) -> DbResult<()> {
        if let Some(mut session) = self.sessions.get_mut(&id) {
            session.summary_final = Some(summary.to_string());
            session.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn reset(&self, id: SessionId) -> DbResult<()> {
        if let Some(mut session) = self.sessions.get_mut(&id) {
            session.status = SessionStatus::Idle;
            session.status_message = None;
            session.audio_url = None;
            session.audio_size_bytes = None;
            session.audio_duration_secs = None;
            session.audio_format = None;
            session.transcript = None;
            session.summary_raw = None;
            session.summary_final = None;
            session.uploaded_at = None;
            session.transcribed_at = None;
            session.completed_at = None;
            session.updated_at = Utc::now();
        }
        Ok(())
    }
}

/// In-memory consent repository
#[derive(Default, Clone)]
pub struct MockConsentRepository {
    grants: Arc<DashMap<(SessionId, UserId, ConsentKind), DateTime<Utc>>>,
}

impl MockConsentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConsentRepository for MockConsentRepository {
    async fn grant(
        &self,
        session_id: SessionId,
        user_id: UserId,
        kind: ConsentKind,
    ) -> DbResult<()> {
        self.grants
            .entry((session_id, user_id, kind))
            .or_insert_with(Utc::now);
        Ok(())
    }

    async fn kinds_for(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> DbResult<Vec<ConsentKind>> {
        Ok(self
            .grants
            .iter()
            .filter(|r| r.key().0 == session_id && r.key().1 == user_id)
            .map(|r| r.key().2)
            .collect())
    }

    async fn delete_for_session(&self, session_id: SessionId) -> DbResult<u64> {
        let before = self.grants.len();
        self.grants.retain(|key, _| key.0 != session_id);
        Ok((before - self.grants.len()) as u64)
    }
}

/// In-memory marked moment repository
#[derive(Default, Clone)]
pub struct MockMomentRepository {
    moments: Arc<DashMap<SessionId, Vec<MarkedMoment>>>,
}

impl MockMomentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MarkedMomentRepository for MockMomentRepository {
    async fn replace_for_session(
        &self,
        session_id: SessionId,
        moments: &[MarkedMoment],
    ) -> DbResult<()> {
        self.moments.insert(session_id, moments.to_vec());
        Ok(())
    }

    async fn find_by_session(&self, session_id: SessionId) -> DbResult<Vec<MarkedMoment>> {
        let mut moments = self
            .moments
            .get(&session_id)
            .map(|r| r.value().clone())
            .unwrap_or_default();
        moments.sort_by(|a, b| {
            a.timestamp_secs
                .partial_cmp(&b.timestamp_secs)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(moments)
    }

    async fn delete_for_session(&self, session_id: SessionId) -> DbResult<u64> {
        Ok(self
            .moments
            .remove(&session_id)
            .map(|(_, v)| v.len() as u64)
            .unwrap_or(0))
    }
}

/// Object store fake with switchable failures and latency
#[derive(Default, Clone)]
pub struct FakeObjectStore {
    inner: MemoryObjectStore,
    state: Arc<FakeStoreState>,
}

#[derive(Default)]
struct FakeStoreState {
    failing: AtomicBool,
    delay_ms: AtomicU64,
}

impl FakeObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent uploads fail (or succeed again)
    pub fn fail_uploads(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    /// Delay every upload by the given duration
    #[allow(dead_code)]
    pub fn delay_uploads(&self, delay: Duration) {
        self.state
            .delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    #[allow(dead_code)]
    pub fn object_count(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<StoredObject, SessionError> {
        let delay = self.state.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.state.failing.load(Ordering::SeqCst) {
            return Err(SessionError::StoreError(
                "simulated store outage".to_string(),
            ));
        }
        self.inner.put(key, content_type, body).await
    }
}

/// Transcription fake with switchable per-call failures
#[derive(Default, Clone)]
pub struct FakeTranscriber {
    state: Arc<FakeTranscriberState>,
}

#[derive(Default)]
struct FakeTranscriberState {
    fail_transcribe: AtomicBool,
    fail_summarize: AtomicBool,
    delay_ms: AtomicU64,
    seen_hints: Mutex<Vec<Vec<String>>>,
}

impl FakeTranscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_transcriptions(&self, failing: bool) {
        self.state.fail_transcribe.store(failing, Ordering::SeqCst);
    }

    pub fn fail_summaries(&self, failing: bool) {
        self.state.fail_summarize.store(failing, Ordering::SeqCst);
    }

    /// Delay every provider call by the given duration
    #[allow(dead_code)]
    pub fn delay_calls(&self, delay: Duration) {
        self.state
            .delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Hint lists passed to `transcribe`, in call order
    pub fn hints_seen(&self) -> Vec<Vec<String>> {
        self.state.seen_hints.lock().unwrap().clone()
    }

    async fn delay(&self) {
        let delay = self.state.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }
}

#[async_trait]
impl TranscriptionProvider for FakeTranscriber {
    async fn transcribe(&self, audio_url: &str, hints: &[String]) -> Result<String, SessionError> {
        self.delay().await;
        self.state.seen_hints.lock().unwrap().push(hints.to_vec());
        if self.state.fail_transcribe.load(Ordering::SeqCst) {
            return Err(SessionError::TranscribeError(
                "simulated transcription outage".to_string(),
            ));
        }
        Ok(format!("transcript for {audio_url}"))
    }

    async fn summarize(
        &self,
        transcript: &str,
        _hints: &[String],
    ) -> Result<String, SessionError> {
        self.delay().await;
        if self.state.fail_summarize.load(Ordering::SeqCst) {
            return Err(SessionError::TranscribeError(
                "simulated summarizer outage".to_string(),
            ));
        }
        Ok(format!("summary of {} characters", transcript.len()))
    }
}
