//! Repository traits
//!
//! Async repository interfaces over the typed domain model. Status
//! updates are compare-and-swap: they name the status the caller
//! observed, affect zero rows when the stored status moved on, and
//! report that through their `bool` return so the caller can surface a
//! conflict instead of overwriting someone else's transition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use horae_types::{
    AvailabilityWindow, Booking, BookingId, BookingMode, BookingStatus, ConsentKind, MarkedMoment,
    ProviderProfile, Session, SessionId, SessionStatus, TimeOfDay, User, UserId, WindowId,
};

use crate::error::DbResult;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by ID
    async fn find_by_id(&self, id: UserId) -> DbResult<Option<User>>;

    /// Find the provider profile for a user, if one exists
    async fn find_provider(&self, id: UserId) -> DbResult<Option<ProviderProfile>>;
}

/// Availability window repository trait
#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    /// Create a new window
    async fn create(&self, window: CreateWindow) -> DbResult<AvailabilityWindow>;

    /// Delete a window owned by the given provider; returns the number
    /// of rows removed (0 when the window does not exist or belongs to
    /// someone else)
    async fn delete(&self, id: WindowId, provider_id: UserId) -> DbResult<u64>;

    /// All windows of a provider, ordered by day then start
    async fn find_by_provider(&self, provider_id: UserId) -> DbResult<Vec<AvailabilityWindow>>;

    /// Windows of a provider on one day of the week
    async fn find_by_provider_and_day(
        &self,
        provider_id: UserId,
        day_of_week: i16,
    ) -> DbResult<Vec<AvailabilityWindow>>;
}

/// Create availability window input
#[derive(Debug, Clone)]
pub struct CreateWindow {
    pub id: WindowId,
    pub provider_id: UserId,
    pub day_of_week: i16,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

/// Booking repository trait
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert a new booking in `Pending` status
    ///
    /// The bookings table carries a partial unique index over
    /// `(provider_id, scheduled_at)` for slot-holding statuses; a
    /// concurrent double-book surfaces as
    /// [`DbError::UniqueViolation`](crate::DbError::UniqueViolation).
    async fn create(&self, booking: CreateBooking) -> DbResult<Booking>;

    /// Find a booking by ID
    async fn find_by_id(&self, id: BookingId) -> DbResult<Option<Booking>>;

    /// Find a booking by the payment intent recorded at confirmation
    async fn find_by_payment_intent(&self, payment_intent_id: &str) -> DbResult<Option<Booking>>;

    /// Start times of slot-holding (`Pending`/`Confirmed`) bookings of
    /// a provider within `[from, to)`
    async fn slot_holding_starts(
        &self,
        provider_id: UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<DateTime<Utc>>>;

    /// Compare-and-swap status update; `false` when the stored status
    /// no longer equals `from`
    async fn update_status(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
    ) -> DbResult<bool>;

    /// Record the checkout session created for this booking
    async fn record_payment_session(&self, id: BookingId, session_id: &str) -> DbResult<()>;

    /// Confirm payment: status to `Confirmed` plus payment ids and
    /// `paid_at`, guarded on the observed status
    async fn confirm_payment(
        &self,
        id: BookingId,
        from: BookingStatus,
        payment_session_id: &str,
        payment_intent_id: Option<&str>,
        paid_at: DateTime<Utc>,
    ) -> DbResult<bool>;

    /// Cancel: status to `Cancelled` plus who/when/why, guarded on the
    /// observed status
    async fn record_cancellation(
        &self,
        id: BookingId,
        from: BookingStatus,
        cancelled_by: UserId,
        reason: Option<&str>,
    ) -> DbResult<bool>;

    /// Record a refund: status to `Refunded` or `PartiallyRefunded`
    /// plus `refunded_at`, guarded on the observed status
    async fn record_refund(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
        refunded_at: DateTime<Utc>,
    ) -> DbResult<bool>;

    /// Set `refunded_at` without touching the status; used when money
    /// moved but the lifecycle has no legal edge left to take
    async fn set_refunded_at(&self, id: BookingId, refunded_at: DateTime<Utc>) -> DbResult<()>;
}

/// Create booking input
#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub id: BookingId,
    pub client_id: UserId,
    pub provider_id: UserId,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub mode: BookingMode,
    pub location: Option<String>,
    pub price_cents: i64,
    pub currency: String,
}

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert a new `Idle` session; at most one session may exist per
    /// booking, enforced by a unique constraint
    async fn create(&self, session: CreateSession) -> DbResult<Session>;

    /// Find a session by ID
    async fn find_by_id(&self, id: SessionId) -> DbResult<Option<Session>>;

    /// Find the session attached to a booking
    async fn find_by_booking(&self, booking_id: BookingId) -> DbResult<Option<Session>>;

    /// Compare-and-swap status update; `false` when the stored status
    /// no longer equals `from`
    async fn update_status(
        &self,
        id: SessionId,
        from: SessionStatus,
        to: SessionStatus,
    ) -> DbResult<bool>;

    /// Move to a failure status and record the failure message,
    /// guarded on the observed status
    async fn mark_failed(
        &self,
        id: SessionId,
        from: SessionStatus,
        to: SessionStatus,
        message: &str,
    ) -> DbResult<bool>;

    /// Persist uploaded-audio metadata and `uploaded_at`
    async fn set_audio(
        &self,
        id: SessionId,
        audio: AudioMetadata,
        uploaded_at: DateTime<Utc>,
    ) -> DbResult<()>;

    /// Persist the transcript and `transcribed_at`
    async fn set_transcript(
        &self,
        id: SessionId,
        transcript: &str,
        transcribed_at: DateTime<Utc>,
    ) -> DbResult<()>;

    /// Persist the machine-generated summary
    async fn set_summary_raw(&self, id: SessionId, summary: &str) -> DbResult<()>;

    /// Finish the pipeline: status to `Completed`, `completed_at` set,
    /// stale failure message cleared, guarded on the observed status
    async fn complete(
        &self,
        id: SessionId,
        from: SessionStatus,
        completed_at: DateTime<Utc>,
    ) -> DbResult<bool>;

    /// Persist the provider-validated summary
    async fn set_summary_final(&self, id: SessionId, summary: &str) -> DbResult<()>;

    /// Wipe the session back to `Idle`: clears audio metadata,
    /// transcript, summaries, failure message and stage timestamps
    async fn reset(&self, id: SessionId) -> DbResult<()>;
}

/// Create session input
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub id: SessionId,
    pub booking_id: BookingId,
}

/// Uploaded-audio metadata
#[derive(Debug, Clone)]
pub struct AudioMetadata {
    pub url: String,
    pub size_bytes: i64,
    pub duration_secs: Option<f64>,
    pub format: Option<String>,
}

/// Consent repository trait
#[async_trait]
pub trait ConsentRepository: Send + Sync {
    /// Record a consent grant; granting the same kind twice is a no-op
    async fn grant(&self, session_id: SessionId, user_id: UserId, kind: ConsentKind)
        -> DbResult<()>;

    /// Consent kinds a user has granted for a session
    async fn kinds_for(&self, session_id: SessionId, user_id: UserId)
        -> DbResult<Vec<ConsentKind>>;

    /// Remove every consent row of a session; returns rows removed
    async fn delete_for_session(&self, session_id: SessionId) -> DbResult<u64>;
}

/// Marked moment repository trait
#[async_trait]
pub trait MarkedMomentRepository: Send + Sync {
    /// Replace all moments of a session with the given list
    async fn replace_for_session(
        &self,
        session_id: SessionId,
        moments: &[MarkedMoment],
    ) -> DbResult<()>;

    /// Moments of a session ordered by timestamp
    async fn find_by_session(&self, session_id: SessionId) -> DbResult<Vec<MarkedMoment>>;

    /// Remove every moment of a session; returns rows removed
    async fn delete_for_session(&self, session_id: SessionId) -> DbResult<u64>;
}
