//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow
//! derive. Status, role, mode and kind columns are stored as text;
//! the `TryFrom` conversions below parse them into the closed enums
//! from `horae-types` and reject anything outside the domain model.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use horae_types::{
    AvailabilityWindow, Booking, MarkedMoment, ProviderProfile, Session, TimeOfDay, User,
};

use crate::error::DbError;

/// User row from the database
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub role: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

/// Provider profile row from the database
#[derive(Debug, Clone, FromRow)]
pub struct ProviderProfileRow {
    pub user_id: Uuid,
    pub verified: bool,
    pub hourly_rate_cents: Option<i64>,
    pub currency: String,
}

/// Availability window row from the database
#[derive(Debug, Clone, FromRow)]
pub struct AvailabilityWindowRow {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub day_of_week: i16,
    pub start_minute: i32,
    pub end_minute: i32,
    pub created_at: DateTime<Utc>,
}

/// Booking row from the database
#[derive(Debug, Clone, FromRow)]
pub struct BookingRow {
    pub id: Uuid,
    pub client_id: Uuid,
    pub provider_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub mode: String,
    pub location: Option<String>,
    pub price_cents: i64,
    pub currency: String,
    pub status: String,
    pub payment_session_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<Uuid>,
    pub cancel_reason: Option<String>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Session row from the database
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub status: String,
    pub status_message: Option<String>,
    pub audio_url: Option<String>,
    pub audio_size_bytes: Option<i64>,
    pub audio_duration_secs: Option<f64>,
    pub audio_format: Option<String>,
    pub transcript: Option<String>,
    pub summary_raw: Option<String>,
    pub summary_final: Option<String>,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub transcribed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Marked moment row from the database
#[derive(Debug, Clone, FromRow)]
pub struct MarkedMomentRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub timestamp_secs: f64,
    pub note: Option<String>,
}

// Conversions from row types to horae-types domain types. Parse
// failures surface as `DbError::Corrupt` rather than panicking; a row
// that fails here was written by something other than this codebase.

fn corrupt(e: impl std::fmt::Display) -> DbError {
    DbError::Corrupt(e.to_string())
}

fn minute_of_day(value: i32) -> Result<TimeOfDay, DbError> {
    u16::try_from(value)
        .ok()
        .and_then(TimeOfDay::from_minutes)
        .ok_or_else(|| corrupt(format!("minute of day out of range: {value}")))
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id.into(),
            role: row.role.parse().map_err(corrupt)?,
            display_name: row.display_name,
            created_at: row.created_at,
        })
    }
}

impl From<ProviderProfileRow> for ProviderProfile {
    fn from(row: ProviderProfileRow) -> Self {
        ProviderProfile {
            user_id: row.user_id.into(),
            verified: row.verified,
            hourly_rate_cents: row.hourly_rate_cents,
            currency: row.currency,
        }
    }
}

impl TryFrom<AvailabilityWindowRow> for AvailabilityWindow {
    type Error = DbError;

    fn try_from(row: AvailabilityWindowRow) -> Result<Self, Self::Error> {
        Ok(AvailabilityWindow {
            id: row.id.into(),
            provider_id: row.provider_id.into(),
            day_of_week: row.day_of_week,
            start: minute_of_day(row.start_minute)?,
            end: minute_of_day(row.end_minute)?,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<BookingRow> for Booking {
    type Error = DbError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id.into(),
            client_id: row.client_id.into(),
            provider_id: row.provider_id.into(),
            scheduled_at: row.scheduled_at,
            duration_minutes: row.duration_minutes,
            mode: row.mode.parse().map_err(corrupt)?,
            location: row.location,
            price_cents: row.price_cents,
            currency: row.currency,
            status: row.status.parse().map_err(corrupt)?,
            payment_session_id: row.payment_session_id,
            payment_intent_id: row.payment_intent_id,
            paid_at: row.paid_at,
            cancelled_at: row.cancelled_at,
            cancelled_by: row.cancelled_by.map(Into::into),
            cancel_reason: row.cancel_reason,
            refunded_at: row.refunded_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<SessionRow> for Session {
    type Error = DbError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(Session {
            id: row.id.into(),
            booking_id: row.booking_id.into(),
            status: row.status.parse().map_err(corrupt)?,
            status_message: row.status_message,
            audio_url: row.audio_url,
            audio_size_bytes: row.audio_size_bytes,
            audio_duration_secs: row.audio_duration_secs,
            audio_format: row.audio_format,
            transcript: row.transcript,
            summary_raw: row.summary_raw,
            summary_final: row.summary_final,
            uploaded_at: row.uploaded_at,
            transcribed_at: row.transcribed_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<MarkedMomentRow> for MarkedMoment {
    fn from(row: MarkedMomentRow) -> Self {
        MarkedMoment {
            timestamp_secs: row.timestamp_secs,
            note: row.note,
        }
    }
}
