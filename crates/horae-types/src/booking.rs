//! Booking types and the booking status state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::UserId;

/// Unique booking identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(pub Uuid);

impl BookingId {
    /// Create a new random booking ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a booking ID from a string
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BookingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for BookingId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// How the session is held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingMode {
    /// Video call
    Remote,
    /// Meet at a physical location
    InPerson,
}

impl BookingMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::InPerson => "in_person",
        }
    }
}

impl std::fmt::Display for BookingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingMode {
    type Err = ParseBookingModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "remote" => Ok(Self::Remote),
            "in_person" => Ok(Self::InPerson),
            _ => Err(ParseBookingModeError(s.to_string())),
        }
    }
}

/// Error parsing a booking mode string
#[derive(Debug, Clone, Error)]
#[error("invalid booking mode: {0}")]
pub struct ParseBookingModeError(pub String);

/// Booking lifecycle status
///
/// The set of legal transitions is closed over [`BookingStatus::can_transition_to`];
/// every status write must be checked against it first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Created, awaiting payment
    Pending,
    /// Paid and scheduled
    Confirmed,
    /// Payment attempt failed; retry or cancel
    PaymentFailed,
    /// Session underway
    InProgress,
    /// Session finished
    Completed,
    /// Called off by a party or admin
    Cancelled,
    /// Client did not attend
    NoShow,
    /// Full refund issued
    Refunded,
    /// Partial refund issued
    PartiallyRefunded,
}

impl BookingStatus {
    /// Whether a booking in this status holds its slot, i.e. blocks
    /// other bookings for the same provider and start time
    pub const fn holds_slot(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Whether moving from `self` to `next` is a legal lifecycle edge
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        match (*self, next) {
            (Pending, Confirmed | PaymentFailed | Cancelled) => true,
            (PaymentFailed, Confirmed | Cancelled) => true,
            (Confirmed, InProgress | Completed | Cancelled | NoShow) => true,
            (Confirmed, Refunded | PartiallyRefunded) => true,
            (InProgress, Completed | Cancelled) => true,
            // A partial refund may later be topped up to a full one.
            (PartiallyRefunded, Refunded) => true,
            // Session reset reverts a completed booking so its
            // recording pipeline can run again.
            (Completed, Confirmed) => true,
            _ => false,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::PaymentFailed => "payment_failed",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
            Self::Refunded => "refunded",
            Self::PartiallyRefunded => "partially_refunded",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = ParseBookingStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "payment_failed" => Ok(Self::PaymentFailed),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "no_show" => Ok(Self::NoShow),
            "refunded" => Ok(Self::Refunded),
            "partially_refunded" => Ok(Self::PartiallyRefunded),
            _ => Err(ParseBookingStatusError(s.to_string())),
        }
    }
}

/// Error parsing a booking status string
#[derive(Debug, Clone, Error)]
#[error("invalid booking status: {0}")]
pub struct ParseBookingStatusError(pub String);

/// A confirmed-hours appointment between a client and a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    /// Booking ID
    pub id: BookingId,
    /// The client who booked
    pub client_id: UserId,
    /// The provider being booked
    pub provider_id: UserId,
    /// Absolute start time
    pub scheduled_at: DateTime<Utc>,
    /// Length of the appointment in minutes
    pub duration_minutes: i32,
    /// Remote or in-person
    pub mode: BookingMode,
    /// Meeting place for in-person bookings
    pub location: Option<String>,
    /// Price in minor currency units, fixed at creation
    pub price_cents: i64,
    /// ISO currency code
    pub currency: String,
    /// Lifecycle status
    pub status: BookingStatus,
    /// Checkout session id at the payment gateway, once one was created
    pub payment_session_id: Option<String>,
    /// Payment intent id reported by the gateway on completion
    pub payment_intent_id: Option<String>,
    /// When payment completed
    pub paid_at: Option<DateTime<Utc>>,
    /// When the booking was cancelled
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Who cancelled it
    pub cancelled_by: Option<UserId>,
    /// Free-text cancellation reason
    pub cancel_reason: Option<String>,
    /// When a (full or partial) refund was recorded
    pub refunded_at: Option<DateTime<Utc>>,
    /// When the booking was created
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}
