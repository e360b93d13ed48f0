//! Error types for booking operations

use horae_types::BookingStatus;
use thiserror::Error;

/// Errors returned by booking, availability and payment operations
#[derive(Debug, Error)]
pub enum BookingError {
    /// The booking does not exist
    #[error("booking not found")]
    BookingNotFound,

    /// The provider does not exist or has no provider profile
    #[error("provider not found")]
    ProviderNotFound,

    /// The availability window does not exist or belongs to someone else
    #[error("availability window not found")]
    WindowNotFound,

    /// The request failed validation
    #[error("validation error: {0}")]
    Validation(String),

    /// The caller is not allowed to perform this operation
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Another active booking already holds the requested slot
    #[error("the requested slot is no longer available")]
    SlotTaken,

    /// The booking's status does not admit the requested transition
    #[error("cannot move booking from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    /// The booking changed underneath us; the caller may retry
    #[error("booking was modified concurrently")]
    ConcurrentUpdate,

    /// The booking is not awaiting payment
    #[error("booking is not awaiting payment")]
    NotAwaitingPayment(BookingStatus),

    /// The webhook payload or signature was rejected
    #[error("webhook error: {0}")]
    WebhookError(String),

    /// The payment gateway rejected or failed a request
    #[error("payment gateway error: {0}")]
    GatewayError(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] horae_db::DbError),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl BookingError {
    /// Whether this error means a referenced resource was absent
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::BookingNotFound | Self::ProviderNotFound | Self::WindowNotFound
        )
    }

    /// Whether this error should surface as a conflict to the caller
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::SlotTaken
                | Self::InvalidTransition { .. }
                | Self::ConcurrentUpdate
                | Self::NotAwaitingPayment(_)
        )
    }
}
