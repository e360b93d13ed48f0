//! Session pipeline error types

use thiserror::Error;

use horae_db::DbError;
use horae_types::{BookingStatus, ConsentKind, SessionStatus};

/// Errors raised by session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found")]
    SessionNotFound,

    #[error("booking not found")]
    BookingNotFound,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("recording requires consents not yet granted: {}", join_kinds(.0))]
    ConsentMissing(Vec<ConsentKind>),

    #[error("a booking in {0} cannot host a session")]
    BookingNotReady(BookingStatus),

    #[error("cannot move session from {from} to {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("session was modified concurrently")]
    ConcurrentUpdate,

    #[error("no summary to validate while the session is {0}")]
    SummaryNotReady(SessionStatus),

    #[error("object store error: {0}")]
    StoreError(String),

    #[error("transcription error: {0}")]
    TranscribeError(String),

    #[error("database error: {0}")]
    Database(#[from] DbError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl SessionError {
    /// Whether this error maps to a missing resource
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SessionNotFound | Self::BookingNotFound)
    }

    /// Whether this error maps to a state conflict
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::BookingNotReady(_)
                | Self::InvalidTransition { .. }
                | Self::ConcurrentUpdate
                | Self::SummaryNotReady(_)
        )
    }
}

fn join_kinds(kinds: &[ConsentKind]) -> String {
    kinds
        .iter()
        .map(ConsentKind::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
