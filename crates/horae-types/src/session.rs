//! Session, consent and marked-moment types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::BookingId;

/// Unique session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a session ID from a string
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Recording pipeline status
///
/// The pipeline walks `Idle → Recording → Uploading → Transcribing →
/// Summarizing → Completed`, with per-stage failure states that allow a
/// re-run from the top. Transitions outside
/// [`SessionStatus::can_transition_to`] are rejected; the reset path is
/// the single exception and wipes the session back to `Idle` wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Nothing captured yet
    Idle,
    /// Capture in progress on the client device
    Recording,
    /// Audio upload to object storage in progress
    Uploading,
    /// Transcription provider call in progress
    Transcribing,
    /// Summary generation in progress
    Summarizing,
    /// Pipeline finished; transcript and summary stored
    Completed,
    /// Audio upload failed; see `status_message`
    UploadFailed,
    /// Transcription failed; see `status_message`
    TranscribeFailed,
    /// Unclassified pipeline failure; see `status_message`
    Failed,
}

impl SessionStatus {
    /// Whether moving from `self` to `next` is a legal pipeline edge
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        if next == Failed {
            return *self != Failed;
        }
        match (*self, next) {
            (Idle, Recording | Uploading) => true,
            (Recording, Uploading) => true,
            (Uploading, Transcribing | UploadFailed) => true,
            (Transcribing, Summarizing | TranscribeFailed) => true,
            (Summarizing, Completed) => true,
            // Recovery re-runs the pipeline from the upload stage.
            (UploadFailed | TranscribeFailed, Uploading) => true,
            _ => false,
        }
    }

    /// Whether a new recording may be processed from this state
    pub const fn can_accept_recording(&self) -> bool {
        matches!(
            self,
            Self::Idle | Self::Recording | Self::UploadFailed | Self::TranscribeFailed
        )
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Uploading => "uploading",
            Self::Transcribing => "transcribing",
            Self::Summarizing => "summarizing",
            Self::Completed => "completed",
            Self::UploadFailed => "upload_failed",
            Self::TranscribeFailed => "transcribe_failed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = ParseSessionStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "recording" => Ok(Self::Recording),
            "uploading" => Ok(Self::Uploading),
            "transcribing" => Ok(Self::Transcribing),
            "summarizing" => Ok(Self::Summarizing),
            "completed" => Ok(Self::Completed),
            "upload_failed" => Ok(Self::UploadFailed),
            "transcribe_failed" => Ok(Self::TranscribeFailed),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseSessionStatusError(s.to_string())),
        }
    }
}

/// Error parsing a session status string
#[derive(Debug, Clone, Error)]
#[error("invalid session status: {0}")]
pub struct ParseSessionStatusError(pub String);

/// Consent categories a client must grant before recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentKind {
    /// Consent to being recorded
    Recording,
    /// Consent to storing the recording
    Storage,
    /// Consent to AI transcription and summarization
    AiProcessing,
}

impl ConsentKind {
    /// Every kind required before a recording may start
    pub const REQUIRED: [ConsentKind; 3] =
        [Self::Recording, Self::Storage, Self::AiProcessing];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recording => "recording",
            Self::Storage => "storage",
            Self::AiProcessing => "ai_processing",
        }
    }
}

impl std::fmt::Display for ConsentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConsentKind {
    type Err = ParseConsentKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recording" => Ok(Self::Recording),
            "storage" => Ok(Self::Storage),
            "ai_processing" => Ok(Self::AiProcessing),
            _ => Err(ParseConsentKindError(s.to_string())),
        }
    }
}

/// Error parsing a consent kind string
#[derive(Debug, Clone, Error)]
#[error("invalid consent kind: {0}")]
pub struct ParseConsentKindError(pub String);

/// Recording session attached one-to-one to a booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID
    pub id: SessionId,
    /// The owning booking
    pub booking_id: BookingId,
    /// Pipeline status
    pub status: SessionStatus,
    /// Human-readable detail for failure states
    pub status_message: Option<String>,
    /// Object-store URL of the uploaded audio
    pub audio_url: Option<String>,
    /// Uploaded audio size in bytes
    pub audio_size_bytes: Option<i64>,
    /// Recording length in seconds, as reported by the client
    pub audio_duration_secs: Option<f64>,
    /// Audio container format, e.g. `m4a`
    pub audio_format: Option<String>,
    /// Full transcript text
    pub transcript: Option<String>,
    /// Machine-generated summary
    pub summary_raw: Option<String>,
    /// Provider-validated summary
    pub summary_final: Option<String>,
    /// When the audio upload finished
    pub uploaded_at: Option<DateTime<Utc>>,
    /// When transcription finished
    pub transcribed_at: Option<DateTime<Utc>>,
    /// When the pipeline completed
    pub completed_at: Option<DateTime<Utc>>,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Whether recording may start, and which consents are still missing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingAuthorization {
    /// True when every required consent was granted by the client
    pub authorized: bool,
    /// Required consents not yet granted
    pub missing: Vec<ConsentKind>,
}

/// A moment the client marked during recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkedMoment {
    /// Seconds from recording start
    #[serde(rename = "timestamp")]
    pub timestamp_secs: f64,
    /// Optional note attached to the moment
    pub note: Option<String>,
}
