//! Horae Session Core - Consent-gated recording pipeline
//!
//! Session functionality for the post-booking appointment itself:
//! consent collection, the recording authorization gate, and the
//! record, upload, transcribe, summarize pipeline with per-stage
//! failure states. Object storage and the transcription provider are
//! injected as capability traits.
//!
//! # Example
//!
//! ```rust,ignore
//! use horae_session_core::{HttpObjectStore, HttpTranscriber, SessionConfig, SessionService};
//!
//! let sessions = SessionService::new(
//!     bookings,
//!     session_repo,
//!     consents,
//!     moments,
//!     Arc::new(HttpObjectStore::new("https://blobs.internal/horae")),
//!     Arc::new(HttpTranscriber::new("https://stt.internal", api_key)),
//!     SessionConfig::new(),
//! );
//!
//! // Consents first, then the recording can flow through the pipeline
//! sessions.grant_consent(session_id, &actor, ConsentKind::Recording).await?;
//! let session = sessions.process_recording(session_id, &actor, audio, moments).await?;
//! ```

pub mod config;
pub mod error;
pub mod service;
pub mod store;
pub mod transcribe;

pub use config::SessionConfig;
pub use error::SessionError;
pub use service::{AudioUpload, SessionService};
pub use store::{HttpObjectStore, MemoryObjectStore, ObjectStore, StoredObject};
pub use transcribe::{HttpTranscriber, TranscriptionProvider};
