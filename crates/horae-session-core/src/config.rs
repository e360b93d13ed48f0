//! Session pipeline configuration

use std::time::Duration;

/// Session pipeline configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Budget for uploading one recording to the object store
    pub upload_timeout: Duration,
    /// Budget for one transcription or summarization call
    pub transcribe_timeout: Duration,
}

impl SessionConfig {
    /// Create a config with the default stage budgets
    pub fn new() -> Self {
        Self {
            upload_timeout: Duration::from_secs(120),
            transcribe_timeout: Duration::from_secs(300),
        }
    }

    /// Set the upload budget
    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    /// Set the transcription budget
    pub fn with_transcribe_timeout(mut self, timeout: Duration) -> Self {
        self.transcribe_timeout = timeout;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}
