//! Transcription and summarization provider client

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};

use crate::error::SessionError;

/// Abstracts speech-to-text and summary generation behind one provider
/// interface
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Produce a transcript for the referenced audio
    ///
    /// `hints` are short free-text notes the client marked during the
    /// recording; providers may use them to bias recognition.
    async fn transcribe(&self, audio_url: &str, hints: &[String]) -> Result<String, SessionError>;

    /// Produce a structured summary of a transcript
    async fn summarize(&self, transcript: &str, hints: &[String])
        -> Result<String, SessionError>;
}

/// HTTP transcription provider client
#[derive(Clone)]
pub struct HttpTranscriber {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTranscriber {
    /// Create a client for the given provider base URL
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .tcp_nodelay(true)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::with_client(base_url, api_key, client)
    }

    /// Create a client sharing an existing HTTP client
    pub fn with_client(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client,
            base_url,
            api_key: api_key.into(),
        }
    }

    /// Make a request to the provider API
    async fn api_request<T, B>(&self, endpoint: &str, body: &B) -> Result<T, SessionError>
    where
        T: for<'de> Deserialize<'de>,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, endpoint);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, endpoint = %endpoint, "Transcription API request failed");
                SessionError::TranscribeError("provider request failed".to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(
                status = %status,
                error = %error_text,
                endpoint = %endpoint,
                "Transcription API returned error"
            );
            return Err(SessionError::TranscribeError(format!(
                "provider returned {status}"
            )));
        }

        response.json::<T>().await.map_err(|e| {
            error!(error = %e, endpoint = %endpoint, "Failed to parse transcription API response");
            SessionError::Internal("invalid provider response".to_string())
        })
    }
}

#[async_trait]
impl TranscriptionProvider for HttpTranscriber {
    #[instrument(skip(self, hints))]
    async fn transcribe(&self, audio_url: &str, hints: &[String]) -> Result<String, SessionError> {
        let response: TranscribeResponse = self
            .api_request(
                "/v1/transcriptions",
                &TranscribeRequest { audio_url, hints },
            )
            .await?;
        Ok(response.text)
    }

    #[instrument(skip(self, transcript, hints))]
    async fn summarize(
        &self,
        transcript: &str,
        hints: &[String],
    ) -> Result<String, SessionError> {
        let response: SummarizeResponse = self
            .api_request("/v1/summaries", &SummarizeRequest { transcript, hints })
            .await?;
        Ok(response.summary)
    }
}

#[derive(Serialize)]
struct TranscribeRequest<'a> {
    audio_url: &'a str,
    hints: &'a [String],
}

#[derive(Deserialize)]
struct TranscribeResponse {
    text: String,
}

#[derive(Serialize)]
struct SummarizeRequest<'a> {
    transcript: &'a str,
    hints: &'a [String],
}

#[derive(Deserialize)]
struct SummarizeResponse {
    summary: String,
}
