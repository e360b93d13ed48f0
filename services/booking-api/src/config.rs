//! Configuration for the Booking API service.

use std::time::Duration;

use horae_booking_core::PaymentConfig;
use horae_session_core::SessionConfig;

/// Booking API configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,
    /// Database URL
    pub database_url: String,
    /// Payment gateway and webhook configuration
    pub payment: PaymentConfig,
    /// Session pipeline stage budgets
    pub session: SessionConfig,
    /// Object store gateway base URL
    pub object_store_url: String,
    /// Transcription provider base URL
    pub transcriber_url: String,
    /// Transcription provider API key
    pub transcriber_api_key: String,
    /// Timeout for ordinary requests
    pub request_timeout: Duration,
    /// Timeout for the recording upload route, which runs the whole
    /// upload/transcribe/summarize pipeline inline
    pub recording_timeout: Duration,
    /// Largest accepted recording upload in bytes
    pub max_upload_bytes: usize,
    /// Metrics enabled
    pub metrics_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let http_port = std::env::var("HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("HTTP_PORT"))?;

        // Payment gateway
        let payment_secret_key = std::env::var("PAYMENT_SECRET_KEY")
            .map_err(|_| ConfigError::Missing("PAYMENT_SECRET_KEY"))?;
        let payment_webhook_secret = std::env::var("PAYMENT_WEBHOOK_SECRET")
            .map_err(|_| ConfigError::Missing("PAYMENT_WEBHOOK_SECRET"))?;

        let mut payment = PaymentConfig::new(&payment_secret_key, &payment_webhook_secret);
        if let (Ok(success), Ok(cancel)) = (
            std::env::var("CHECKOUT_SUCCESS_URL"),
            std::env::var("CHECKOUT_CANCEL_URL"),
        ) {
            payment = payment.with_checkout_urls(success, cancel);
        }

        // Recording pipeline providers
        let object_store_url = std::env::var("OBJECT_STORE_URL")
            .map_err(|_| ConfigError::Missing("OBJECT_STORE_URL"))?;
        let transcriber_url = std::env::var("TRANSCRIBER_URL")
            .map_err(|_| ConfigError::Missing("TRANSCRIBER_URL"))?;
        let transcriber_api_key = std::env::var("TRANSCRIBER_API_KEY")
            .map_err(|_| ConfigError::Missing("TRANSCRIBER_API_KEY"))?;

        let upload_timeout_secs: u64 = std::env::var("UPLOAD_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("UPLOAD_TIMEOUT_SECS"))?;
        let transcribe_timeout_secs: u64 = std::env::var("TRANSCRIBE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("TRANSCRIBE_TIMEOUT_SECS"))?;
        let session = SessionConfig::new()
            .with_upload_timeout(Duration::from_secs(upload_timeout_secs))
            .with_transcribe_timeout(Duration::from_secs(transcribe_timeout_secs));

        // Timeouts and limits
        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("REQUEST_TIMEOUT_SECS"))?;
        let recording_timeout_secs: u64 = std::env::var("RECORDING_TIMEOUT_SECS")
            .unwrap_or_else(|_| "600".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("RECORDING_TIMEOUT_SECS"))?;
        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| (64 * 1024 * 1024).to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("MAX_UPLOAD_BYTES"))?;

        let metrics_enabled = std::env::var("METRICS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        Ok(Self {
            http_port,
            database_url,
            payment,
            session,
            object_store_url,
            transcriber_url,
            transcriber_api_key,
            request_timeout: Duration::from_secs(request_timeout_secs),
            recording_timeout: Duration::from_secs(recording_timeout_secs),
            max_upload_bytes,
            metrics_enabled,
        })
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
