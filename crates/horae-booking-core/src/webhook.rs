//! Payment webhook verification and parsing

use std::collections::HashMap;

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, error, info, instrument, warn};

use horae_types::BookingId;

use crate::error::BookingError;

/// Maximum allowed skew between the signature timestamp and now
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Webhook event types we handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventType {
    /// Checkout session completed, payment collected
    CheckoutSessionCompleted,
    /// Checkout session payment failed after checkout
    CheckoutPaymentFailed,
    /// Charge refunded, fully or partially
    ChargeRefunded,
    /// Unknown event type
    Unknown(String),
}

impl From<&str> for WebhookEventType {
    fn from(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "checkout.session.async_payment_failed" => Self::CheckoutPaymentFailed,
            "charge.refunded" => Self::ChargeRefunded,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Parsed webhook event
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// Event ID
    pub id: String,
    /// Event type
    pub event_type: WebhookEventType,
    /// Event data
    pub data: WebhookEventData,
    /// When the event was created (Unix timestamp)
    pub created: i64,
}

/// Webhook event data
#[derive(Debug, Clone)]
pub enum WebhookEventData {
    /// Checkout session data
    CheckoutSession(CheckoutSessionData),
    /// Charge data
    Charge(ChargeData),
    /// Raw JSON for unknown events
    Raw(serde_json::Value),
}

/// Checkout session event data
#[derive(Debug, Clone)]
pub struct CheckoutSessionData {
    /// Checkout session ID
    pub session_id: String,
    /// Payment intent the session settled with, if any
    pub payment_intent: Option<String>,
    /// Booking the session was opened for, from the session metadata
    pub booking_id: Option<BookingId>,
}

/// Charge event data
#[derive(Debug, Clone)]
pub struct ChargeData {
    /// Charge ID
    pub charge_id: String,
    /// Payment intent the charge belongs to
    pub payment_intent: Option<String>,
    /// Charged amount in cents
    pub amount: i64,
    /// Cumulative refunded amount in cents
    pub amount_refunded: i64,
}

/// Webhook handler for verifying and decoding payment events
#[derive(Clone)]
pub struct WebhookHandler {
    webhook_secret: String,
}

impl WebhookHandler {
    /// Create a new webhook handler
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            webhook_secret: webhook_secret.into(),
        }
    }

    /// Verify and parse a webhook payload
    #[instrument(skip(self, payload, signature))]
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, BookingError> {
        // Verify signature before trusting anything in the payload
        self.verify_signature(payload, signature)?;

        let raw_event: RawPaymentEvent = serde_json::from_slice(payload)
            .map_err(|e| BookingError::WebhookError(e.to_string()))?;

        debug!(event_id = %raw_event.id, event_type = %raw_event.event_type, "Parsed webhook event");

        let event_type = WebhookEventType::from(raw_event.event_type.as_str());
        let data = Self::parse_event_data(&event_type, raw_event.data.object)?;

        Ok(WebhookEvent {
            id: raw_event.id,
            event_type,
            data,
            created: raw_event.created,
        })
    }

    /// Verify the webhook signature
    fn verify_signature(&self, payload: &[u8], signature: &str) -> Result<(), BookingError> {
        // Parse signature header: t=timestamp,v1=signature
        let mut timestamp: Option<&str> = None;
        let mut sig_v1: Option<&str> = None;

        for part in signature.split(',') {
            if let Some((key, value)) = part.split_once('=') {
                match key {
                    "t" => timestamp = Some(value),
                    "v1" => sig_v1 = Some(value),
                    _ => {}
                }
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            warn!("Missing timestamp in webhook signature");
            BookingError::WebhookError("Missing timestamp".to_string())
        })?;

        let sig_v1 = sig_v1.ok_or_else(|| {
            warn!("Missing v1 signature in webhook signature");
            BookingError::WebhookError("Missing signature".to_string())
        })?;

        // Build signed payload
        let signed_payload = format!(
            "{}.{}",
            timestamp,
            std::str::from_utf8(payload)
                .map_err(|_| BookingError::WebhookError("Invalid payload encoding".to_string()))?
        );

        // Compute expected signature
        let mut mac = Hmac::<Sha256>::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| BookingError::Internal("HMAC error".to_string()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        // Compare signatures (constant-time)
        if !constant_time_eq(sig_v1.as_bytes(), expected.as_bytes()) {
            error!("Webhook signature verification failed");
            return Err(BookingError::WebhookError(
                "Signature verification failed".to_string(),
            ));
        }

        // Check timestamp freshness, only after the signature matched
        let ts: i64 = timestamp
            .parse()
            .map_err(|_| BookingError::WebhookError("Invalid timestamp format".to_string()))?;
        let now = Utc::now().timestamp();
        if (now - ts).abs() > SIGNATURE_TOLERANCE_SECS {
            warn!(timestamp = ts, now = now, "Webhook timestamp outside tolerance");
            return Err(BookingError::WebhookError("Timestamp too old".to_string()));
        }

        Ok(())
    }

    /// Parse event data based on type
    fn parse_event_data(
        event_type: &WebhookEventType,
        object: serde_json::Value,
    ) -> Result<WebhookEventData, BookingError> {
        match event_type {
            WebhookEventType::CheckoutSessionCompleted | WebhookEventType::CheckoutPaymentFailed => {
                let session: RawCheckoutSession = serde_json::from_value(object)
                    .map_err(|e| BookingError::WebhookError(e.to_string()))?;
                let booking_id = session
                    .metadata
                    .as_ref()
                    .and_then(|m| m.get("booking_id"))
                    .map(|raw| {
                        BookingId::parse(raw).map_err(|_| {
                            BookingError::WebhookError(format!(
                                "invalid booking id in session metadata: {raw}"
                            ))
                        })
                    })
                    .transpose()?;
                Ok(WebhookEventData::CheckoutSession(CheckoutSessionData {
                    session_id: session.id,
                    payment_intent: session.payment_intent,
                    booking_id,
                }))
            }
            WebhookEventType::ChargeRefunded => {
                let charge: RawCharge = serde_json::from_value(object)
                    .map_err(|e| BookingError::WebhookError(e.to_string()))?;
                Ok(WebhookEventData::Charge(ChargeData {
                    charge_id: charge.id,
                    payment_intent: charge.payment_intent,
                    amount: charge.amount,
                    amount_refunded: charge.amount_refunded,
                }))
            }
            WebhookEventType::Unknown(_) => {
                info!("Received unknown webhook event type");
                Ok(WebhookEventData::Raw(object))
            }
        }
    }
}

/// Constant-time comparison
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

// Raw provider event envelope for parsing
#[derive(Debug, Deserialize)]
struct RawPaymentEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
    created: i64,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawCheckoutSession {
    id: String,
    payment_intent: Option<String>,
    metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct RawCharge {
    id: String,
    payment_intent: Option<String>,
    amount: i64,
    #[serde(default)]
    amount_refunded: i64,
}
