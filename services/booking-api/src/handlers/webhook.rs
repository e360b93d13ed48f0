//! Payment webhook handler
//!
//! Takes the raw body so signature verification sees exactly the bytes
//! the gateway signed. No auth extractor here; the signature header is
//! the authentication.

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::extract::State;
use tracing::warn;

use horae_booking_core::BookingError;

use crate::state::AppState;

const SIGNATURE_HEADER: &str = "payment-signature";

/// POST /webhooks/payments
///
/// 2xx acknowledges the event; 4xx tells the gateway the payload is
/// unusable and should not be retried; 5xx asks for a redelivery.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = match headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) {
        Some(sig) => sig,
        None => {
            warn!("Webhook rejected: missing {SIGNATURE_HEADER} header");
            metrics::counter!("payment_webhooks_processed_total", "status" => "rejected")
                .increment(1);
            return StatusCode::BAD_REQUEST;
        }
    };

    match state.reconciler.process(&body, signature).await {
        Ok(()) => {
            metrics::counter!("payment_webhooks_processed_total", "status" => "ok").increment(1);
            StatusCode::OK
        }
        Err(BookingError::WebhookError(reason)) => {
            warn!(%reason, "Webhook rejected");
            metrics::counter!("payment_webhooks_processed_total", "status" => "rejected")
                .increment(1);
            StatusCode::BAD_REQUEST
        }
        Err(e) => {
            // Transient failure: ask the gateway to redeliver.
            warn!(error = %e, "Webhook processing failed, requesting redelivery");
            metrics::counter!("payment_webhooks_processed_total", "status" => "error").increment(1);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
