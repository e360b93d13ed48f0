//! Payment gateway abstraction

use async_trait::async_trait;
use serde::Serialize;

use horae_types::BookingId;

use crate::error::BookingError;

/// Inputs for opening a hosted checkout session
#[derive(Debug, Clone)]
pub struct CheckoutParams {
    /// Booking being paid for
    pub booking_id: BookingId,
    /// Amount to collect, in cents
    pub amount_cents: i64,
    /// ISO currency code
    pub currency: String,
    /// Line item description shown to the payer
    pub description: String,
    /// Redirect after a completed payment
    pub success_url: String,
    /// Redirect after abandoning checkout
    pub cancel_url: String,
}

/// A hosted checkout session created at the gateway
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSession {
    /// Gateway session ID
    pub session_id: String,
    /// URL the payer is sent to
    pub url: String,
}

/// Payment gateway trait
///
/// Abstracts payment processing to allow different gateways (Stripe, etc.)
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a hosted checkout session collecting a booking's price
    async fn create_checkout(
        &self,
        params: &CheckoutParams,
    ) -> Result<CheckoutSession, BookingError>;
}
