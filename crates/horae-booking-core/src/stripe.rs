//! Stripe payment gateway implementation

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::config::PaymentConfig;
use crate::error::BookingError;
use crate::gateway::{CheckoutParams, CheckoutSession, PaymentGateway};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Stripe payment gateway
#[derive(Clone)]
pub struct StripeGateway {
    client: Client,
    config: PaymentConfig,
}

impl StripeGateway {
    /// Create a new Stripe gateway
    pub fn new(config: PaymentConfig) -> Self {
        let client = Client::new();
        Self { client, config }
    }

    /// Make authenticated request to Stripe
    async fn stripe_request<T: for<'de> Deserialize<'de>>(
        &self,
        method: reqwest::Method,
        endpoint: &str,
        form: Option<&[(&str, &str)]>,
    ) -> Result<T, BookingError> {
        let url = format!("{STRIPE_API_BASE}{endpoint}");

        let mut request = self
            .client
            .request(method, &url)
            .basic_auth(&self.config.secret_key, Option::<&str>::None);

        if let Some(form_data) = form {
            request = request.form(form_data);
        }

        let response = request.send().await.map_err(|e| {
            error!(error = %e, "Stripe API request failed");
            BookingError::GatewayError(e.to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Stripe API error");
            return Err(BookingError::GatewayError(format!(
                "Stripe API error: {status}"
            )));
        }

        response.json::<T>().await.map_err(|e| {
            error!(error = %e, "Failed to parse Stripe response");
            BookingError::Internal(e.to_string())
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, params))]
    async fn create_checkout(
        &self,
        params: &CheckoutParams,
    ) -> Result<CheckoutSession, BookingError> {
        debug!(booking_id = %params.booking_id, amount_cents = params.amount_cents, "Creating checkout session");

        let amount = params.amount_cents.to_string();
        let booking_id = params.booking_id.to_string();

        let form = [
            ("mode", "payment"),
            ("success_url", params.success_url.as_str()),
            ("cancel_url", params.cancel_url.as_str()),
            ("line_items[0][price_data][currency]", params.currency.as_str()),
            ("line_items[0][price_data][product_data][name]", params.description.as_str()),
            ("line_items[0][price_data][unit_amount]", amount.as_str()),
            ("line_items[0][quantity]", "1"),
            ("metadata[booking_id]", booking_id.as_str()),
        ];

        let session: StripeCheckoutSession = self
            .stripe_request(reqwest::Method::POST, "/checkout/sessions", Some(&form))
            .await?;

        Ok(CheckoutSession {
            session_id: session.id,
            url: session.url.unwrap_or_default(),
        })
    }
}

// Stripe API response types

/// Stripe checkout session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeCheckoutSession {
    /// Session ID
    pub id: String,
    /// Checkout URL
    pub url: Option<String>,
    /// Payment intent ID (after completion)
    pub payment_intent: Option<String>,
}
