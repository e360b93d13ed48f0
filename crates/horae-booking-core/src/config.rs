//! Payment configuration

/// Configuration for the payment gateway and webhook verification
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Secret API key for the payment gateway
    pub secret_key: String,
    /// Shared secret used to verify webhook signatures
    pub webhook_secret: String,
    /// Where the payer lands after completing checkout
    pub checkout_success_url: String,
    /// Where the payer lands after abandoning checkout
    pub checkout_cancel_url: String,
}

impl PaymentConfig {
    pub fn new(secret_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            webhook_secret: webhook_secret.into(),
            checkout_success_url: "https://horae.app/bookings?checkout=success".to_string(),
            checkout_cancel_url: "https://horae.app/bookings?checkout=cancelled".to_string(),
        }
    }

    /// Override the post-checkout redirect URLs
    pub fn with_checkout_urls(
        mut self,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        self.checkout_success_url = success_url.into();
        self.checkout_cancel_url = cancel_url.into();
        self
    }
}
