//! Horae Booking Core - Availability, bookings and payment reconciliation
//!
//! Core booking functionality: slot computation from recurring
//! availability windows, booking creation and cancellation behind an
//! explicit status state machine, hosted checkout creation, and
//! idempotent reconciliation of asynchronous payment webhooks.
//!
//! # Example
//!
//! ```rust,ignore
//! use horae_booking_core::{AvailabilityService, BookingService, PaymentConfig, StripeGateway};
//!
//! let config = PaymentConfig::new("sk_test_...", "whsec_...");
//! let gateway = Arc::new(StripeGateway::new(config.clone()));
//!
//! let bookings = BookingService::new(users, windows, repo, gateway, config);
//!
//! // Create a booking, then send the client to checkout
//! let booking = bookings.create_booking(client_id, request).await?;
//! let checkout = bookings.create_checkout(booking.id, &actor).await?;
//! ```

pub mod availability;
pub mod config;
pub mod error;
pub mod gateway;
pub mod reconciler;
pub mod service;
pub mod stripe;
pub mod webhook;

pub use availability::{AvailabilityService, SLOT_MINUTES};
pub use config::PaymentConfig;
pub use error::BookingError;
pub use gateway::{CheckoutParams, CheckoutSession, PaymentGateway};
pub use reconciler::PaymentReconciler;
pub use service::{
    booking_price, BookingService, CreateBookingRequest, MAX_DURATION_MINUTES,
    MIN_DURATION_MINUTES,
};
pub use stripe::StripeGateway;
pub use webhook::{
    ChargeData, CheckoutSessionData, WebhookEvent, WebhookEventData, WebhookEventType,
    WebhookHandler,
};
