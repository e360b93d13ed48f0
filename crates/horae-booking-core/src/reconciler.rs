//! Payment event reconciliation
//!
//! Applies at-least-once, possibly out-of-order payment events to
//! bookings as idempotent set operations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use horae_db::BookingRepository;
use horae_types::BookingStatus;

use crate::error::BookingError;
use crate::webhook::{WebhookEvent, WebhookEventData, WebhookEventType, WebhookHandler};

/// Advances booking state from asynchronous payment events
#[derive(Clone)]
pub struct PaymentReconciler {
    bookings: Arc<dyn BookingRepository>,
    webhook: WebhookHandler,
}

impl PaymentReconciler {
    /// Create a new reconciler
    pub fn new(bookings: Arc<dyn BookingRepository>, webhook: WebhookHandler) -> Self {
        Self { bookings, webhook }
    }

    /// Verify, parse and apply one webhook delivery
    ///
    /// Processing errors propagate so the endpoint does not acknowledge
    /// the delivery; the sender's retries drive convergence.
    #[instrument(skip(self, payload, signature))]
    pub async fn process(&self, payload: &[u8], signature: &str) -> Result<(), BookingError> {
        let event = self.webhook.verify_and_parse(payload, signature)?;

        match &event.event_type {
            WebhookEventType::CheckoutSessionCompleted => {
                self.apply_checkout_completed(&event).await
            }
            WebhookEventType::CheckoutPaymentFailed => self.apply_payment_failed(&event).await,
            WebhookEventType::ChargeRefunded => self.apply_charge_refunded(&event).await,
            WebhookEventType::Unknown(kind) => {
                debug!(event_id = %event.id, event_type = %kind, "Ignoring unhandled webhook event");
                Ok(())
            }
        }
    }

    async fn apply_checkout_completed(&self, event: &WebhookEvent) -> Result<(), BookingError> {
        let WebhookEventData::CheckoutSession(data) = &event.data else {
            return Err(BookingError::WebhookError(
                "unexpected payload for checkout event".to_string(),
            ));
        };
        let booking_id = data.booking_id.ok_or_else(|| {
            BookingError::WebhookError("checkout session carries no booking id".to_string())
        })?;

        // Unknown booking is retryable, not ignorable: a completed payment
        // must eventually land somewhere.
        let booking = self
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound)?;
        let paid_at = event_time(event.created)?;

        match booking.status {
            BookingStatus::Confirmed => {
                if booking.payment_session_id.as_deref() == Some(data.session_id.as_str()) {
                    debug!(
                        booking_id = %booking_id,
                        event_id = %event.id,
                        "Duplicate checkout completion; already confirmed"
                    );
                } else {
                    warn!(
                        booking_id = %booking_id,
                        event_id = %event.id,
                        "Booking already confirmed through a different checkout session; keeping the first"
                    );
                }
                Ok(())
            }
            status if status.can_transition_to(BookingStatus::Confirmed) => {
                let confirmed = self
                    .bookings
                    .confirm_payment(
                        booking_id,
                        status,
                        &data.session_id,
                        data.payment_intent.as_deref(),
                        paid_at,
                    )
                    .await?;
                if !confirmed {
                    return Err(BookingError::ConcurrentUpdate);
                }
                info!(booking_id = %booking_id, event_id = %event.id, "Booking confirmed by completed checkout");
                Ok(())
            }
            status => {
                warn!(
                    booking_id = %booking_id,
                    status = %status,
                    event_id = %event.id,
                    "Completed checkout for a booking that can no longer confirm; ignoring"
                );
                Ok(())
            }
        }
    }

    async fn apply_payment_failed(&self, event: &WebhookEvent) -> Result<(), BookingError> {
        let WebhookEventData::CheckoutSession(data) = &event.data else {
            return Err(BookingError::WebhookError(
                "unexpected payload for payment failure event".to_string(),
            ));
        };
        let booking_id = data.booking_id.ok_or_else(|| {
            BookingError::WebhookError("checkout session carries no booking id".to_string())
        })?;

        let Some(booking) = self.bookings.find_by_id(booking_id).await? else {
            warn!(booking_id = %booking_id, event_id = %event.id, "Payment failure for unknown booking; ignoring");
            return Ok(());
        };

        match booking.status {
            BookingStatus::PaymentFailed => {
                debug!(booking_id = %booking_id, event_id = %event.id, "Duplicate payment failure");
                Ok(())
            }
            status if status.can_transition_to(BookingStatus::PaymentFailed) => {
                if !self
                    .bookings
                    .update_status(booking_id, status, BookingStatus::PaymentFailed)
                    .await?
                {
                    return Err(BookingError::ConcurrentUpdate);
                }
                info!(booking_id = %booking_id, event_id = %event.id, "Booking marked payment-failed");
                Ok(())
            }
            status => {
                info!(
                    booking_id = %booking_id,
                    status = %status,
                    event_id = %event.id,
                    "Stale payment failure; ignoring"
                );
                Ok(())
            }
        }
    }

    async fn apply_charge_refunded(&self, event: &WebhookEvent) -> Result<(), BookingError> {
        let WebhookEventData::Charge(data) = &event.data else {
            return Err(BookingError::WebhookError(
                "unexpected payload for refund event".to_string(),
            ));
        };
        let intent = data.payment_intent.as_deref().ok_or_else(|| {
            BookingError::WebhookError("charge carries no payment intent".to_string())
        })?;
        if data.amount_refunded <= 0 {
            warn!(charge_id = %data.charge_id, event_id = %event.id, "Refund event without a refunded amount; ignoring");
            return Ok(());
        }

        // Unknown intent is retryable: the completion event that stores
        // the intent may still be in flight.
        let booking = self
            .bookings
            .find_by_payment_intent(intent)
            .await?
            .ok_or(BookingError::BookingNotFound)?;

        let refunded_at = event_time(event.created)?;
        let target = if data.amount_refunded >= data.amount {
            BookingStatus::Refunded
        } else {
            BookingStatus::PartiallyRefunded
        };

        if booking.status == target {
            debug!(booking_id = %booking.id, event_id = %event.id, "Refund already recorded");
            self.bookings.set_refunded_at(booking.id, refunded_at).await?;
            return Ok(());
        }

        if booking.status.can_transition_to(target) {
            if !self
                .bookings
                .record_refund(booking.id, booking.status, target, refunded_at)
                .await?
            {
                return Err(BookingError::ConcurrentUpdate);
            }
            info!(
                booking_id = %booking.id,
                status = %target,
                amount_refunded = data.amount_refunded,
                "Refund recorded"
            );
            Ok(())
        } else {
            warn!(
                booking_id = %booking.id,
                status = %booking.status,
                event_id = %event.id,
                "Refund for a booking with no refund edge; recording refund time only"
            );
            self.bookings.set_refunded_at(booking.id, refunded_at).await?;
            Ok(())
        }
    }
}

fn event_time(created: i64) -> Result<DateTime<Utc>, BookingError> {
    DateTime::from_timestamp(created, 0)
        .ok_or_else(|| BookingError::WebhookError("invalid event timestamp".to_string()))
}
