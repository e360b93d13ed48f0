//! Booking creation, cancellation and lifecycle transitions

use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use tracing::info;

use horae_db::{AvailabilityRepository, BookingRepository, CreateBooking, UserRepository};
use horae_types::{
    weekday_index, Actor, Booking, BookingId, BookingMode, BookingStatus, TimeOfDay, UserId,
};

use crate::availability::fits_slot;
use crate::config::PaymentConfig;
use crate::error::BookingError;
use crate::gateway::{CheckoutParams, CheckoutSession, PaymentGateway};

/// Shortest bookable duration in minutes
pub const MIN_DURATION_MINUTES: i32 = 30;
/// Longest bookable duration in minutes
pub const MAX_DURATION_MINUTES: i32 = 240;

/// A new booking request from a client
#[derive(Debug, Clone)]
pub struct CreateBookingRequest {
    pub provider_id: UserId,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub mode: BookingMode,
    pub location: Option<String>,
}

/// Owns booking creation, cancellation and guarded status transitions
#[derive(Clone)]
pub struct BookingService {
    users: Arc<dyn UserRepository>,
    windows: Arc<dyn AvailabilityRepository>,
    bookings: Arc<dyn BookingRepository>,
    gateway: Arc<dyn PaymentGateway>,
    config: PaymentConfig,
}

impl BookingService {
    /// Create a new booking service
    pub fn new(
        users: Arc<dyn UserRepository>,
        windows: Arc<dyn AvailabilityRepository>,
        bookings: Arc<dyn BookingRepository>,
        gateway: Arc<dyn PaymentGateway>,
        config: PaymentConfig,
    ) -> Self {
        Self {
            users,
            windows,
            bookings,
            gateway,
            config,
        }
    }

    /// Create a booking in `Pending` at a valid slot
    ///
    /// The slot listing is only advisory; the real conflict check happens
    /// here, where the insert and the active-slot uniqueness are one
    /// atomic unit in the store.
    pub async fn create_booking(
        &self,
        client_id: UserId,
        request: CreateBookingRequest,
    ) -> Result<Booking, BookingError> {
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&request.duration_minutes) {
            return Err(BookingError::Validation(format!(
                "duration must be between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES} minutes"
            )));
        }
        if request.scheduled_at.second() != 0 || request.scheduled_at.nanosecond() != 0 {
            return Err(BookingError::Validation(
                "scheduled time must fall on a whole minute".to_string(),
            ));
        }
        if request.scheduled_at <= Utc::now() {
            return Err(BookingError::Validation(
                "scheduled time must be in the future".to_string(),
            ));
        }

        let provider = self
            .users
            .find_provider(request.provider_id)
            .await?
            .ok_or(BookingError::ProviderNotFound)?;
        if !provider.verified {
            return Err(BookingError::Validation(
                "provider is not accepting bookings".to_string(),
            ));
        }

        let date = request.scheduled_at.date_naive();
        let windows = self
            .windows
            .find_by_provider_and_day(request.provider_id, weekday_index(date))
            .await?;
        if !fits_slot(&windows, TimeOfDay::of(&request.scheduled_at)) {
            return Err(BookingError::Validation(
                "requested time is outside the provider's availability".to_string(),
            ));
        }

        let price_cents = booking_price(
            provider.hourly_rate_cents.unwrap_or(0),
            request.duration_minutes,
        );

        let create = CreateBooking {
            id: BookingId::new(),
            client_id,
            provider_id: request.provider_id,
            scheduled_at: request.scheduled_at,
            duration_minutes: request.duration_minutes,
            mode: request.mode,
            location: request.location,
            price_cents,
            currency: provider.currency.clone(),
        };

        let booking = match self.bookings.create(create).await {
            Ok(booking) => booking,
            Err(e) if e.is_unique_violation() => return Err(BookingError::SlotTaken),
            Err(e) => return Err(e.into()),
        };

        info!(
            booking_id = %booking.id,
            client_id = %client_id,
            provider_id = %booking.provider_id,
            scheduled_at = %booking.scheduled_at,
            price_cents = booking.price_cents,
            "Booking created"
        );
        Ok(booking)
    }

    /// Fetch a booking the actor is allowed to see
    pub async fn get_booking(
        &self,
        booking_id: BookingId,
        actor: &Actor,
    ) -> Result<Booking, BookingError> {
        let booking = self
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound)?;
        ensure_party(&booking, actor, "view")?;
        Ok(booking)
    }

    /// Cancel a booking on behalf of either party or an admin
    pub async fn cancel_booking(
        &self,
        booking_id: BookingId,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<Booking, BookingError> {
        let booking = self
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound)?;
        ensure_party(&booking, actor, "cancel")?;

        if !booking.status.can_transition_to(BookingStatus::Cancelled) {
            return Err(BookingError::InvalidTransition {
                from: booking.status,
                to: BookingStatus::Cancelled,
            });
        }

        let cancelled = self
            .bookings
            .record_cancellation(booking_id, booking.status, actor.user_id, reason.as_deref())
            .await?;
        if !cancelled {
            return Err(BookingError::ConcurrentUpdate);
        }

        info!(booking_id = %booking_id, cancelled_by = %actor.user_id, "Booking cancelled");
        self.bookings
            .find_by_id(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound)
    }

    /// Provider marks the appointment as underway
    pub async fn start_booking(
        &self,
        booking_id: BookingId,
        actor: &Actor,
    ) -> Result<Booking, BookingError> {
        self.provider_transition(booking_id, actor, BookingStatus::InProgress, "start")
            .await
    }

    /// Provider marks the client as absent
    pub async fn mark_no_show(
        &self,
        booking_id: BookingId,
        actor: &Actor,
    ) -> Result<Booking, BookingError> {
        self.provider_transition(booking_id, actor, BookingStatus::NoShow, "mark no-show on")
            .await
    }

    async fn provider_transition(
        &self,
        booking_id: BookingId,
        actor: &Actor,
        to: BookingStatus,
        action: &str,
    ) -> Result<Booking, BookingError> {
        let booking = self
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound)?;
        if booking.provider_id != actor.user_id && !actor.is_admin() {
            return Err(BookingError::Forbidden(format!(
                "only the provider may {action} this booking"
            )));
        }
        if !booking.status.can_transition_to(to) {
            return Err(BookingError::InvalidTransition {
                from: booking.status,
                to,
            });
        }
        if !self
            .bookings
            .update_status(booking_id, booking.status, to)
            .await?
        {
            return Err(BookingError::ConcurrentUpdate);
        }

        info!(booking_id = %booking_id, from = %booking.status, to = %to, "Booking status updated");
        self.bookings
            .find_by_id(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound)
    }

    /// Open a hosted checkout session for a booking awaiting payment
    pub async fn create_checkout(
        &self,
        booking_id: BookingId,
        actor: &Actor,
    ) -> Result<CheckoutSession, BookingError> {
        let booking = self
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound)?;
        if booking.client_id != actor.user_id {
            return Err(BookingError::Forbidden(
                "only the booking's client can pay for it".to_string(),
            ));
        }
        if !matches!(
            booking.status,
            BookingStatus::Pending | BookingStatus::PaymentFailed
        ) {
            return Err(BookingError::NotAwaitingPayment(booking.status));
        }

        let checkout = self
            .gateway
            .create_checkout(&CheckoutParams {
                booking_id: booking.id,
                amount_cents: booking.price_cents,
                currency: booking.currency.clone(),
                description: format!(
                    "{} minute session on {}",
                    booking.duration_minutes,
                    booking.scheduled_at.format("%Y-%m-%d %H:%M")
                ),
                success_url: self.config.checkout_success_url.clone(),
                cancel_url: self.config.checkout_cancel_url.clone(),
            })
            .await?;

        self.bookings
            .record_payment_session(booking.id, &checkout.session_id)
            .await?;

        info!(booking_id = %booking.id, session_id = %checkout.session_id, "Checkout session created");
        Ok(checkout)
    }
}

/// Allow the booking's client, its provider, or an admin
fn ensure_party(booking: &Booking, actor: &Actor, action: &str) -> Result<(), BookingError> {
    if actor.is_admin()
        || booking.client_id == actor.user_id
        || booking.provider_id == actor.user_id
    {
        Ok(())
    } else {
        Err(BookingError::Forbidden(format!(
            "not allowed to {action} this booking"
        )))
    }
}

/// Price in minor units: the hourly rate prorated by duration, rounded
/// half-up to an integer
pub fn booking_price(hourly_rate_cents: i64, duration_minutes: i32) -> i64 {
    (hourly_rate_cents * i64::from(duration_minutes) + 30) / 60
}
