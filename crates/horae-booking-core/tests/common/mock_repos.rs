//! Mock repositories and payment gateway for testing

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, Entry};

use horae_booking_core::{BookingError, CheckoutParams, CheckoutSession, PaymentGateway};
use horae_db::{
    AvailabilityRepository, BookingRepository, CreateBooking, CreateWindow, DbError, DbResult,
    UserRepository,
};
use horae_types::{
    AvailabilityWindow, Booking, BookingId, BookingStatus, ProviderProfile, Role, User, UserId,
    WindowId,
};

/// In-memory user and provider-profile repository
#[derive(Default, Clone)]
pub struct MockUserRepository {
    users: Arc<DashMap<UserId, User>>,
    providers: Arc<DashMap<UserId, ProviderProfile>>,
}

impl MockUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user with the given role, returning its id
    pub fn add_user(&self, role: Role) -> UserId {
        let id = UserId::new();
        self.users.insert(
            id,
            User {
                id,
                role,
                display_name: format!("user-{id}"),
                created_at: Utc::now(),
            },
        );
        id
    }

    /// Insert a verified provider with an hourly rate
    pub fn add_provider(&self, hourly_rate_cents: Option<i64>) -> UserId {
        let id = self.add_user(Role::Provider);
        self.providers.insert(
            id,
            ProviderProfile {
                user_id: id,
                verified: true,
                hourly_rate_cents,
                currency: "eur".to_string(),
            },
        );
        id
    }

    /// Insert a provider that has not passed verification
    #[allow(dead_code)]
    pub fn add_unverified_provider(&self) -> UserId {
        let id = self.add_user(Role::Provider);
        self.providers.insert(
            id,
            ProviderProfile {
                user_id: id,
                verified: false,
                hourly_rate_cents: Some(8000),
                currency: "eur".to_string(),
            },
        );
        id
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn find_by_id(&self, id: UserId) -> DbResult<Option<User>> {
        Ok(self.users.get(&id).map(|r| r.value().clone()))
    }

    async fn find_provider(&self, id: UserId) -> DbResult<Option<ProviderProfile>> {
        Ok(self.providers.get(&id).map(|r| r.value().clone()))
    }
}

/// In-memory availability window repository
#[derive(Default, Clone)]
pub struct MockAvailabilityRepository {
    windows: Arc<DashMap<WindowId, AvailabilityWindow>>,
}

impl MockAvailabilityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a window directly
    pub fn add_window(
        &self,
        provider_id: UserId,
        day_of_week: i16,
        start: &str,
        end: &str,
    ) -> WindowId {
        let id = WindowId::new();
        self.windows.insert(
            id,
            AvailabilityWindow {
                id,
                provider_id,
                day_of_week,
                start: start.parse().unwrap(),
                end: end.parse().unwrap(),
                created_at: Utc::now(),
            },
        );
        id
    }
}

#[async_trait]
impl AvailabilityRepository for MockAvailabilityRepository {
    async fn create(&self, window: CreateWindow) -> DbResult<AvailabilityWindow> {
        let row = AvailabilityWindow {
            id: window.id,
            provider_id: window.provider_id,
            day_of_week: window.day_of_week,
            start: window.start,
            end: window.end,
            created_at: Utc::now(),
        };
        self.windows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn delete(&self, id: WindowId, provider_id: UserId) -> DbResult<u64> {
        match self
            .windows
            .remove_if(&id, |_, w| w.provider_id == provider_id)
        {
            Some(_) => Ok(1),
            None => Ok(0),
        }
    }

    async fn find_by_provider(&self, provider_id: UserId) -> DbResult<Vec<AvailabilityWindow>> {
        let mut windows: Vec<_> = self
            .windows
            .iter()
            .filter(|r| r.value().provider_id == provider_id)
            .map(|r| r.value().clone())
            .collect();
        windows.sort_by_key(|w| (w.day_of_week, w.start));
        Ok(windows)
    }

    async fn find_by_provider_and_day(
        &self,
        provider_id: UserId,
        day_of_week: i16,
    ) -> DbResult<Vec<AvailabilityWindow>> {
        let mut windows: Vec<_> = self
            .windows
            .iter()
            .filter(|r| {
                r.value().provider_id == provider_id && r.value().day_of_week == day_of_week
            })
            .map(|r| r.value().clone())
            .collect();
        windows.sort_by_key(|w| (w.day_of_week, w.start));
        Ok(windows)
    }
}

/// In-memory booking repository enforcing active-slot uniqueness the way
/// the Postgres partial index does
#[derive(Default, Clone)]
pub struct MockBookingRepository {
    bookings: Arc<DashMap<BookingId, Booking>>,
    slots: Arc<DashMap<(UserId, DateTime<Utc>), BookingId>>,
}

impl MockBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a booking directly, bypassing validation
    #[allow(dead_code)]
    pub fn insert_booking(&self, booking: Booking) {
        if booking.status.holds_slot() {
            self.slots
                .insert((booking.provider_id, booking.scheduled_at), booking.id);
        }
        self.bookings.insert(booking.id, booking);
    }

    /// Fetch a booking without going through the trait
    #[allow(dead_code)]
    pub fn get(&self, id: BookingId) -> Option<Booking> {
        self.bookings.get(&id).map(|r| r.value().clone())
    }

    fn acquire_slot(
        &self,
        id: BookingId,
        provider_id: UserId,
        scheduled_at: DateTime<Utc>,
    ) -> DbResult<()> {
        // The entry lock is the serialization point, like the index check
        // inside the insert.
        match self.slots.entry((provider_id, scheduled_at)) {
            Entry::Occupied(e) if *e.get() != id => Err(DbError::UniqueViolation(
                "bookings_active_slot_idx".to_string(),
            )),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(v) => {
                v.insert(id);
                Ok(())
            }
        }
    }

    fn release_slot(&self, id: BookingId, provider_id: UserId, scheduled_at: DateTime<Utc>) {
        self.slots
            .remove_if(&(provider_id, scheduled_at), |_, held_by| *held_by == id);
    }
}

#[async_trait]
impl BookingRepository for MockBookingRepository {
    async fn create(&self, create: CreateBooking) -> DbResult<Booking> {
        self.acquire_slot(create.id, create.provider_id, create.scheduled_at)?;
        let now = Utc::now();
        let booking = Booking {
            id: create.id,
            client_id: create.client_id,
            provider_id: create.provider_id,
            scheduled_at: create.scheduled_at,
            duration_minutes: create.duration_minutes,
            mode: create.mode,
            location: create.location,
            price_cents: create.price_cents,
            currency: create.currency,
            status: BookingStatus::Pending,
            payment_session_id: None,
            payment_intent_id: None,
            paid_at: None,
            cancelled_at: None,
            cancelled_by: None,
            cancel_reason: None,
            refunded_at: None,
            created_at: now,
            updated_at: now,
        };
        self.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn find_by_id(&self, id: BookingId) -> DbResult<Option<Booking>> {
        Ok(self.bookings.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_payment_intent(&self, payment_intent_id: &str) -> DbResult<Option<Booking>> {
        Ok(self
            .bookings
            .iter()
            .find(|r| r.value().payment_intent_id.as_deref() == Some(payment_intent_id))
            .map(|r| r.value().clone()))
    }

    async fn slot_holding_starts(
        &self,
        provider_id: UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<DateTime<Utc>>> {
        let mut starts: Vec<_> = self
            .bookings
            .iter()
            .filter(|r| {
                let b = r.value();
                b.provider_id == provider_id
                    && b.status.holds_slot()
                    && b.scheduled_at >= from
                    && b.scheduled_at < to
            })
            .map(|r| r.value().scheduled_at)
            .collect();
        starts.sort();
        Ok(starts)
    }

    async fn update_status(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
    ) -> DbResult<bool> {
        let Some(mut booking) = self.bookings.get_mut(&id) else {
            return Ok(false);
        };
        if booking.status != from {
            return Ok(false);
        }
        if to.holds_slot() && !from.holds_slot() {
            self.acquire_slot(id, booking.provider_id, booking.scheduled_at)?;
        }
        if !to.holds_slot() && from.holds_slot() {
            self.release_slot(id, booking.provider_id, booking.scheduled_at);
        }
        booking.status = to;
        booking.updated_at = Utc::now();
        Ok(true)
    }

    async fn record_payment_session(&self, id: BookingId, session_id: &str) -> DbResult<()> {
        if let Some(mut booking) = self.bookings.get_mut(&id) {
            booking.payment_session_id = Some(session_id.to_string());
            booking.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn confirm_payment(
        &self,
        id: BookingId,
        from: BookingStatus,
        payment_session_id: &str,
        payment_intent_id: Option<&str>,
        paid_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let Some(mut booking) = self.bookings.get_mut(&id) else {
            return Ok(false);
        };
        if booking.status != from {
            return Ok(false);
        }
        if !from.holds_slot() {
            self.acquire_slot(id, booking.provider_id, booking.scheduled_at)?;
        }
        booking.status = BookingStatus::Confirmed;
        booking.payment_session_id = Some(payment_session_id.to_string());
        booking.payment_intent_id = payment_intent_id.map(str::to_string);
        booking.paid_at = Some(paid_at);
        booking.updated_at = Utc::now();
        Ok(true)
    }

    async fn record_cancellation(
        &self,
        id: BookingId,
        from: BookingStatus,
        cancelled_by: UserId,
        reason: Option<&str>,
    ) -> DbResult<bool> {
        let Some(mut booking) = self.bookings.get_mut(&id) else {
            return Ok(false);
        };
        if booking.status != from {
            return Ok(false);
        }
        if from.holds_slot() {
            self.release_slot(id, booking.provider_id, booking.scheduled_at);
        }
        booking.status = BookingStatus::Cancelled;
        booking.cancelled_at = Some(Utc::now());
        booking.cancelled_by = Some(cancelled_by);
        booking.cancel_reason = reason.map(str::to_string);
        booking.updated_at = Utc::now();
        Ok(true)
    }

    async fn record_refund(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
        refunded_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let Some(mut booking) = self.bookings.get_mut(&id) else {
            return Ok(false);
        };
        if booking.status != from {
            return Ok(false);
        }
        if from.holds_slot() && !to.holds_slot() {
            self.release_slot(id, booking.provider_id, booking.scheduled_at);
        }
        booking.status = to;
        booking.refunded_at = Some(refunded_at);
        booking.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_refunded_at(&self, id: BookingId, refunded_at: DateTime<Utc>) -> DbResult<()> {
        if let Some(mut booking) = self.bookings.get_mut(&id) {
            booking.refunded_at = Some(refunded_at);
            booking.updated_at = Utc::now();
        }
        Ok(())
    }
}

/// Payment gateway stub that mints predictable session ids
#[derive(Default)]
pub struct StubGateway {
    counter: AtomicUsize,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_checkout(
        &self,
        params: &CheckoutParams,
    ) -> Result<CheckoutSession, BookingError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(CheckoutSession {
            session_id: format!("cs_test_{n}_{}", params.booking_id),
            url: format!("https://checkout.test/pay/{n}"),
        })
    }
}
