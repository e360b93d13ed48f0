//! Common test utilities for horae-session-core integration tests

pub mod mock_repos;

use chrono::{Duration, Utc};

use horae_types::{Booking, BookingId, BookingMode, BookingStatus, UserId};

#[allow(unused_imports)]
pub use mock_repos::{
    FakeObjectStore, FakeTranscriber, MockBookingRepository, MockConsentRepository,
    MockMomentRepository, MockSessionRepository,
};

/// A booking row in an arbitrary state, for inserting behind the service's
/// back
pub fn test_booking(client_id: UserId, provider_id: UserId, status: BookingStatus) -> Booking {
    let now = Utc::now();
    Booking {
        id: BookingId::new(),
        client_id,
        provider_id,
        scheduled_at: now - Duration::hours(1),
        duration_minutes: 90,
        mode: BookingMode::Remote,
        location: None,
        price_cents: 12000,
        currency: "eur".to_string(),
        status,
        payment_session_id: Some("cs_test_123".to_string()),
        payment_intent_id: Some("pi_test_123".to_string()),
        paid_at: Some(now - Duration::days(1)),
        cancelled_at: None,
        cancelled_by: None,
        cancel_reason: None,
        refunded_at: None,
        created_at: now - Duration::days(2),
        updated_at: now,
    }
}
