//! Common test utilities for horae-booking-core integration tests

pub mod mock_repos;

use chrono::{Duration, Utc};

use horae_types::{Booking, BookingId, BookingMode, BookingStatus, UserId};

#[allow(unused_imports)]
pub use mock_repos::{
    MockAvailabilityRepository, MockBookingRepository, MockUserRepository, StubGateway,
};

/// A booking row in an arbitrary state, for inserting behind the service's
/// back
#[allow(dead_code)]
pub fn test_booking(client_id: UserId, provider_id: UserId, status: BookingStatus) -> Booking {
    let now = Utc::now();
    Booking {
        id: BookingId::new(),
        client_id,
        provider_id,
        scheduled_at: now + Duration::days(3),
        duration_minutes: 90,
        mode: BookingMode::Remote,
        location: None,
        price_cents: 12000,
        currency: "eur".to_string(),
        status,
        payment_session_id: None,
        payment_intent_id: None,
        paid_at: None,
        cancelled_at: None,
        cancelled_by: None,
        cancel_reason: None,
        refunded_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// Sign a webhook payload the way the payment gateway does
#[allow(dead_code)]
pub fn sign_payload(secret: &str, payload: &str, timestamp: i64) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}
