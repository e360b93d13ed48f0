//! PostgreSQL repository implementations

mod availability;
mod booking;
mod consent;
mod moment;
mod session;
mod user;

pub use availability::PgAvailabilityRepository;
pub use booking::PgBookingRepository;
pub use consent::PgConsentRepository;
pub use moment::PgMarkedMomentRepository;
pub use session::PgSessionRepository;
pub use user::PgUserRepository;

use crate::DbPool;

/// All repositories bundled together
#[derive(Clone)]
pub struct Repositories {
    pub users: PgUserRepository,
    pub availability: PgAvailabilityRepository,
    pub bookings: PgBookingRepository,
    pub sessions: PgSessionRepository,
    pub consents: PgConsentRepository,
    pub moments: PgMarkedMomentRepository,
}

impl Repositories {
    /// Create all repositories from a database pool
    pub fn new(pool: DbPool) -> Self {
        Self {
            users: PgUserRepository::new(pool.clone()),
            availability: PgAvailabilityRepository::new(pool.clone()),
            bookings: PgBookingRepository::new(pool.clone()),
            sessions: PgSessionRepository::new(pool.clone()),
            consents: PgConsentRepository::new(pool.clone()),
            moments: PgMarkedMomentRepository::new(pool),
        }
    }
}
