//! Application state for the Booking API service.

use std::sync::Arc;

use horae_booking_core::{AvailabilityService, BookingService, PaymentReconciler};
use horae_db::{DbPool, Repositories};
use horae_session_core::SessionService;

use crate::config::Config;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Slot computation and window management
    pub availability: Arc<AvailabilityService>,
    /// Booking creation, cancellation and checkout
    pub bookings: Arc<BookingService>,
    /// Payment webhook reconciliation
    pub reconciler: Arc<PaymentReconciler>,
    /// Recording pipeline
    pub sessions: Arc<SessionService>,
    /// Database repositories (caller identity lookups)
    pub repos: Repositories,
    /// Database pool (readiness probe)
    pub pool: DbPool,
    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        availability: AvailabilityService,
        bookings: BookingService,
        reconciler: PaymentReconciler,
        sessions: SessionService,
        repos: Repositories,
        pool: DbPool,
        config: Config,
    ) -> Self {
        Self {
            availability: Arc::new(availability),
            bookings: Arc::new(bookings),
            reconciler: Arc::new(reconciler),
            sessions: Arc::new(sessions),
            repos,
            pool,
            config: Arc::new(config),
        }
    }

    /// Get the ordinary request timeout from config
    pub fn request_timeout(&self) -> std::time::Duration {
        self.config.request_timeout
    }

    /// Get the recording route timeout from config
    pub fn recording_timeout(&self) -> std::time::Duration {
        self.config.recording_timeout
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
