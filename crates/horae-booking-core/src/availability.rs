//! Availability windows and slot computation

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime};
use tracing::info;

use horae_db::{AvailabilityRepository, BookingRepository, CreateWindow, UserRepository};
use horae_types::{weekday_index, AvailabilityWindow, TimeOfDay, UserId, WindowId};

use crate::error::BookingError;

/// Fixed slot granularity in minutes
pub const SLOT_MINUTES: u16 = 60;

/// Turns a provider's recurring weekly windows plus existing bookings
/// into concrete bookable slots
#[derive(Clone)]
pub struct AvailabilityService {
    users: Arc<dyn UserRepository>,
    windows: Arc<dyn AvailabilityRepository>,
    bookings: Arc<dyn BookingRepository>,
}

impl AvailabilityService {
    /// Create a new availability service
    pub fn new(
        users: Arc<dyn UserRepository>,
        windows: Arc<dyn AvailabilityRepository>,
        bookings: Arc<dyn BookingRepository>,
    ) -> Self {
        Self {
            users,
            windows,
            bookings,
        }
    }

    /// Free hour-aligned slot starts for a provider on one calendar day
    ///
    /// The listing is advisory: it is not a reservation and is
    /// re-validated when the booking is created.
    pub async fn available_slots(
        &self,
        provider_id: UserId,
        date: NaiveDate,
    ) -> Result<Vec<TimeOfDay>, BookingError> {
        self.users
            .find_provider(provider_id)
            .await?
            .ok_or(BookingError::ProviderNotFound)?;

        let windows = self
            .windows
            .find_by_provider_and_day(provider_id, weekday_index(date))
            .await?;
        if windows.is_empty() {
            return Ok(Vec::new());
        }

        let day_start = date.and_time(NaiveTime::MIN).and_utc();
        let day_end = day_start + Duration::days(1);
        let booked: BTreeSet<TimeOfDay> = self
            .bookings
            .slot_holding_starts(provider_id, day_start, day_end)
            .await?
            .iter()
            .map(TimeOfDay::of)
            .collect();

        Ok(free_slots(&windows, &booked))
    }

    /// Add a recurring weekly window for a provider
    pub async fn add_window(
        &self,
        provider_id: UserId,
        day_of_week: i16,
        start: TimeOfDay,
        end: TimeOfDay,
    ) -> Result<AvailabilityWindow, BookingError> {
        if !(0..=6).contains(&day_of_week) {
            return Err(BookingError::Validation(
                "day_of_week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
            ));
        }
        if start >= end {
            return Err(BookingError::Validation(
                "window start must be before its end".to_string(),
            ));
        }
        self.users
            .find_provider(provider_id)
            .await?
            .ok_or(BookingError::ProviderNotFound)?;

        let window = self
            .windows
            .create(CreateWindow {
                id: WindowId::new(),
                provider_id,
                day_of_week,
                start,
                end,
            })
            .await?;

        info!(
            window_id = %window.id,
            provider_id = %provider_id,
            day_of_week = day_of_week,
            "Availability window added"
        );
        Ok(window)
    }

    /// Remove one of the provider's windows
    pub async fn remove_window(
        &self,
        provider_id: UserId,
        window_id: WindowId,
    ) -> Result<(), BookingError> {
        let removed = self.windows.delete(window_id, provider_id).await?;
        if removed == 0 {
            return Err(BookingError::WindowNotFound);
        }
        info!(window_id = %window_id, provider_id = %provider_id, "Availability window removed");
        Ok(())
    }

    /// All windows of a provider, across the week
    pub async fn list_windows(
        &self,
        provider_id: UserId,
    ) -> Result<Vec<AvailabilityWindow>, BookingError> {
        self.users
            .find_provider(provider_id)
            .await?
            .ok_or(BookingError::ProviderNotFound)?;
        Ok(self.windows.find_by_provider(provider_id).await?)
    }
}

/// Merge slot starts from all windows, drop booked ones, dedupe, sort
fn free_slots(windows: &[AvailabilityWindow], booked: &BTreeSet<TimeOfDay>) -> Vec<TimeOfDay> {
    let mut slots = BTreeSet::new();
    for window in windows {
        slots.extend(window_slot_starts(window));
    }
    slots
        .into_iter()
        .filter(|slot| !booked.contains(slot))
        .collect()
}

/// Hour-aligned candidate starts within one window
///
/// A start qualifies only when a full hour fits before the window's
/// exclusive end, so windows shorter than an hour yield nothing.
fn window_slot_starts(window: &AvailabilityWindow) -> impl Iterator<Item = TimeOfDay> {
    let end = window.end.as_minutes();
    (window.start.as_minutes()..)
        .step_by(usize::from(SLOT_MINUTES))
        .take_while(move |&start| start + SLOT_MINUTES <= end)
        .filter_map(TimeOfDay::from_minutes)
}

/// Whether a time-of-day is a valid slot start in any of the windows
///
/// Slot starts align to each window's own start, not to the clock hour.
pub(crate) fn fits_slot(windows: &[AvailabilityWindow], at: TimeOfDay) -> bool {
    let minute = at.as_minutes();
    windows.iter().any(|window| {
        let start = window.start.as_minutes();
        minute >= start
            && minute + SLOT_MINUTES <= window.end.as_minutes()
            && (minute - start) % SLOT_MINUTES == 0
    })
}
