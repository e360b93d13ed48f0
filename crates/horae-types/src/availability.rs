//! Availability windows and time-of-day values

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::UserId;

/// Unique availability window identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowId(pub Uuid);

impl WindowId {
    /// Create a new random window ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a window ID from a string
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for WindowId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for WindowId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Minutes in a day
pub const MINUTES_PER_DAY: u16 = 1_440;

/// A minute boundary within a day, `00:00` to `24:00` inclusive
///
/// `24:00` never occurs as a point in time; it exists only as the
/// exclusive end of an availability window that runs to midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    /// Build from minutes after midnight; `None` when out of range
    pub const fn from_minutes(minutes: u16) -> Option<Self> {
        if minutes <= MINUTES_PER_DAY {
            Some(Self(minutes))
        } else {
            None
        }
    }

    /// The minute of the day a timestamp falls on (UTC wall clock)
    pub fn of(at: &DateTime<Utc>) -> Self {
        Self((at.hour() * 60 + at.minute()) as u16)
    }

    pub const fn as_minutes(&self) -> u16 {
        self.0
    }

    pub const fn hour(&self) -> u16 {
        self.0 / 60
    }

    pub const fn minute(&self) -> u16 {
        self.0 % 60
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl std::str::FromStr for TimeOfDay {
    type Err = ParseTimeOfDayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseTimeOfDayError(s.to_string());
        let (h, m) = s.split_once(':').ok_or_else(err)?;
        let hour: u16 = h.parse().map_err(|_| err())?;
        let minute: u16 = m.parse().map_err(|_| err())?;
        if minute > 59 || h.len() != 2 || m.len() != 2 {
            return Err(err());
        }
        Self::from_minutes(hour * 60 + minute).ok_or_else(err)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error parsing an `HH:MM` time-of-day string
#[derive(Debug, Clone, Error)]
#[error("invalid time of day (expected HH:MM): {0}")]
pub struct ParseTimeOfDayError(pub String);

/// Day-of-week index with Sunday as 0, the convention availability
/// windows are stored in
pub fn weekday_index(date: NaiveDate) -> i16 {
    date.weekday().num_days_from_sunday() as i16
}

/// A weekly-recurring bookable window of a provider's calendar
///
/// The window covers `[start, end)` on every occurrence of
/// `day_of_week`. Windows of one provider may overlap; slot generation
/// de-duplicates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    /// Window ID
    pub id: WindowId,
    /// The provider whose calendar this is
    pub provider_id: UserId,
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: i16,
    /// Inclusive start of the window
    pub start: TimeOfDay,
    /// Exclusive end of the window
    pub end: TimeOfDay,
    /// When the window was created
    pub created_at: DateTime<Utc>,
}
