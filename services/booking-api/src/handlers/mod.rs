//! REST API handlers

pub mod availability;
pub mod bookings;
pub mod health;
pub mod recording;
pub mod sessions;
pub mod webhook;

pub use availability::*;
pub use bookings::*;
pub use health::*;
pub use recording::*;
pub use sessions::*;
pub use webhook::*;
