//! Horae Types - Shared domain types
//!
//! This crate contains domain types used across Horae services:
//! - User identity and provider profiles
//! - Availability windows and time-of-day values
//! - Bookings and their status state machine
//! - Sessions, consents and the recording pipeline state machine

pub mod availability;
pub mod booking;
pub mod session;
pub mod user;

pub use availability::*;
pub use booking::*;
pub use session::*;
pub use user::*;
