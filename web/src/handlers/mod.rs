//! HTTP request handlers, by audience.

pub mod auth;
pub mod checkin;
pub mod health;

pub use health::health_check;
