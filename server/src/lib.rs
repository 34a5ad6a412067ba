//! Check-in gateway server.
//!
//! Loads [`config::Config`] from the environment, wires the `PostgreSQL`
//! store, the identity provider and a rate-limit backend into the
//! `checkin-web` router, and serves it with graceful shutdown.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod app;
pub mod config;
pub mod telemetry;

pub use app::run;
pub use config::{Config, ConfigError};
