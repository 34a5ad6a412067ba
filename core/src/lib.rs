//! # Check-in Core
//!
//! Domain logic for event check-in: partner sessions, per-attendee tickets
//! and their one-time redemption at the door.
//!
//! ## Core Concepts
//!
//! - **Window**: the absolute range `[slot − 30 min, slot + 2 h]` in which a
//!   ticket may be redeemed, computed from a slot's civil date and time
//! - **Ticket**: a signed, single-use credential for one registration; only
//!   its hash is stored
//! - **Redemption**: one conditional write that consumes the ticket and
//!   checks the attendee in, exactly once
//! - **Providers**: datastore and identity traits injected into the services
//!
//! ## Example
//!
//! ```
//! use checkin_core::time_window::CheckinWindowCalculator;
//!
//! let calculator = CheckinWindowCalculator::default();
//! let (date, time) = CheckinWindowCalculator::parse_civil("2025-03-30", "14:00")?;
//! let window = calculator.checkin_window(date, time);
//! assert_eq!(window.slot_start.to_rfc3339(), "2025-03-30T12:00:00+00:00");
//! # Ok::<(), checkin_core::error::CheckinError>(())
//! ```

pub mod console;
pub mod environment;
pub mod error;
pub mod hasher;
pub mod issuer;
pub mod providers;
pub mod ticket;
pub mod time_window;
pub mod types;
pub mod validator;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use console::StaffConsole;
pub use environment::{Clock, SystemClock};
pub use error::{AuthError, CheckinError, Result, ValidationError};
pub use issuer::TicketIssuer;
pub use providers::CheckinStore;
pub use ticket::{IssuedTicket, TicketCodec};
pub use time_window::{CheckinWindow, CheckinWindowCalculator};
pub use validator::{CheckinOutcome, CheckinValidator, TicketPreview};
