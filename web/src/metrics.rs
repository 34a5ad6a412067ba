//! Prometheus counters for the check-in surface.
//!
//! The recorder is installed by the binary; without one these calls are
//! no-ops, which is what tests rely on.

use checkin_auth::RateLimitTier;
use metrics::{counter, describe_counter};

/// Partner login attempts by `result` (`success` or an error kind).
pub const LOGINS_TOTAL: &str = "checkin_logins_total";

/// Tickets issued to attendees.
pub const TICKETS_ISSUED_TOTAL: &str = "checkin_tickets_issued_total";

/// Redemption attempts by `result` (`success` or an error kind).
pub const VALIDATIONS_TOTAL: &str = "checkin_validations_total";

/// Requests rejected by a rate-limit `tier`.
pub const RATE_LIMITED_TOTAL: &str = "checkin_rate_limited_total";

/// Register descriptions with the installed recorder.
pub fn describe() {
    describe_counter!(LOGINS_TOTAL, "Partner login attempts by result");
    describe_counter!(TICKETS_ISSUED_TOTAL, "Check-in tickets issued");
    describe_counter!(VALIDATIONS_TOTAL, "Ticket redemption attempts by result");
    describe_counter!(RATE_LIMITED_TOTAL, "Requests rejected by rate-limit tier");
}

pub(crate) fn record_login(result: &'static str) {
    counter!(LOGINS_TOTAL, "result" => result).increment(1);
}

pub(crate) fn record_ticket_issued() {
    counter!(TICKETS_ISSUED_TOTAL).increment(1);
}

pub(crate) fn record_validation(result: &'static str) {
    counter!(VALIDATIONS_TOTAL, "result" => result).increment(1);
}

pub(crate) fn record_rate_limited(tier: RateLimitTier) {
    counter!(RATE_LIMITED_TOTAL, "tier" => tier.as_str()).increment(1);
}
