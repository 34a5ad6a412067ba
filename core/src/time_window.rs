//! Check-in window arithmetic.
//!
//! Slots are stored as a civil date and start time in one fixed timezone.
//! Every calculation converts that civil time to an absolute instant through
//! the tz database, so daylight-saving transitions are handled per date
//! instead of per year.
//!
//! The window opens 30 minutes before the slot starts and closes two hours
//! after. Ticket expiry equals the window end, so the end instant itself is
//! outside the window: `[start, end)`.

use crate::error::{CheckinError, Result};
use crate::types::Slot;
use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::Serialize;

/// Minutes before the slot start at which check-in opens.
pub const OPENS_BEFORE_MINUTES: i64 = 30;

/// Hours after the slot start at which check-in closes.
pub const CLOSES_AFTER_HOURS: i64 = 2;

/// Timezone used when none is configured.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Paris;

/// Absolute bounds of a slot's check-in window, half-open: `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinWindow {
    /// Absolute start of the slot.
    pub slot_start: DateTime<Utc>,
    /// First instant at which check-in is accepted.
    pub start: DateTime<Utc>,
    /// First instant at which check-in is refused again; the ticket expiry.
    pub end: DateTime<Utc>,
}

impl CheckinWindow {
    /// Returns `true` if `now` lies within `[start, end)`.
    #[must_use]
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && now < self.end
    }

    /// Returns `true` once the window has closed.
    #[must_use]
    pub fn has_closed(&self, now: DateTime<Utc>) -> bool {
        now >= self.end
    }
}

/// Pure calculator bound to one civil timezone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckinWindowCalculator {
    timezone: Tz,
}

impl Default for CheckinWindowCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEZONE)
    }
}

impl CheckinWindowCalculator {
    /// Create a calculator for the given timezone.
    #[must_use]
    pub const fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// Configured timezone.
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Convert a civil date and time to an absolute instant.
    ///
    /// A time that falls in a spring-forward gap is read with the offset in
    /// force before the gap, which pushes it forward by the gap length. An
    /// ambiguous fall-back time resolves to its earlier instant.
    #[must_use]
    pub fn slot_instant(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        let civil = NaiveDateTime::new(date, time);
        match self.timezone.from_local_datetime(&civil) {
            LocalResult::Single(instant) => instant.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
            LocalResult::None => {
                // Transitions are months apart, so a day earlier is safely
                // on the near side of this one.
                let before_gap = self
                    .timezone
                    .offset_from_utc_datetime(&(civil - Duration::days(1)))
                    .fix();
                let utc = civil - Duration::seconds(i64::from(before_gap.local_minus_utc()));
                Utc.from_utc_datetime(&utc)
            }
        }
    }

    /// Check-in window for a slot starting at the given civil time.
    #[must_use]
    pub fn checkin_window(&self, date: NaiveDate, time: NaiveTime) -> CheckinWindow {
        let slot_start = self.slot_instant(date, time);
        CheckinWindow {
            slot_start,
            start: slot_start - Duration::minutes(OPENS_BEFORE_MINUTES),
            end: slot_start + Duration::hours(CLOSES_AFTER_HOURS),
        }
    }

    /// Check-in window for a stored slot.
    #[must_use]
    pub fn window_for(&self, slot: &Slot) -> CheckinWindow {
        self.checkin_window(slot.date, slot.time)
    }

    /// Expiry of a ticket for a slot starting at the given civil time.
    #[must_use]
    pub fn ticket_expiry(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        self.checkin_window(date, time).end
    }

    /// Returns `true` if `now` is inside the slot's check-in window.
    #[must_use]
    pub fn is_within_window(&self, date: NaiveDate, time: NaiveTime, now: DateTime<Utc>) -> bool {
        self.checkin_window(date, time).contains(now)
    }

    /// Civil date in the configured timezone at `now`.
    #[must_use]
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }

    /// Parse a civil date (`YYYY-MM-DD`) and time (`HH:MM` or `HH:MM:SS`).
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::InvalidInput`] when either part is malformed.
    pub fn parse_civil(date: &str, time: &str) -> Result<(NaiveDate, NaiveTime)> {
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|e| CheckinError::InvalidInput(format!("invalid date {date:?}: {e}")))?;

        let trimmed = time.trim();
        let time = NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
            .map_err(|e| CheckinError::InvalidInput(format!("invalid time {time:?}: {e}")))?;

        Ok((date, time))
    }
}
