//! Read models behind the staff console.

use crate::environment::Clock;
use crate::error::{Result, ValidationError};
use crate::providers::TicketStore;
use crate::time_window::CheckinWindowCalculator;
use crate::types::{PartnerAccount, SlotId, SlotRoster, SlotSummary};
use chrono::NaiveDate;
use std::sync::Arc;

/// Slot views for the partner hosting them.
#[derive(Clone)]
pub struct StaffConsole<S> {
    store: S,
    calculator: CheckinWindowCalculator,
    clock: Arc<dyn Clock>,
}

impl<S: TicketStore> StaffConsole<S> {
    /// Create a console backed by `store`.
    #[must_use]
    pub fn new(store: S, calculator: CheckinWindowCalculator, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            calculator,
            clock,
        }
    }

    /// Roster of a slot hosted by `staff`.
    ///
    /// # Errors
    ///
    /// - `slot_not_found` if the slot does not exist
    /// - `foreign_activity` if another partner hosts it
    pub async fn slot_status(&self, slot_id: SlotId, staff: &PartnerAccount) -> Result<SlotRoster> {
        let roster = self
            .store
            .slot_roster(slot_id)
            .await?
            .ok_or(ValidationError::SlotNotFound)?;

        if roster.activity.host_id != staff.id {
            return Err(ValidationError::ForeignActivity.into());
        }

        Ok(roster)
    }

    /// Slots hosted by `staff` on today's civil date, by start time.
    ///
    /// # Errors
    ///
    /// Returns error if the datastore request fails.
    pub async fn today_slots(&self, staff: &PartnerAccount) -> Result<(NaiveDate, Vec<SlotSummary>)> {
        let today = self.calculator.today(self.clock.now());
        let slots = self.store.partner_slots_on(staff.id, today).await?;
        Ok((today, slots))
    }
}
