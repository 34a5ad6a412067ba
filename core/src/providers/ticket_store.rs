//! Ticket and registration store trait.

use crate::error::Result;
use crate::types::{
    CheckinTicket, ParticipantContext, PartnerId, RedemptionOutcome, SlotId, SlotParticipantId,
    SlotRoster, SlotSummary, TicketId,
};
use chrono::{DateTime, NaiveDate, Utc};

/// Storage for check-in tickets and the registrations they admit.
///
/// # Implementation Notes
///
/// - `issue_ticket` and `redeem_ticket` must each be atomic
/// - At most one live (unredeemed, unsuperseded) ticket per participant
/// - A participant's `checked_in_at` is written at most once
pub trait TicketStore: Send + Sync {
    /// Load a registration together with its slot, activity and attendee.
    ///
    /// # Errors
    ///
    /// Returns error if the datastore request fails.
    fn load_participant(
        &self,
        participant_id: SlotParticipantId,
    ) -> impl std::future::Future<Output = Result<Option<ParticipantContext>>> + Send;

    /// Supersede every live ticket of the participant and insert `ticket`.
    ///
    /// Superseded tickets get `superseded_at` and an `expires_at` of
    /// `ticket.created_at`. Both steps run under a lock on the participant.
    ///
    /// # Returns
    ///
    /// The number of tickets superseded.
    ///
    /// # Errors
    ///
    /// - `ValidationError::ParticipantNotFound` if the registration is gone
    /// - `ValidationError::AlreadyRedeemed` if the participant is already
    ///   checked in when the lock is taken
    /// - Datastore failure
    fn issue_ticket(
        &self,
        ticket: &CheckinTicket,
    ) -> impl std::future::Future<Output = Result<u64>> + Send;

    /// Find a ticket by the hash of its token.
    ///
    /// # Errors
    ///
    /// Returns error if the datastore request fails.
    fn find_ticket_by_hash(
        &self,
        token_hash: &str,
    ) -> impl std::future::Future<Output = Result<Option<CheckinTicket>>> + Send;

    /// Atomically redeem a ticket and check its participant in.
    ///
    /// Sets the ticket's `redeemed_at`/`redeemed_by` only if it is unredeemed
    /// and `expires_at > now`, then the participant's `checked_in_at`/
    /// `checked_in_by` only if unset. Either write affecting zero rows
    /// rolls back both.
    ///
    /// # Errors
    ///
    /// Returns error if the datastore request fails.
    fn redeem_ticket(
        &self,
        ticket_id: TicketId,
        participant_id: SlotParticipantId,
        staff_id: PartnerId,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<RedemptionOutcome>> + Send;

    /// A slot with its activity and every registration on it.
    ///
    /// # Errors
    ///
    /// Returns error if the datastore request fails.
    fn slot_roster(
        &self,
        slot_id: SlotId,
    ) -> impl std::future::Future<Output = Result<Option<SlotRoster>>> + Send;

    /// Slots hosted by a partner on a civil date, ordered by start time.
    ///
    /// # Errors
    ///
    /// Returns error if the datastore request fails.
    fn partner_slots_on(
        &self,
        partner_id: PartnerId,
        date: NaiveDate,
    ) -> impl std::future::Future<Output = Result<Vec<SlotSummary>>> + Send;
}
