//! Ticket issuance for attendees.

use crate::environment::Clock;
use crate::error::{Result, ValidationError};
use crate::hasher::hash_prefix;
use crate::providers::{AuditLog, TicketStore};
use crate::ticket::{IssuedTicket, TicketCodec};
use crate::time_window::CheckinWindowCalculator;
use crate::types::{
    AuditAction, CheckinLogEntry, CheckinTicket, RequestOrigin, SlotParticipantId, TicketId,
    UserId,
};
use std::sync::Arc;

/// Mints check-in tickets scoped to one registration.
///
/// Re-issuing supersedes the participant's previous ticket, so at most one
/// ticket per participant is ever redeemable.
#[derive(Clone)]
pub struct TicketIssuer<S> {
    store: S,
    codec: TicketCodec,
    calculator: CheckinWindowCalculator,
    clock: Arc<dyn Clock>,
}

impl<S> TicketIssuer<S>
where
    S: TicketStore + AuditLog,
{
    /// Create an issuer.
    #[must_use]
    pub fn new(
        store: S,
        codec: TicketCodec,
        calculator: CheckinWindowCalculator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            codec,
            calculator,
            clock,
        }
    }

    /// Issue a ticket for `participant_id` on behalf of `user_id`.
    ///
    /// # Errors
    ///
    /// - `participant_not_found` if the registration does not exist
    /// - `not_owner` if the registration belongs to someone else
    /// - `already_redeemed` if the attendee is already checked in
    /// - `slot_finished` once the slot's check-in window has closed
    /// - Datastore or signing failures
    pub async fn issue(
        &self,
        participant_id: SlotParticipantId,
        user_id: UserId,
        origin: &RequestOrigin,
    ) -> Result<IssuedTicket> {
        let now = self.clock.now();

        let context = self
            .store
            .load_participant(participant_id)
            .await?
            .ok_or(ValidationError::ParticipantNotFound)?;

        if context.participant.user_id != user_id {
            tracing::warn!(
                participant_id = %participant_id,
                user_id = %user_id,
                "Ticket requested for another user's registration"
            );
            return Err(ValidationError::NotOwner.into());
        }

        if context.participant.checked_in_at.is_some() {
            return Err(ValidationError::AlreadyRedeemed.into());
        }

        let window = self.calculator.window_for(&context.slot);
        if now >= window.end {
            return Err(ValidationError::SlotFinished.into());
        }

        let issued = self.codec.encode(participant_id, window.end)?;
        let ticket = CheckinTicket {
            id: TicketId::new(),
            participant_id,
            token_hash: issued.token_hash.clone(),
            created_at: now,
            expires_at: issued.expires_at,
            superseded_at: None,
            redeemed_at: None,
            redeemed_by: None,
        };

        let superseded = self.store.issue_ticket(&ticket).await?;

        tracing::info!(
            participant_id = %participant_id,
            slot_id = %context.slot.id,
            ticket = hash_prefix(&ticket.token_hash),
            superseded,
            expires_at = %ticket.expires_at,
            "Check-in ticket issued"
        );

        let entry = CheckinLogEntry {
            participant_id: Some(participant_id),
            slot_id: Some(context.slot.id),
            activity_id: Some(context.activity.id),
            action: AuditAction::TokenGenerated,
            result: "success".to_string(),
            performed_by: Some(user_id.0),
            origin: origin.clone(),
            metadata: serde_json::json!({
                "expiresAt": ticket.expires_at,
                "superseded": superseded,
            }),
            created_at: now,
        };
        if let Err(e) = self.store.record(&entry).await {
            tracing::error!(error = %e, "Failed to write check-in audit entry");
        }

        Ok(issued)
    }
}
