//! Ticket redemption at the door.
//!
//! A presented ticket moves through these checks, in order:
//!
//! 1. signature and type (`ticket_not_found`)
//! 2. lookup by hash (`ticket_not_found`)
//! 3. expiry, natural or by supersession (`ticket_expired`)
//! 4. previous redemption (`already_redeemed`)
//! 5. the registration behind it (`participant_not_found`)
//! 6. the staff partner hosts the activity (`foreign_activity`)
//! 7. the check-in window (`outside_window`)
//! 8. the atomic redemption write (`already_redeemed` for the losing caller)
//!
//! Nothing is written before step 8, and step 8 is a single conditional
//! write, so retries and concurrent scans are safe.

use crate::environment::Clock;
use crate::error::{Result, ValidationError};
use crate::hasher::{hash_prefix, hash_secret};
use crate::providers::{AuditLog, TicketStore};
use crate::ticket::TicketCodec;
use crate::time_window::{CheckinWindow, CheckinWindowCalculator};
use crate::types::{
    ActivityId, AttendeeProfile, AuditAction, CheckinLogEntry, CheckinTicket, ParticipantContext,
    PartnerAccount, RedemptionOutcome, RequestOrigin, SlotId, SlotParticipantId,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// A successful check-in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckinOutcome {
    /// Registration that was checked in.
    pub participant_id: SlotParticipantId,
    /// Who is at the door.
    pub attendee: AttendeeProfile,
    /// Instant written to the registration.
    pub checked_in_at: DateTime<Utc>,
}

/// A ticket that would be accepted right now.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicketPreview {
    /// Registration, slot, activity and attendee behind the ticket.
    pub context: ParticipantContext,
    /// The slot's check-in window.
    pub window: CheckinWindow,
}

/// What a ticket admits, once every read-only check has passed.
struct Admission {
    ticket: CheckinTicket,
    context: ParticipantContext,
    window: CheckinWindow,
}

/// Identifiers learned while checking a ticket, for the audit trail.
#[derive(Default)]
struct Subject {
    participant_id: Option<SlotParticipantId>,
    slot_id: Option<SlotId>,
    activity_id: Option<ActivityId>,
    ticket_hash: Option<String>,
}

/// The redemption state machine.
#[derive(Clone)]
pub struct CheckinValidator<S> {
    store: S,
    codec: TicketCodec,
    calculator: CheckinWindowCalculator,
    clock: Arc<dyn Clock>,
}

impl<S> CheckinValidator<S>
where
    S: TicketStore + AuditLog,
{
    /// Create a validator.
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

    /// Redeem a ticket on behalf of an authenticated staff partner.
    ///
    /// Exactly one caller ever succeeds for a given ticket.
    ///
    /// # Errors
    ///
    /// Any of the rejections listed in the module docs, or a datastore
    /// failure.
    pub async fn validate(
        &self,
        token: &str,
        staff: &PartnerAccount,
        origin: &RequestOrigin,
    ) -> Result<CheckinOutcome> {
        let now = self.clock.now();
        let mut subject = Subject::default();

        let result = match self.inspect(token, staff, now, &mut subject).await {
            Ok(admission) => self.redeem(admission, staff, now).await,
            Err(e) => Err(e),
        };

        let (action, outcome) = match &result {
            Ok(_) => (AuditAction::Validate, "success"),
            Err(e) => (AuditAction::Reject, e.kind()),
        };
        tracing::info!(
            staff_id = %staff.id,
            participant_id = ?subject.participant_id,
            ticket = subject.ticket_hash.as_deref().map(hash_prefix),
            outcome,
            "Check-in validation"
        );
        self.audit(action, outcome, &subject, staff, origin, now).await;

        result
    }

    /// Run every read-only check without redeeming.
    ///
    /// # Errors
    ///
    /// The same rejections as [`CheckinValidator::validate`], minus the
    /// ones only the redemption write can produce.
    pub async fn preview(
        &self,
        token: &str,
        staff: &PartnerAccount,
        origin: &RequestOrigin,
    ) -> Result<TicketPreview> {
        let now = self.clock.now();
        let mut subject = Subject::default();

        let result = self
            .inspect(token, staff, now, &mut subject)
            .await
            .map(|admission| TicketPreview {
                context: admission.context,
                window: admission.window,
            });

        let outcome = match &result {
            Ok(_) => "ready",
            Err(e) => e.kind(),
        };
        tracing::debug!(staff_id = %staff.id, outcome, "Check-in preview");
        self.audit(AuditAction::Scan, outcome, &subject, staff, origin, now)
            .await;

        result
    }

    async fn inspect(
        &self,
        token: &str,
        staff: &PartnerAccount,
        now: DateTime<Utc>,
        subject: &mut Subject,
    ) -> Result<Admission> {
        let claims = self.codec.decode(token, now)?;

        let token_hash = hash_secret(token);
        subject.ticket_hash = Some(token_hash.clone());

        let ticket = self
            .store
            .find_ticket_by_hash(&token_hash)
            .await?
            .filter(|ticket| ticket.participant_id == claims.sp)
            .ok_or(ValidationError::TicketNotFound)?;
        subject.participant_id = Some(ticket.participant_id);

        if now >= ticket.expires_at {
            return Err(ValidationError::TicketExpired.into());
        }
        if ticket.redeemed_at.is_some() {
            return Err(ValidationError::AlreadyRedeemed.into());
        }

        let context = self
            .store
            .load_participant(ticket.participant_id)
            .await?
            .ok_or(ValidationError::ParticipantNotFound)?;
        subject.slot_id = Some(context.slot.id);
        subject.activity_id = Some(context.activity.id);

        if context.activity.host_id != staff.id {
            tracing::warn!(
                staff_id = %staff.id,
                activity_id = %context.activity.id,
                "Ticket presented to a partner that does not host the activity"
            );
            return Err(ValidationError::ForeignActivity.into());
        }

        let window = self.calculator.window_for(&context.slot);
        if !window.contains(now) {
            return Err(ValidationError::OutsideWindow.into());
        }

        Ok(Admission {
            ticket,
            context,
            window,
        })
    }

    async fn redeem(
        &self,
        admission: Admission,
        staff: &PartnerAccount,
        now: DateTime<Utc>,
    ) -> Result<CheckinOutcome> {
        let outcome = self
            .store
            .redeem_ticket(admission.ticket.id, admission.ticket.participant_id, staff.id, now)
            .await?;

        match outcome {
            RedemptionOutcome::Redeemed { checked_in_at } => Ok(CheckinOutcome {
                participant_id: admission.ticket.participant_id,
                attendee: admission.context.attendee,
                checked_in_at,
            }),
            RedemptionOutcome::AlreadyRedeemed => Err(ValidationError::AlreadyRedeemed.into()),
            RedemptionOutcome::Expired => Err(ValidationError::TicketExpired.into()),
        }
    }

    async fn audit(
        &self,
        action: AuditAction,
        result: &str,
        subject: &Subject,
        staff: &PartnerAccount,
        origin: &RequestOrigin,
        now: DateTime<Utc>,
    ) {
        let entry = CheckinLogEntry {
            participant_id: subject.participant_id,
            slot_id: subject.slot_id,
            activity_id: subject.activity_id,
            action,
            result: result.to_string(),
            performed_by: Some(staff.id.0),
            origin: origin.clone(),
            metadata: serde_json::json!({
                "ticket": subject.ticket_hash.as_deref().map(hash_prefix),
            }),
            created_at: now,
        };

        if let Err(e) = self.store.record(&entry).await {
            tracing::error!(error = %e, "Failed to write check-in audit entry");
        }
    }
}
