//! In-memory check-in store for testing.

use crate::error::{CheckinError, Result, ValidationError};
use crate::providers::{AccountRepository, AuditLog, SessionStore, TicketStore};
use crate::types::{
    Activity, ActivityId, AttendeeProfile, CheckinLogEntry, CheckinTicket, ParticipantContext,
    PartnerAccount, PartnerId, PartnerSession, RedemptionOutcome, RosterEntry, Slot, SlotId,
    SlotParticipant, SlotParticipantId, SlotRoster, SlotSummary, TicketId, UserId,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<PartnerId, PartnerAccount>,
    sessions: HashMap<String, PartnerSession>,
    activities: HashMap<ActivityId, Activity>,
    slots: HashMap<SlotId, Slot>,
    attendees: HashMap<UserId, AttendeeProfile>,
    // Registration order matters for rosters.
    participants: Vec<SlotParticipant>,
    tickets: Vec<CheckinTicket>,
    audit: Vec<CheckinLogEntry>,
}

impl Inner {
    fn context(&self, participant_id: SlotParticipantId) -> Option<ParticipantContext> {
        let participant = self.participants.iter().find(|p| p.id == participant_id)?;
        let slot = self.slots.get(&participant.slot_id)?;
        let activity = self.activities.get(&slot.activity_id)?;
        let attendee = self.attendees.get(&participant.user_id)?;
        Some(ParticipantContext {
            participant: participant.clone(),
            slot: slot.clone(),
            activity: activity.clone(),
            attendee: attendee.clone(),
        })
    }

    fn counts(&self, slot_id: SlotId) -> (u64, u64) {
        self.participants
            .iter()
            .filter(|p| p.slot_id == slot_id)
            .fold((0, 0), |(total, checked_in), p| {
                (total + 1, checked_in + u64::from(p.checked_in_at.is_some()))
            })
    }
}

/// In-memory implementation of every store trait.
///
/// All state sits behind one mutex, so `issue_ticket` and `redeem_ticket`
/// are atomic exactly like their transactional counterparts.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCheckinStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryCheckinStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut Inner) -> Result<R>) -> Result<R> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| CheckinError::Internal("Mutex lock failed".to_string()))?;
        f(&mut inner)
    }

    /// Seed a partner account.
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn insert_account(&self, account: PartnerAccount) -> Result<()> {
        self.with(|inner| {
            inner.accounts.insert(account.id, account);
            Ok(())
        })
    }

    /// Seed an activity.
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn insert_activity(&self, activity: Activity) -> Result<()> {
        self.with(|inner| {
            inner.activities.insert(activity.id, activity);
            Ok(())
        })
    }

    /// Seed a slot.
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn insert_slot(&self, slot: Slot) -> Result<()> {
        self.with(|inner| {
            inner.slots.insert(slot.id, slot);
            Ok(())
        })
    }

    /// Seed an attendee profile.
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn insert_attendee(&self, attendee: AttendeeProfile) -> Result<()> {
        self.with(|inner| {
            inner.attendees.insert(attendee.user_id, attendee);
            Ok(())
        })
    }

    /// Seed a registration.
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn insert_participant(&self, participant: SlotParticipant) -> Result<()> {
        self.with(|inner| {
            inner.participants.push(participant);
            Ok(())
        })
    }

    /// Current state of a registration.
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn participant(&self, id: SlotParticipantId) -> Result<Option<SlotParticipant>> {
        self.with(|inner| Ok(inner.participants.iter().find(|p| p.id == id).cloned()))
    }

    /// Every ticket ever issued for a registration, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn tickets_for(&self, participant_id: SlotParticipantId) -> Result<Vec<CheckinTicket>> {
        self.with(|inner| {
            Ok(inner
                .tickets
                .iter()
                .filter(|t| t.participant_id == participant_id)
                .cloned()
                .collect())
        })
    }

    /// Session row stored under a token hash.
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn session(&self, token_hash: &str) -> Result<Option<PartnerSession>> {
        self.with(|inner| Ok(inner.sessions.get(token_hash).cloned()))
    }

    /// Number of stored sessions.
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn session_count(&self) -> Result<usize> {
        self.with(|inner| Ok(inner.sessions.len()))
    }

    /// Audit entries in write order.
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn audit_entries(&self) -> Result<Vec<CheckinLogEntry>> {
        self.with(|inner| Ok(inner.audit.clone()))
    }
}

impl AccountRepository for InMemoryCheckinStore {
    fn get_partner_account(
        &self,
        partner_id: PartnerId,
    ) -> impl Future<Output = Result<Option<PartnerAccount>>> + Send {
        std::future::ready(self.with(|inner| Ok(inner.accounts.get(&partner_id).cloned())))
    }
}

impl SessionStore for InMemoryCheckinStore {
    fn create_session(&self, session: &PartnerSession) -> impl Future<Output = Result<()>> + Send {
        std::future::ready(self.with(|inner| {
            if inner.sessions.contains_key(&session.token_hash) {
                return Err(CheckinError::Store("Session token hash already exists".to_string()));
            }
            inner
                .sessions
                .insert(session.token_hash.clone(), session.clone());
            Ok(())
        }))
    }

    fn find_session_with_account(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = Result<Option<(PartnerSession, PartnerAccount)>>> + Send {
        std::future::ready(self.with(|inner| {
            Ok(inner.sessions.get(token_hash).and_then(|session| {
                inner
                    .accounts
                    .get(&session.partner_id)
                    .map(|account| (session.clone(), account.clone()))
            }))
        }))
    }

    fn revoke_session(
        &self,
        token_hash: &str,
        revoked_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool>> + Send {
        std::future::ready(self.with(|inner| {
            Ok(match inner.sessions.get_mut(token_hash) {
                Some(session) if session.revoked_at.is_none() => {
                    session.revoked_at = Some(revoked_at);
                    true
                }
                _ => false,
            })
        }))
    }
}

impl TicketStore for InMemoryCheckinStore {
    fn load_participant(
        &self,
        participant_id: SlotParticipantId,
    ) -> impl Future<Output = Result<Option<ParticipantContext>>> + Send {
        std::future::ready(self.with(|inner| Ok(inner.context(participant_id))))
    }

    fn issue_ticket(&self, ticket: &CheckinTicket) -> impl Future<Output = Result<u64>> + Send {
        std::future::ready(self.with(|inner| {
            let participant = inner
                .participants
                .iter()
                .find(|p| p.id == ticket.participant_id)
                .ok_or(ValidationError::ParticipantNotFound)?;
            if participant.checked_in_at.is_some() {
                return Err(ValidationError::AlreadyRedeemed.into());
            }

            let mut superseded = 0;
            for live in inner.tickets.iter_mut().filter(|t| {
                t.participant_id == ticket.participant_id
                    && t.redeemed_at.is_none()
                    && t.superseded_at.is_none()
            }) {
                live.superseded_at = Some(ticket.created_at);
                live.expires_at = live.expires_at.min(ticket.created_at);
                superseded += 1;
            }

            inner.tickets.push(ticket.clone());
            Ok(superseded)
        }))
    }

    fn find_ticket_by_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = Result<Option<CheckinTicket>>> + Send {
        std::future::ready(self.with(|inner| {
            Ok(inner
                .tickets
                .iter()
                .find(|t| t.token_hash == token_hash)
                .cloned())
        }))
    }

    fn redeem_ticket(
        &self,
        ticket_id: TicketId,
        participant_id: SlotParticipantId,
        staff_id: PartnerId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<RedemptionOutcome>> + Send {
        std::future::ready(self.with(|inner| {
            let Some(ticket) = inner.tickets.iter().find(|t| t.id == ticket_id) else {
                return Ok(RedemptionOutcome::Expired);
            };
            if ticket.redeemed_at.is_some() {
                return Ok(RedemptionOutcome::AlreadyRedeemed);
            }
            if ticket.expires_at <= now {
                return Ok(RedemptionOutcome::Expired);
            }

            let Some(participant) = inner
                .participants
                .iter_mut()
                .find(|p| p.id == participant_id && p.checked_in_at.is_none())
            else {
                return Ok(RedemptionOutcome::AlreadyRedeemed);
            };
            participant.checked_in_at = Some(now);
            participant.checked_in_by = Some(staff_id);

            if let Some(ticket) = inner.tickets.iter_mut().find(|t| t.id == ticket_id) {
                ticket.redeemed_at = Some(now);
                ticket.redeemed_by = Some(staff_id);
            }

            Ok(RedemptionOutcome::Redeemed { checked_in_at: now })
        }))
    }

    fn slot_roster(&self, slot_id: SlotId) -> impl Future<Output = Result<Option<SlotRoster>>> + Send {
        std::future::ready(self.with(|inner| {
            let Some(slot) = inner.slots.get(&slot_id) else {
                return Ok(None);
            };
            let Some(activity) = inner.activities.get(&slot.activity_id) else {
                return Ok(None);
            };

            let participants = inner
                .participants
                .iter()
                .filter(|p| p.slot_id == slot_id)
                .map(|p| {
                    let profile = inner.attendees.get(&p.user_id);
                    RosterEntry {
                        id: p.id,
                        name: profile.map(|a| a.name.clone()).unwrap_or_default(),
                        avatar: profile.and_then(|a| a.avatar_url.clone()),
                        checked_in_at: p.checked_in_at,
                    }
                })
                .collect();

            Ok(Some(SlotRoster {
                slot: slot.clone(),
                activity: activity.clone(),
                participants,
            }))
        }))
    }

    fn partner_slots_on(
        &self,
        partner_id: PartnerId,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<SlotSummary>>> + Send {
        std::future::ready(self.with(|inner| {
            let mut summaries: Vec<SlotSummary> = inner
                .slots
                .values()
                .filter(|slot| slot.date == date)
                .filter_map(|slot| {
                    let activity = inner.activities.get(&slot.activity_id)?;
                    (activity.host_id == partner_id).then(|| {
                        let (total, checked_in) = inner.counts(slot.id);
                        SlotSummary {
                            slot: slot.clone(),
                            activity: activity.clone(),
                            total,
                            checked_in,
                        }
                    })
                })
                .collect();
            summaries.sort_by_key(|s| s.slot.time);
            Ok(summaries)
        }))
    }
}

impl AuditLog for InMemoryCheckinStore {
    fn record(&self, entry: &CheckinLogEntry) -> impl Future<Output = Result<()>> + Send {
        std::future::ready(self.with(|inner| {
            inner.audit.push(entry.clone());
            Ok(())
        }))
    }
}
