//! Row shapes returned by the store's queries and their domain conversions.

use checkin_core::types::{
    AccountType, Activity, ActivityId, AttendeeProfile, CheckinTicket, ParticipantContext,
    PartnerAccount, PartnerId, PartnerSession, SessionId, Slot, SlotId, SlotParticipant,
    SlotParticipantId, TicketId, UserId,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AccountRow {
    pub id: Uuid,
    pub name: String,
    pub business_name: Option<String>,
    pub logo_url: Option<String>,
    pub account_type: String,
}

impl From<AccountRow> for PartnerAccount {
    fn from(row: AccountRow) -> Self {
        Self {
            id: PartnerId::from_uuid(row.id),
            name: row.name,
            business_name: row.business_name,
            logo_url: row.logo_url,
            account_type: AccountType::from_classification(&row.account_type),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SessionAccountRow {
    pub session_id: Uuid,
    pub token_hash: String,
    pub device: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    #[sqlx(flatten)]
    pub account: AccountRow,
}

impl From<SessionAccountRow> for (PartnerSession, PartnerAccount) {
    fn from(row: SessionAccountRow) -> Self {
        let account = PartnerAccount::from(row.account);
        let session = PartnerSession {
            id: SessionId::from_uuid(row.session_id),
            partner_id: account.id,
            token_hash: row.token_hash,
            device: row.device,
            // Unparseable addresses are dropped rather than failing authentication.
            ip_address: row.ip_address.and_then(|ip| ip.parse().ok()),
            created_at: row.created_at,
            expires_at: row.expires_at,
            revoked_at: row.revoked_at,
        };
        (session, account)
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TicketRow {
    pub id: Uuid,
    pub participant_id: Uuid,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub superseded_at: Option<DateTime<Utc>>,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub redeemed_by: Option<Uuid>,
}

impl From<TicketRow> for CheckinTicket {
    fn from(row: TicketRow) -> Self {
        Self {
            id: TicketId::from_uuid(row.id),
            participant_id: SlotParticipantId::from_uuid(row.participant_id),
            token_hash: row.token_hash,
            created_at: row.created_at,
            expires_at: row.expires_at,
            superseded_at: row.superseded_at,
            redeemed_at: row.redeemed_at,
            redeemed_by: row.redeemed_by.map(PartnerId::from_uuid),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SlotActivityRow {
    pub slot_id: Uuid,
    pub slot_date: NaiveDate,
    pub slot_time: NaiveTime,
    pub duration_minutes: Option<i32>,
    pub activity_id: Uuid,
    pub activity_name: String,
    pub host_id: Uuid,
    pub address: Option<String>,
    pub image_url: Option<String>,
}

impl SlotActivityRow {
    pub fn into_parts(self) -> (Slot, Activity) {
        let activity = Activity {
            id: ActivityId::from_uuid(self.activity_id),
            name: self.activity_name,
            host_id: PartnerId::from_uuid(self.host_id),
            address: self.address,
            image_url: self.image_url,
        };
        let slot = Slot {
            id: SlotId::from_uuid(self.slot_id),
            activity_id: activity.id,
            date: self.slot_date,
            time: self.slot_time,
            duration_minutes: self.duration_minutes,
        };
        (slot, activity)
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ParticipantContextRow {
    pub participant_id: Uuid,
    pub user_id: Uuid,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub checked_in_by: Option<Uuid>,
    pub attendee_name: Option<String>,
    pub avatar_url: Option<String>,
    #[sqlx(flatten)]
    pub slot: SlotActivityRow,
}

impl From<ParticipantContextRow> for ParticipantContext {
    fn from(row: ParticipantContextRow) -> Self {
        let (slot, activity) = row.slot.into_parts();
        let user_id = UserId::from_uuid(row.user_id);
        Self {
            participant: SlotParticipant {
                id: SlotParticipantId::from_uuid(row.participant_id),
                slot_id: slot.id,
                user_id,
                checked_in_at: row.checked_in_at,
                checked_in_by: row.checked_in_by.map(PartnerId::from_uuid),
            },
            attendee: AttendeeProfile {
                user_id,
                name: row.attendee_name.unwrap_or_default(),
                avatar_url: row.avatar_url,
            },
            slot,
            activity,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RosterRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub checked_in_at: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SlotCountRow {
    #[sqlx(flatten)]
    pub slot: SlotActivityRow,
    pub total: i64,
    pub checked_in: i64,
}
