//! Domain types for partner sessions, slots and check-in tickets.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of a business operator account.
    PartnerId
);
define_id!(
    /// Identifier of an attendee (end-user) account.
    UserId
);
define_id!(
    /// Identifier of a partner staff session row.
    SessionId
);
define_id!(
    /// Identifier of an activity.
    ActivityId
);
define_id!(
    /// Identifier of a scheduled occurrence of an activity.
    SlotId
);
define_id!(
    /// Identifier of one attendee's registration to a slot.
    SlotParticipantId
);
define_id!(
    /// Identifier of a check-in ticket row.
    TicketId
);

// ============================================================================
// Partners and sessions
// ============================================================================

/// Account classification.
///
/// Only [`AccountType::Business`] accounts may use the staff console.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// A business operator.
    Business,
    /// Any other classification, kept verbatim.
    Other(String),
}

impl AccountType {
    /// Parse the stored classification string.
    #[must_use]
    pub fn from_classification(value: &str) -> Self {
        if value == "business" {
            Self::Business
        } else {
            Self::Other(value.to_string())
        }
    }

    /// Classification as stored.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Business => "business",
            Self::Other(value) => value,
        }
    }

    /// Returns `true` for business accounts.
    #[must_use]
    pub const fn is_business(&self) -> bool {
        matches!(self, Self::Business)
    }
}

/// A business operator's identity, read-only for this subsystem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerAccount {
    /// Account ID.
    pub id: PartnerId,
    /// Display name of the person behind the account.
    pub name: String,
    /// Trading name of the business.
    pub business_name: Option<String>,
    /// Logo shown in the staff console.
    pub logo_url: Option<String>,
    /// Account classification.
    pub account_type: AccountType,
}

/// A partner staff login grant.
///
/// Only the hash of the bearer secret is ever stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartnerSession {
    /// Session ID (embedded in the signed token).
    pub id: SessionId,
    /// Owning partner.
    pub partner_id: PartnerId,
    /// SHA-256 of the bearer token.
    pub token_hash: String,
    /// Originating device descriptor (User-Agent).
    pub device: Option<String>,
    /// Originating network address.
    pub ip_address: Option<IpAddr>,
    /// Issuance time.
    pub created_at: DateTime<Utc>,
    /// Fixed expiry (issuance + session lifetime).
    pub expires_at: DateTime<Utc>,
    /// Set once on logout.
    pub revoked_at: Option<DateTime<Utc>>,
}

impl PartnerSession {
    /// A session is valid iff it is not revoked and `now < expires_at`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && now < self.expires_at
    }
}

// ============================================================================
// Activities, slots and participants
// ============================================================================

/// An activity offered by a partner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Activity ID.
    pub id: ActivityId,
    /// Display name.
    pub name: String,
    /// Partner hosting the activity.
    pub host_id: PartnerId,
    /// Street address, if any.
    pub address: Option<String>,
    /// Cover image reference.
    pub image_url: Option<String>,
}

/// A scheduled occurrence of an activity, expressed in civil time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Slot ID.
    pub id: SlotId,
    /// Owning activity.
    pub activity_id: ActivityId,
    /// Civil date in the configured timezone.
    pub date: NaiveDate,
    /// Civil start time in the configured timezone.
    pub time: NaiveTime,
    /// Optional duration in minutes (informational).
    pub duration_minutes: Option<i32>,
}

/// One attendee's registration to a slot.
///
/// `checked_in_at` is monotonic: once set it is never cleared or overwritten.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotParticipant {
    /// Registration ID.
    pub id: SlotParticipantId,
    /// Slot the attendee registered for.
    pub slot_id: SlotId,
    /// Registered attendee.
    pub user_id: UserId,
    /// Check-in instant.
    pub checked_in_at: Option<DateTime<Utc>>,
    /// Staff partner who performed the check-in.
    pub checked_in_by: Option<PartnerId>,
}

/// Public profile data shown to staff at the door.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendeeProfile {
    /// Attendee ID.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Avatar reference.
    pub avatar_url: Option<String>,
}

/// Everything needed to decide on a registration, loaded in one read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParticipantContext {
    /// The registration.
    pub participant: SlotParticipant,
    /// Its slot.
    pub slot: Slot,
    /// The slot's activity.
    pub activity: Activity,
    /// The registered attendee.
    pub attendee: AttendeeProfile,
}

// ============================================================================
// Tickets
// ============================================================================

/// Lifecycle state of a ticket at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketState {
    /// Not redeemed, not expired.
    Issued,
    /// Consumed (terminal).
    Redeemed,
    /// Past its expiry or superseded (terminal).
    Expired,
}

/// The redeemable credential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckinTicket {
    /// Ticket ID.
    pub id: TicketId,
    /// Registration the ticket admits.
    pub participant_id: SlotParticipantId,
    /// SHA-256 of the bearer token (unique).
    pub token_hash: String,
    /// Issuance time.
    pub created_at: DateTime<Utc>,
    /// Window end, or the supersession instant.
    pub expires_at: DateTime<Utc>,
    /// Set when a newer ticket replaced this one.
    pub superseded_at: Option<DateTime<Utc>>,
    /// Set exactly once on redemption.
    pub redeemed_at: Option<DateTime<Utc>>,
    /// Staff partner who redeemed it.
    pub redeemed_by: Option<PartnerId>,
}

impl CheckinTicket {
    /// Lifecycle state at `now`. Expiry takes precedence over redemption.
    #[must_use]
    pub fn state_at(&self, now: DateTime<Utc>) -> TicketState {
        if now >= self.expires_at {
            TicketState::Expired
        } else if self.redeemed_at.is_some() {
            TicketState::Redeemed
        } else {
            TicketState::Issued
        }
    }
}

/// Result of the conditional redemption write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedemptionOutcome {
    /// This caller won; both the ticket and the participant were updated.
    Redeemed {
        /// Timestamp written to the participant row.
        checked_in_at: DateTime<Utc>,
    },
    /// Another caller (or an earlier request) already consumed the ticket.
    AlreadyRedeemed,
    /// The ticket expired or was superseded between lookup and write.
    Expired,
}

// ============================================================================
// Audit trail
// ============================================================================

/// What happened in an audit entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A ticket was minted for an attendee.
    TokenGenerated,
    /// Staff previewed a ticket without redeeming it.
    Scan,
    /// Staff redeemed a ticket.
    Validate,
    /// A redemption attempt was refused.
    Reject,
}

impl AuditAction {
    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TokenGenerated => "token_generated",
            Self::Scan => "scan",
            Self::Validate => "validate",
            Self::Reject => "reject",
        }
    }
}

/// Who asked, and from where.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestOrigin {
    /// Client network address.
    pub ip_address: Option<IpAddr>,
    /// Client User-Agent.
    pub user_agent: Option<String>,
}

/// One row of the check-in audit log.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckinLogEntry {
    /// Registration concerned, when known.
    pub participant_id: Option<SlotParticipantId>,
    /// Slot concerned, when known.
    pub slot_id: Option<SlotId>,
    /// Activity concerned, when known.
    pub activity_id: Option<ActivityId>,
    /// Action attempted.
    pub action: AuditAction,
    /// `success` or an error kind.
    pub result: String,
    /// Actor (attendee or partner).
    pub performed_by: Option<Uuid>,
    /// Request origin.
    pub origin: RequestOrigin,
    /// Free-form details.
    pub metadata: serde_json::Value,
    /// Time of the entry.
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Staff console read models
// ============================================================================

/// One attendee on a slot roster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    /// Registration ID.
    pub id: SlotParticipantId,
    /// Attendee display name.
    pub name: String,
    /// Attendee avatar.
    pub avatar: Option<String>,
    /// Check-in instant, if checked in.
    pub checked_in_at: Option<DateTime<Utc>>,
}

/// A slot with everyone registered on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotRoster {
    /// The slot.
    pub slot: Slot,
    /// Its activity.
    pub activity: Activity,
    /// Registered attendees, in registration order.
    pub participants: Vec<RosterEntry>,
}

/// A slot with attendance counts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotSummary {
    /// The slot.
    pub slot: Slot,
    /// Its activity.
    pub activity: Activity,
    /// Registered attendees.
    pub total: u64,
    /// Attendees already checked in.
    pub checked_in: u64,
}
