//! Ticket issuance, door scanning and the staff console views.

use crate::error::AppError;
use crate::extractors::{ApiJson, AuthenticatedAttendee, AuthenticatedPartner, ClientOrigin};
use crate::metrics;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use checkin_auth::providers::RateLimiter;
use checkin_core::providers::{CheckinStore, IdentityProvider};
use checkin_core::time_window::CheckinWindow;
use checkin_core::types::{
    Activity, ActivityId, AttendeeProfile, RosterEntry, Slot, SlotId, SlotParticipantId,
    SlotRoster, SlotSummary,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Requests
// ============================================================================

/// `POST /api/checkin/token` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTicketRequest {
    /// Registration to issue a ticket for.
    #[serde(default, alias = "slot_participant_id")]
    pub slot_participant_id: Option<SlotParticipantId>,
}

/// `POST /api/checkin/verify` and `POST /api/checkin/validate` body.
#[derive(Debug, Deserialize)]
pub struct TicketRequest {
    /// The scanned ticket.
    #[serde(default, alias = "token")]
    pub ticket: String,
}

impl TicketRequest {
    fn ticket(&self) -> Result<&str, AppError> {
        let ticket = self.ticket.trim();
        if ticket.is_empty() {
            return Err(AppError::invalid_input("ticket is required"));
        }
        Ok(ticket)
    }
}

// ============================================================================
// Views
// ============================================================================

/// A slot as shown to staff.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    /// Slot ID.
    pub id: SlotId,
    /// Civil date.
    pub date: NaiveDate,
    /// Civil start time.
    pub time: NaiveTime,
    /// Length in minutes, if known.
    pub duration_minutes: Option<i32>,
}

impl From<&Slot> for SlotView {
    fn from(slot: &Slot) -> Self {
        Self {
            id: slot.id,
            date: slot.date,
            time: slot.time,
            duration_minutes: slot.duration_minutes,
        }
    }
}

/// An activity as shown to staff.
#[derive(Debug, Serialize)]
pub struct ActivityView {
    /// Activity ID.
    pub id: ActivityId,
    /// Activity name.
    pub name: String,
    /// Venue address.
    pub address: Option<String>,
    /// Cover image.
    pub image: Option<String>,
}

impl From<&Activity> for ActivityView {
    fn from(activity: &Activity) -> Self {
        Self {
            id: activity.id,
            name: activity.name.clone(),
            address: activity.address.clone(),
            image: activity.image_url.clone(),
        }
    }
}

/// Who is at the door.
#[derive(Debug, Serialize)]
pub struct ParticipantView {
    /// Registration ID.
    pub id: SlotParticipantId,
    /// Attendee display name.
    pub name: String,
    /// Attendee avatar.
    pub avatar: Option<String>,
}

impl ParticipantView {
    fn new(id: SlotParticipantId, attendee: &AttendeeProfile) -> Self {
        Self {
            id,
            name: attendee.name.clone(),
            avatar: attendee.avatar_url.clone(),
        }
    }
}

/// Check-in window bounds.
#[derive(Debug, Serialize)]
pub struct WindowView {
    /// First instant a ticket is accepted.
    pub start: DateTime<Utc>,
    /// Last instant a ticket is accepted.
    pub end: DateTime<Utc>,
}

impl From<CheckinWindow> for WindowView {
    fn from(window: CheckinWindow) -> Self {
        Self {
            start: window.start,
            end: window.end,
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// `POST /api/checkin/token` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    /// The ticket to render as a QR code.
    pub ticket: String,
    /// When the ticket stops being accepted.
    pub expires_at: DateTime<Utc>,
}

/// `POST /api/checkin/verify` response.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    /// Always `ready`.
    pub status: &'static str,
    /// Registration and attendee.
    pub participant: ParticipantView,
    /// Hosted activity.
    pub activity: ActivityView,
    /// The slot.
    pub slot: SlotView,
    /// The slot's check-in window.
    pub window: WindowView,
}

/// `POST /api/checkin/validate` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    /// Who was checked in.
    pub participant: ParticipantView,
    /// Check-in instant.
    pub checked_in_at: DateTime<Utc>,
}

/// Per-slot counts.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotStats {
    /// Registrations.
    pub total: u64,
    /// Registrations already checked in.
    pub checked_in: u64,
    /// Registrations still expected.
    pub remaining: u64,
}

impl SlotStats {
    const fn new(total: u64, checked_in: u64) -> Self {
        Self {
            total,
            checked_in,
            remaining: total.saturating_sub(checked_in),
        }
    }
}

/// One roster line.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterLine {
    /// Registration ID.
    pub id: SlotParticipantId,
    /// Attendee display name.
    pub name: String,
    /// Attendee avatar.
    pub avatar: Option<String>,
    /// Whether the attendee is checked in.
    pub checked_in: bool,
    /// Check-in instant.
    pub checked_in_at: Option<DateTime<Utc>>,
}

impl From<RosterEntry> for RosterLine {
    fn from(entry: RosterEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            avatar: entry.avatar,
            checked_in: entry.checked_in_at.is_some(),
            checked_in_at: entry.checked_in_at,
        }
    }
}

/// `GET /api/checkin/slots/{slot_id}/status` response.
#[derive(Debug, Serialize)]
pub struct SlotStatusResponse {
    /// The slot.
    pub slot: SlotView,
    /// Hosted activity.
    pub activity: ActivityView,
    /// Counts.
    pub stats: SlotStats,
    /// Roster in registration order.
    pub participants: Vec<RosterLine>,
}

impl From<SlotRoster> for SlotStatusResponse {
    fn from(roster: SlotRoster) -> Self {
        let total = roster.participants.len() as u64;
        let checked_in = roster
            .participants
            .iter()
            .filter(|entry| entry.checked_in_at.is_some())
            .count() as u64;

        Self {
            slot: SlotView::from(&roster.slot),
            activity: ActivityView::from(&roster.activity),
            stats: SlotStats::new(total, checked_in),
            participants: roster.participants.into_iter().map(RosterLine::from).collect(),
        }
    }
}

/// One slot in the today view.
#[derive(Debug, Serialize)]
pub struct TodaySlot {
    /// The slot.
    #[serde(flatten)]
    pub slot: SlotView,
    /// Hosted activity.
    pub activity: ActivityView,
    /// Counts.
    pub stats: SlotStats,
}

impl From<SlotSummary> for TodaySlot {
    fn from(summary: SlotSummary) -> Self {
        Self {
            slot: SlotView::from(&summary.slot),
            activity: ActivityView::from(&summary.activity),
            stats: SlotStats::new(summary.total, summary.checked_in),
        }
    }
}

/// `GET /api/checkin/today-slots` response.
#[derive(Debug, Serialize)]
pub struct TodaySlotsResponse {
    /// Today's civil date in the venue's time zone.
    pub date: NaiveDate,
    /// Slots by start time.
    pub slots: Vec<TodaySlot>,
}

// ============================================================================
// Handlers
// ============================================================================

/// `POST /api/checkin/token`
///
/// Issues a fresh ticket for the attendee's own registration, superseding
/// any earlier one.
///
/// # Errors
///
/// `invalid_input`, `invalid_token`, `participant_not_found`, `not_owner`,
/// `already_redeemed`, `slot_finished`, or an internal error.
pub async fn issue_ticket<S, I, L>(
    State(state): State<AppState<S, I, L>>,
    AuthenticatedAttendee(user_id): AuthenticatedAttendee,
    ClientOrigin(origin): ClientOrigin,
    ApiJson(body): ApiJson<IssueTicketRequest>,
) -> Result<Json<TicketResponse>, AppError>
where
    S: CheckinStore,
    I: IdentityProvider + 'static,
    L: RateLimiter + 'static,
{
    let participant_id = body
        .slot_participant_id
        .ok_or_else(|| AppError::invalid_input("slotParticipantId is required"))?;

    let issued = state.issuer().issue(participant_id, user_id, &origin).await?;
    metrics::record_ticket_issued();

    Ok(Json(TicketResponse {
        ticket: issued.token,
        expires_at: issued.expires_at,
    }))
}

/// `POST /api/checkin/verify`
///
/// Shows who a ticket admits without redeeming it.
///
/// # Errors
///
/// Any rejection of the redemption checks, or an internal error.
pub async fn verify_ticket<S, I, L>(
    State(state): State<AppState<S, I, L>>,
    partner: AuthenticatedPartner,
    ClientOrigin(origin): ClientOrigin,
    ApiJson(body): ApiJson<TicketRequest>,
) -> Result<Json<VerifyResponse>, AppError>
where
    S: CheckinStore,
    I: IdentityProvider + 'static,
    L: RateLimiter + 'static,
{
    let preview = state
        .validator()
        .preview(body.ticket()?, &partner.account, &origin)
        .await?;
    let context = preview.context;

    Ok(Json(VerifyResponse {
        status: "ready",
        participant: ParticipantView::new(context.participant.id, &context.attendee),
        activity: ActivityView::from(&context.activity),
        slot: SlotView::from(&context.slot),
        window: WindowView::from(preview.window),
    }))
}

/// `POST /api/checkin/validate`
///
/// Redeems a ticket. Exactly one request ever succeeds per ticket.
///
/// # Errors
///
/// Any rejection of the redemption checks, or an internal error.
pub async fn validate_ticket<S, I, L>(
    State(state): State<AppState<S, I, L>>,
    partner: AuthenticatedPartner,
    ClientOrigin(origin): ClientOrigin,
    ApiJson(body): ApiJson<TicketRequest>,
) -> Result<Json<ValidateResponse>, AppError>
where
    S: CheckinStore,
    I: IdentityProvider + 'static,
    L: RateLimiter + 'static,
{
    let result = state
        .validator()
        .validate(body.ticket()?, &partner.account, &origin)
        .await;

    match result {
        Ok(outcome) => {
            metrics::record_validation("success");
            Ok(Json(ValidateResponse {
                participant: ParticipantView::new(outcome.participant_id, &outcome.attendee),
                checked_in_at: outcome.checked_in_at,
            }))
        }
        Err(err) => {
            metrics::record_validation(err.kind());
            Err(err.into())
        }
    }
}

/// `GET /api/checkin/slots/{slot_id}/status`
///
/// # Errors
///
/// `invalid_input` for a malformed ID, `slot_not_found`, `foreign_activity`,
/// or an internal error.
pub async fn slot_status<S, I, L>(
    State(state): State<AppState<S, I, L>>,
    partner: AuthenticatedPartner,
    Path(slot_id): Path<String>,
) -> Result<Json<SlotStatusResponse>, AppError>
where
    S: CheckinStore,
    I: IdentityProvider + 'static,
    L: RateLimiter + 'static,
{
    let slot_id = Uuid::parse_str(&slot_id)
        .map(SlotId::from_uuid)
        .map_err(|_| AppError::invalid_input("slot id must be a UUID"))?;

    let roster = state
        .console()
        .slot_status(slot_id, &partner.account)
        .await?;

    Ok(Json(SlotStatusResponse::from(roster)))
}

/// `GET /api/checkin/today-slots`
///
/// # Errors
///
/// Returns an internal error if the datastore fails.
pub async fn today_slots<S, I, L>(
    State(state): State<AppState<S, I, L>>,
    partner: AuthenticatedPartner,
) -> Result<Json<TodaySlotsResponse>, AppError>
where
    S: CheckinStore,
    I: IdentityProvider + 'static,
    L: RateLimiter + 'static,
{
    let (date, slots) = state.console().today_slots(&partner.account).await?;

    Ok(Json(TodaySlotsResponse {
        date,
        slots: slots.into_iter().map(TodaySlot::from).collect(),
    }))
}
