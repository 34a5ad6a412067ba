//! `PostgreSQL` implementation of every check-in datastore trait.

use crate::rows::{
    AccountRow, ParticipantContextRow, RosterRow, SessionAccountRow, SlotActivityRow, SlotCountRow,
    TicketRow,
};
use checkin_core::error::{CheckinError, Result, ValidationError};
use checkin_core::providers::{AccountRepository, AuditLog, SessionStore, TicketStore};
use checkin_core::types::{
    CheckinLogEntry, CheckinTicket, ParticipantContext, PartnerAccount, PartnerId, PartnerSession,
    RedemptionOutcome, RosterEntry, SlotId, SlotParticipantId, SlotRoster, SlotSummary, TicketId,
};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Slot and activity columns shared by the read-model queries.
macro_rules! slot_activity_columns {
    () => {
        "s.id AS slot_id, s.slot_date, s.slot_time, s.duration_minutes, \
         a.id AS activity_id, a.name AS activity_name, a.host_id, a.address, a.image_url"
    };
}

fn store_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> CheckinError {
    move |e| CheckinError::Store(format!("{context}: {e}"))
}

fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

/// `PostgreSQL` check-in store.
///
/// Implements [`AccountRepository`], [`SessionStore`], [`TicketStore`] and
/// [`AuditLog`] over one connection pool. Ticket issuance and redemption
/// each run in a single transaction.
///
/// # Example
///
/// ```no_run
/// use checkin_postgres::PostgresCheckinStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = PostgresCheckinStore::connect("postgres://localhost/checkin", 10).await?;
/// store.migrate().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PostgresCheckinStore {
    pool: PgPool,
}

impl PostgresCheckinStore {
    /// Create a store from an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with a bounded pool.
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::Store`] if the database is unreachable.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(store_error("Failed to connect to database"))?;
        Ok(Self::from_pool(pool))
    }

    /// Run the bundled schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::Store`] if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| CheckinError::Store(format!("Migration failed: {e}")))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// Underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round-trip to the database, for readiness checks.
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::Store`] if the database does not answer.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(store_error("Database ping failed"))?;
        Ok(())
    }
}

impl AccountRepository for PostgresCheckinStore {
    async fn get_partner_account(&self, partner_id: PartnerId) -> Result<Option<PartnerAccount>> {
        let row: Option<AccountRow> = sqlx::query_as(
            r"
            SELECT id, name, business_name, logo_url, account_type
            FROM partner_accounts
            WHERE id = $1
            ",
        )
        .bind(partner_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("Failed to load partner account"))?;

        Ok(row.map(PartnerAccount::from))
    }
}

impl SessionStore for PostgresCheckinStore {
    async fn create_session(&self, session: &PartnerSession) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO partner_sessions (
                id, partner_id, token_hash, device, ip_address, created_at, expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(session.id.0)
        .bind(session.partner_id.0)
        .bind(&session.token_hash)
        .bind(session.device.as_deref())
        .bind(session.ip_address.map(|ip| ip.to_string()))
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(store_error("Failed to create session"))?;

        Ok(())
    }

    async fn find_session_with_account(
        &self,
        token_hash: &str,
    ) -> Result<Option<(PartnerSession, PartnerAccount)>> {
        let row: Option<SessionAccountRow> = sqlx::query_as(
            r"
            SELECT ps.id AS session_id, ps.token_hash, ps.device, ps.ip_address,
                   ps.created_at, ps.expires_at, ps.revoked_at,
                   pa.id, pa.name, pa.business_name, pa.logo_url, pa.account_type
            FROM partner_sessions ps
            JOIN partner_accounts pa ON pa.id = ps.partner_id
            WHERE ps.token_hash = $1
            ",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("Failed to load session"))?;

        Ok(row.map(Into::into))
    }

    async fn revoke_session(&self, token_hash: &str, revoked_at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE partner_sessions
            SET revoked_at = $2
            WHERE token_hash = $1 AND revoked_at IS NULL
            ",
        )
        .bind(token_hash)
        .bind(revoked_at)
        .execute(&self.pool)
        .await
        .map_err(store_error("Failed to revoke session"))?;

        Ok(result.rows_affected() > 0)
    }
}

impl TicketStore for PostgresCheckinStore {
    async fn load_participant(
        &self,
        participant_id: SlotParticipantId,
    ) -> Result<Option<ParticipantContext>> {
        let row: Option<ParticipantContextRow> = sqlx::query_as(concat!(
            "SELECT sp.id AS participant_id, sp.user_id, sp.checked_in_at, sp.checked_in_by, \
                    ap.name AS attendee_name, ap.avatar_url, ",
            slot_activity_columns!(),
            " FROM slot_participants sp \
              JOIN activity_slots s ON s.id = sp.slot_id \
              JOIN activities a ON a.id = s.activity_id \
              LEFT JOIN attendee_profiles ap ON ap.user_id = sp.user_id \
              WHERE sp.id = $1"
        ))
        .bind(participant_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("Failed to load participant"))?;

        Ok(row.map(ParticipantContext::from))
    }

    async fn issue_ticket(&self, ticket: &CheckinTicket) -> Result<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(store_error("Failed to begin transaction"))?;

        // Row lock serialises concurrent issuance for one participant.
        let participant: Option<(Option<DateTime<Utc>>,)> = sqlx::query_as(
            "SELECT checked_in_at FROM slot_participants WHERE id = $1 FOR UPDATE",
        )
        .bind(ticket.participant_id.0)
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_error("Failed to lock participant"))?;

        match participant {
            None => return Err(ValidationError::ParticipantNotFound.into()),
            Some((Some(_),)) => return Err(ValidationError::AlreadyRedeemed.into()),
            Some((None,)) => {}
        }

        let superseded = sqlx::query(
            r"
            UPDATE checkin_tickets
            SET superseded_at = $2, expires_at = LEAST(expires_at, $2)
            WHERE participant_id = $1 AND redeemed_at IS NULL AND superseded_at IS NULL
            ",
        )
        .bind(ticket.participant_id.0)
        .bind(ticket.created_at)
        .execute(&mut *tx)
        .await
        .map_err(store_error("Failed to supersede tickets"))?
        .rows_affected();

        sqlx::query(
            r"
            INSERT INTO checkin_tickets (id, participant_id, token_hash, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(ticket.id.0)
        .bind(ticket.participant_id.0)
        .bind(&ticket.token_hash)
        .bind(ticket.created_at)
        .bind(ticket.expires_at)
        .execute(&mut *tx)
        .await
        .map_err(store_error("Failed to insert ticket"))?;

        tx.commit()
            .await
            .map_err(store_error("Failed to commit ticket issuance"))?;

        tracing::debug!(
            participant_id = %ticket.participant_id,
            superseded,
            "Ticket row inserted"
        );

        Ok(superseded)
    }

    async fn find_ticket_by_hash(&self, token_hash: &str) -> Result<Option<CheckinTicket>> {
        let row: Option<TicketRow> = sqlx::query_as(
            r"
            SELECT id, participant_id, token_hash, created_at, expires_at,
                   superseded_at, redeemed_at, redeemed_by
            FROM checkin_tickets
            WHERE token_hash = $1
            ",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("Failed to load ticket"))?;

        Ok(row.map(CheckinTicket::from))
    }

    async fn redeem_ticket(
        &self,
        ticket_id: TicketId,
        participant_id: SlotParticipantId,
        staff_id: PartnerId,
        now: DateTime<Utc>,
    ) -> Result<RedemptionOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(store_error("Failed to begin transaction"))?;

        // Conditional write: concurrent redeemers block on the row and then
        // see `redeemed_at` already set, so exactly one of them wins.
        let claimed = sqlx::query(
            r"
            UPDATE checkin_tickets
            SET redeemed_at = $3, redeemed_by = $4
            WHERE id = $1 AND participant_id = $2
              AND redeemed_at IS NULL AND expires_at > $3
            ",
        )
        .bind(ticket_id.0)
        .bind(participant_id.0)
        .bind(now)
        .bind(staff_id.0)
        .execute(&mut *tx)
        .await
        .map_err(store_error("Failed to redeem ticket"))?
        .rows_affected();

        if claimed == 0 {
            let current: Option<(Option<DateTime<Utc>>,)> =
                sqlx::query_as("SELECT redeemed_at FROM checkin_tickets WHERE id = $1")
                    .bind(ticket_id.0)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(store_error("Failed to reload ticket"))?;
            tx.rollback()
                .await
                .map_err(store_error("Failed to roll back redemption"))?;

            return Ok(match current {
                Some((Some(_),)) => RedemptionOutcome::AlreadyRedeemed,
                _ => RedemptionOutcome::Expired,
            });
        }

        let checked_in = sqlx::query(
            r"
            UPDATE slot_participants
            SET checked_in_at = $2, checked_in_by = $3
            WHERE id = $1 AND checked_in_at IS NULL
            ",
        )
        .bind(participant_id.0)
        .bind(now)
        .bind(staff_id.0)
        .execute(&mut *tx)
        .await
        .map_err(store_error("Failed to check in participant"))?
        .rows_affected();

        if checked_in == 0 {
            tx.rollback()
                .await
                .map_err(store_error("Failed to roll back redemption"))?;
            tracing::info!(
                ticket_id = %ticket_id,
                participant_id = %participant_id,
                "Participant already checked in, redemption rolled back"
            );
            return Ok(RedemptionOutcome::AlreadyRedeemed);
        }

        tx.commit()
            .await
            .map_err(store_error("Failed to commit redemption"))?;

        Ok(RedemptionOutcome::Redeemed { checked_in_at: now })
    }

    async fn slot_roster(&self, slot_id: SlotId) -> Result<Option<SlotRoster>> {
        let slot: Option<SlotActivityRow> = sqlx::query_as(concat!(
            "SELECT ",
            slot_activity_columns!(),
            " FROM activity_slots s \
              JOIN activities a ON a.id = s.activity_id \
              WHERE s.id = $1"
        ))
        .bind(slot_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("Failed to load slot"))?;

        let Some(slot) = slot else {
            return Ok(None);
        };
        let (slot, activity) = slot.into_parts();

        let rows: Vec<RosterRow> = sqlx::query_as(
            r"
            SELECT sp.id, ap.name, ap.avatar_url, sp.checked_in_at
            FROM slot_participants sp
            LEFT JOIN attendee_profiles ap ON ap.user_id = sp.user_id
            WHERE sp.slot_id = $1
            ORDER BY sp.created_at, sp.id
            ",
        )
        .bind(slot_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("Failed to load roster"))?;

        let participants = rows
            .into_iter()
            .map(|row| RosterEntry {
                id: SlotParticipantId::from_uuid(row.id),
                name: row.name.unwrap_or_default(),
                avatar: row.avatar_url,
                checked_in_at: row.checked_in_at,
            })
            .collect();

        Ok(Some(SlotRoster {
            slot,
            activity,
            participants,
        }))
    }

    async fn partner_slots_on(
        &self,
        partner_id: PartnerId,
        date: NaiveDate,
    ) -> Result<Vec<SlotSummary>> {
        let rows: Vec<SlotCountRow> = sqlx::query_as(concat!(
            "SELECT ",
            slot_activity_columns!(),
            ", COUNT(sp.id) AS total, COUNT(sp.checked_in_at) AS checked_in \
              FROM activity_slots s \
              JOIN activities a ON a.id = s.activity_id \
              LEFT JOIN slot_participants sp ON sp.slot_id = s.id \
              WHERE a.host_id = $1 AND s.slot_date = $2 \
              GROUP BY s.id, a.id \
              ORDER BY s.slot_time, s.id"
        ))
        .bind(partner_id.0)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("Failed to load partner slots"))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let (slot, activity) = row.slot.into_parts();
                SlotSummary {
                    slot,
                    activity,
                    total: count(row.total),
                    checked_in: count(row.checked_in),
                }
            })
            .collect())
    }
}

impl AuditLog for PostgresCheckinStore {
    async fn record(&self, entry: &CheckinLogEntry) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO checkin_logs (
                participant_id, slot_id, activity_id, action, result, performed_by,
                ip_address, user_agent, metadata, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(entry.participant_id.map(|id| id.0))
        .bind(entry.slot_id.map(|id| id.0))
        .bind(entry.activity_id.map(|id| id.0))
        .bind(entry.action.as_str())
        .bind(&entry.result)
        .bind(entry.performed_by)
        .bind(entry.origin.ip_address.map(|ip| ip.to_string()))
        .bind(entry.origin.user_agent.as_deref())
        .bind(&entry.metadata)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(store_error("Failed to write audit entry"))?;

        Ok(())
    }
}
