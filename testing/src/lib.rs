//! # Check-in Testing
//!
//! Testing utilities shared by the check-in crates.
//!
//! This crate provides:
//! - Deterministic clocks (`FixedClock`, `ManualClock`)
//! - A seeded fixture: one business partner hosting one slot with one
//!   registered attendee, plus matching identity-provider credentials
//! - Tracing setup for tests
//!
//! ## Example
//!
//! ```
//! use checkin_testing::{CheckinFixture, test_clock};
//! use checkin_core::Clock;
//!
//! let fixture = CheckinFixture::new().unwrap();
//! let window = fixture.window();
//! assert!(window.contains(test_clock().now()));
//! ```

use checkin_core::environment::Clock;
use chrono::{DateTime, Utc};

/// Deterministic clocks.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::Duration;
    use std::sync::{Arc, PoisonError, RwLock};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use checkin_testing::mocks::FixedClock;
    /// use checkin_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to.
    ///
    /// Clones share the same time, so a test can keep a handle after
    /// handing the clock to a service.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a clock starting at `time`.
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Move the clock forward (or backward, for a negative duration).
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.write().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }

        /// Jump to an absolute time.
        pub fn set(&self, to: DateTime<Utc>) {
            *self.time.write().unwrap_or_else(PoisonError::into_inner) = to;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.read().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Fixed clock at the start of the fixture slot (2025-06-10 18:00 Paris).
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(super::fixtures::slot_start())
    }
}

/// Seeded data for service and HTTP tests.
pub mod fixtures {
    use checkin_core::error::Result;
    use checkin_core::mocks::{InMemoryCheckinStore, MockIdentityProvider};
    use checkin_core::time_window::{CheckinWindow, CheckinWindowCalculator};
    use checkin_core::types::{
        AccountType, Activity, ActivityId, AttendeeProfile, PartnerAccount, PartnerId, Slot, SlotId,
        SlotParticipant, SlotParticipantId, UserId,
    };
    use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

    /// Email of the fixture partner.
    pub const PARTNER_EMAIL: &str = "staff@climbing-gym.example";

    /// Password of the fixture partner.
    pub const PARTNER_PASSWORD: &str = "correct horse battery staple";

    /// Access token of the fixture attendee.
    pub const ATTENDEE_TOKEN: &str = "attendee-access-token";

    /// Civil date of the fixture slot.
    #[must_use]
    pub fn slot_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).unwrap_or_default()
    }

    /// Civil start time of the fixture slot.
    #[must_use]
    pub fn slot_time() -> NaiveTime {
        NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default()
    }

    /// Absolute start of the fixture slot in Europe/Paris (16:00 UTC).
    #[must_use]
    pub fn slot_start() -> DateTime<Utc> {
        CheckinWindowCalculator::default().slot_instant(slot_date(), slot_time())
    }

    /// A partner account with the given classification.
    #[must_use]
    pub fn partner_account(name: &str, classification: &str) -> PartnerAccount {
        PartnerAccount {
            id: PartnerId::new(),
            name: name.to_string(),
            business_name: Some(format!("{name} Ltd")),
            logo_url: None,
            account_type: AccountType::from_classification(classification),
        }
    }

    /// One business partner hosting one slot with one registered attendee.
    #[derive(Debug, Clone)]
    pub struct CheckinFixture {
        /// Seeded store.
        pub store: InMemoryCheckinStore,
        /// Identity provider knowing the partner and attendee credentials.
        pub identity: MockIdentityProvider,
        /// Hosting partner.
        pub partner: PartnerAccount,
        /// Hosted activity.
        pub activity: Activity,
        /// The slot, on [`slot_date`] at [`slot_time`].
        pub slot: Slot,
        /// Registered attendee.
        pub attendee: AttendeeProfile,
        /// The attendee's registration.
        pub participant: SlotParticipant,
    }

    fn register_on(
        store: &InMemoryCheckinStore,
        identity: &MockIdentityProvider,
        slot_id: SlotId,
        name: &str,
        access_token: &str,
    ) -> Result<(AttendeeProfile, SlotParticipant)> {
        let attendee = AttendeeProfile {
            user_id: UserId::new(),
            name: name.to_string(),
            avatar_url: Some(format!("https://cdn.example/avatars/{}.png", name.to_lowercase())),
        };
        store.insert_attendee(attendee.clone())?;
        identity.add_attendee_token(access_token, attendee.user_id)?;

        let participant = SlotParticipant {
            id: SlotParticipantId::new(),
            slot_id,
            user_id: attendee.user_id,
            checked_in_at: None,
            checked_in_by: None,
        };
        store.insert_participant(participant.clone())?;

        Ok((attendee, participant))
    }

    impl CheckinFixture {
        /// Seed a fresh store and identity provider.
        ///
        /// # Errors
        ///
        /// Returns error if a mock lock is poisoned.
        pub fn new() -> Result<Self> {
            let store = InMemoryCheckinStore::new();
            let identity = MockIdentityProvider::new();

            let partner = partner_account("Bloc Party", "business");
            store.insert_account(partner.clone())?;
            identity.add_partner(PARTNER_EMAIL, PARTNER_PASSWORD, partner.id)?;

            let activity = Activity {
                id: ActivityId::new(),
                name: "Evening bouldering".to_string(),
                host_id: partner.id,
                address: Some("12 rue des Prises, Paris".to_string()),
                image_url: None,
            };
            store.insert_activity(activity.clone())?;

            let slot = Slot {
                id: SlotId::new(),
                activity_id: activity.id,
                date: slot_date(),
                time: slot_time(),
                duration_minutes: Some(90),
            };
            store.insert_slot(slot.clone())?;

            let (attendee, participant) =
                register_on(&store, &identity, slot.id, "Camille", ATTENDEE_TOKEN)?;

            Ok(Self {
                store,
                identity,
                partner,
                activity,
                slot,
                attendee,
                participant,
            })
        }

        /// Register another attendee on the fixture slot.
        ///
        /// # Errors
        ///
        /// Returns error if a mock lock is poisoned.
        pub fn register(
            &self,
            name: &str,
            access_token: &str,
        ) -> Result<(AttendeeProfile, SlotParticipant)> {
            register_on(&self.store, &self.identity, self.slot.id, name, access_token)
        }

        /// Add another partner with the given classification and credentials.
        ///
        /// # Errors
        ///
        /// Returns error if a mock lock is poisoned.
        pub fn add_partner(
            &self,
            email: &str,
            password: &str,
            classification: &str,
        ) -> Result<PartnerAccount> {
            let partner = partner_account("Other", classification);
            self.store.insert_account(partner.clone())?;
            self.identity.add_partner(email, password, partner.id)?;
            Ok(partner)
        }

        /// Check-in window of the fixture slot.
        #[must_use]
        pub fn window(&self) -> CheckinWindow {
            CheckinWindowCalculator::default().window_for(&self.slot)
        }
    }
}

/// Test helpers.
pub mod helpers {
    /// Install a test-friendly tracing subscriber once per process.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    }
}

// Re-export commonly used items
pub use fixtures::CheckinFixture;
pub use mocks::{FixedClock, ManualClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-06-10T16:00:00+00:00");
    }

    #[test]
    fn test_manual_clock_is_shared() {
        let clock = ManualClock::new(fixtures::slot_start());
        let handle = clock.clone();

        handle.advance(Duration::minutes(5));
        assert_eq!(clock.now(), fixtures::slot_start() + Duration::minutes(5));

        handle.set(fixtures::slot_start());
        assert_eq!(clock.now(), fixtures::slot_start());
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_fixture_is_consistent() {
        let fixture = CheckinFixture::new().unwrap();
        assert_eq!(fixture.participant.slot_id, fixture.slot.id);
        assert_eq!(fixture.participant.user_id, fixture.attendee.user_id);
        assert_eq!(fixture.activity.host_id, fixture.partner.id);
        assert!(fixture.window().contains(test_clock().now()));
    }
}
