//! Provider traits for everything outside the check-in logic.
//!
//! The issuer, the validator and the partner auth service depend only on
//! these traits. Production wires the Postgres store and an HTTP identity
//! provider; tests wire the in-memory mocks.
//!
//! ```text
//! ┌──────────────────┐       ┌──────────────────────┐
//! │ TicketIssuer     │──────▶│ TicketStore          │
//! │ CheckinValidator │──────▶│ AuditLog             │
//! └──────────────────┘       └──────────────────────┘
//! ┌──────────────────┐       ┌──────────────────────┐
//! │ PartnerAuth      │──────▶│ SessionStore         │
//! │                  │──────▶│ AccountRepository    │
//! │                  │──────▶│ IdentityProvider     │
//! └──────────────────┘       └──────────────────────┘
//! ```

pub mod account;
pub mod audit;
pub mod identity;
pub mod session;
pub mod ticket_store;

pub use account::AccountRepository;
pub use audit::AuditLog;
pub use identity::IdentityProvider;
pub use session::SessionStore;
pub use ticket_store::TicketStore;

/// Everything the service needs from its datastore.
///
/// Implemented automatically for any type that implements every store trait.
pub trait CheckinStore:
    AccountRepository + SessionStore + TicketStore + AuditLog + Clone + Send + Sync + 'static
{
}

impl<T> CheckinStore for T where
    T: AccountRepository + SessionStore + TicketStore + AuditLog + Clone + Send + Sync + 'static
{
}
