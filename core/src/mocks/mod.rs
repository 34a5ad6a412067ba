//! In-memory providers for tests and local development.

mod identity;
mod store;

pub use identity::MockIdentityProvider;
pub use store::InMemoryCheckinStore;
