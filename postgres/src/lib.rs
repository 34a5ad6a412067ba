//! `PostgreSQL` datastore for the check-in gateway.
//!
//! [`PostgresCheckinStore`] implements every datastore trait from
//! `checkin-core` with runtime-checked sqlx queries:
//!
//! - Partner accounts and hashed session rows
//! - Ticket issuance with supersession, under a participant row lock
//! - One-shot redemption as a conditional write inside a transaction
//! - Staff console read models
//! - The check-in audit log
//!
//! The schema lives in `migrations/` and is applied with
//! [`PostgresCheckinStore::migrate`].
//!
//! # Example
//!
//! ```ignore
//! use checkin_postgres::PostgresCheckinStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresCheckinStore::connect("postgres://localhost/checkin", 10).await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod rows;
pub mod store;

pub use store::PostgresCheckinStore;
