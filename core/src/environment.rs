//! Injected dependencies that are not datastores.

use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability.
///
/// Services never call `Utc::now()` directly; window checks, token expiry
/// and redemption timestamps all go through this trait.
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
