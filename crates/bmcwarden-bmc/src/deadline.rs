//! Sequence deadlines
//!
//! A blocking sequence fixes its deadline once, at the start, and every
//! nested wait checks against that same instant.

use std::time::Duration;

use tokio::time::Instant;

use crate::error::BmcError;

/// Stand-in for "never" when a timeout does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    at: Instant,
    timeout: Duration,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        let now = Instant::now();
        let at = now
            .checked_add(timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);
        Self { at, timeout }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Timeout error naming the configured timeout, not the time left
    pub fn error(&self, operation: &str) -> BmcError {
        BmcError::timeout(operation, self.timeout)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
