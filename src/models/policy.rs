//! Lending rules configured per deployment

use chrono::{DateTime, Duration, Utc};

/// Expiry window and request gate, handed to the ledger and lifecycle
/// services when they are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LendingPolicy {
    expiry_window: Duration,
    hackers_can_request: bool,
}

impl LendingPolicy {
    pub fn new(request_expiry_minutes: i64, hackers_can_request: bool) -> Self {
        if request_expiry_minutes < 0 {
            tracing::warn!(
                "Negative request expiry of {} minutes, using 0",
                request_expiry_minutes
            );
        }
        Self {
            expiry_window: Duration::minutes(request_expiry_minutes.max(0)),
            hackers_can_request,
        }
    }

    pub fn expiry_window(&self) -> Duration {
        self.expiry_window
    }

    pub fn hackers_can_request(&self) -> bool {
        self.hackers_can_request
    }

    /// Oldest `created_at` a pending request may have and still hold a unit at `now`
    pub fn expiry_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.expiry_window
    }
}

impl Default for LendingPolicy {
    fn default() -> Self {
        Self::new(30, true)
    }
}
