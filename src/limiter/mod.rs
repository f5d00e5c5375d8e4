//! Per-user request cadence
//!
//! Each user may fetch at most one point per window. The gate reads the
//! profile's last request timestamp and, when it lets a request through,
//! records the current time before the API is called, so a failed call still
//! consumes the window.

use crate::constants::limits::REQUEST_WINDOW_SECS;
use crate::error::{Error, Result};
use crate::profile::{ProfileField, ProfileStore};
#[cfg(test)]
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Source of the current time in epoch seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Clock that only moves when told to
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Decision of the rate limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Request may proceed; the timestamp has been recorded
    Allowed,
    /// Request must wait `wait_secs` more seconds; nothing was recorded
    Denied { wait_secs: i64 },
}

#[cfg(test)]
impl Gate {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Rate limiter over the profile store
///
/// Callers serialize requests of the same user; the limiter itself does not.
pub struct RateLimiter {
    store: Arc<ProfileStore>,
    clock: Arc<dyn Clock>,
    window_secs: i64,
}

impl RateLimiter {
    /// Create a limiter with the standard window
    pub fn new(store: Arc<ProfileStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            window_secs: REQUEST_WINDOW_SECS,
        }
    }

    /// Length of the window in seconds
    pub fn window_secs(&self) -> i64 {
        self.window_secs
    }

    /// Decide whether `id` may fetch now, recording the time when allowed
    pub fn check_and_record(&self, id: &str) -> Result<Gate> {
        let profile = self
            .store
            .get(id)
            .ok_or_else(|| Error::Store(format!("No profile for user {}", id)))?;
        let now = self.clock.now();

        if let Some(last) = profile.last_request {
            // A timestamp ahead of the clock counts as a request made just now
            let elapsed = (now - last).max(0);
            if elapsed < self.window_secs {
                let wait_secs = self.window_secs - elapsed;
                debug!(user = id, elapsed, wait_secs, "rate limit denied");
                return Ok(Gate::Denied { wait_secs });
            }
        }

        if !self.store.set_field(id, ProfileField::LastRequest(now))? {
            return Err(Error::Store(format!("No profile for user {}", id)));
        }
        debug!(user = id, now, "rate limit allowed");
        Ok(Gate::Allowed)
    }
}
