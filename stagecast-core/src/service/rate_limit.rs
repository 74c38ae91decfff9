//! Server-side reaction rate limiting.
//!
//! Keyed GCRA limiter from the `governor` crate: one reaction per cooldown
//! interval per (room, author). Any client-side pacing is cosmetic; the
//! client is untrusted, so the interval is enforced here regardless. Policy
//! is reject-with-retry-hint rather than coalesce.

use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::sync::Arc;
use std::time::Duration;

use crate::models::RoomId;
use crate::{Error, Result};

type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

#[derive(Clone)]
pub struct ReactionLimiter {
    limiter: Arc<KeyedLimiter>,
    clock: DefaultClock,
}

impl ReactionLimiter {
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        let cooldown = cooldown.max(Duration::from_millis(1));
        let quota = Quota::with_period(cooldown)
            .expect("non-zero cooldown")
            .allow_burst(nonzero!(1u32));
        Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
            clock: DefaultClock::default(),
        }
    }

    /// Check the per-(room, author) interval. `Ok(())` admits exactly one
    /// reaction per cooldown; everything in between is rejected with a
    /// retry-after hint.
    pub fn check(&self, room_id: &RoomId, author: &str) -> Result<()> {
        let key = format!("{}:{author}", room_id.as_str());
        self.limiter.check_key(&key).map_err(|not_until| {
            let wait = not_until.wait_time_from(self.clock.now());
            Error::RateLimited {
                retry_after_ms: (wait.as_millis() as u64).max(1),
            }
        })
    }
}
