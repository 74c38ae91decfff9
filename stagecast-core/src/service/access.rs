//! Access session store
//!
//! Issues, validates, and revokes the short numeric codes that gate viewer
//! entry into a room without an account role. A code is fixed-width numeric,
//! unique while active, and time-boxed; expiry or revocation starts a grace
//! window during which connected viewers are warned but not yet cut off.
//!
//! Authorization validity and the open-connection count are deliberately
//! independent: revoke/expiry flips validity immediately (no new pushes are
//! authorized), while the sockets themselves drain through the grace window
//! and only then are forcibly closed by the sweeper.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AccessConfig;
use crate::models::{EndReason, RoomId, UserId};
use crate::{Error, Result};

use super::hub::BroadcastHub;

/// Lifecycle policy for issued codes.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    pub code_length: usize,
    pub ttl: Duration,
    pub grace: Duration,
    pub max_concurrent: u32,
    pub issue_attempts: u32,
}

impl From<&AccessConfig> for AccessPolicy {
    fn from(config: &AccessConfig) -> Self {
        Self {
            code_length: config.code_length,
            ttl: config.code_ttl(),
            grace: config.grace_period(),
            max_concurrent: config.max_concurrent_per_code,
            issue_attempts: config.issue_attempts,
        }
    }
}

/// A single viewer access session, keyed by its code.
#[derive(Debug, Clone)]
pub struct AccessSession {
    pub code: String,
    pub room_id: RoomId,
    pub issued_by: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at_utc: DateTime<Utc>,
    expires_at: Instant,
    revoked: bool,
    grace_until: Option<Instant>,
    open_connections: u32,
}

impl AccessSession {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Where a resolved session sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Active,
    /// Past expiry but inside the grace window; still connected, but no new
    /// chat/reaction sends are authorized.
    Draining,
}

/// Result of a successful validate/attach.
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub room_id: RoomId,
    pub phase: SessionPhase,
}

pub struct AccessSessionStore {
    sessions: DashMap<String, AccessSession>,
    policy: AccessPolicy,
}

impl AccessSessionStore {
    #[must_use]
    pub fn new(policy: AccessPolicy) -> Self {
        Self {
            sessions: DashMap::new(),
            policy,
        }
    }

    /// Issue a fresh code for `room`. Collisions with active codes trigger
    /// regeneration; a bounded number of attempts guards against a saturated
    /// code space.
    pub fn issue(&self, room_id: RoomId, issued_by: UserId) -> Result<AccessSession> {
        for _ in 0..self.policy.issue_attempts {
            let code = self.generate_code();
            match self.sessions.entry(code.clone()) {
                dashmap::mapref::entry::Entry::Occupied(_) => continue,
                dashmap::mapref::entry::Entry::Vacant(vacant) => {
                    let now = Utc::now();
                    let session = AccessSession {
                        code: code.clone(),
                        room_id: room_id.clone(),
                        issued_by,
                        created_at: now,
                        expires_at_utc: now
                            + chrono::Duration::from_std(self.policy.ttl)
                                .unwrap_or_else(|_| chrono::Duration::seconds(0)),
                        expires_at: Instant::now() + self.policy.ttl,
                        revoked: false,
                        grace_until: None,
                        open_connections: 0,
                    };
                    vacant.insert(session.clone());
                    info!(room_id = %room_id, code = %code, "Access code issued");
                    return Ok(session);
                }
            }
        }
        warn!(room_id = %room_id, attempts = self.policy.issue_attempts, "Code space exhausted");
        Err(Error::ExhaustedCodeSpace)
    }

    /// Look up a code without consuming it. Resolves inside the grace window
    /// (phase `Draining`); past grace the session is purged and reported as
    /// not found. Revoked codes fail immediately.
    pub fn validate(&self, code: &str) -> Result<ValidatedSession> {
        let now = Instant::now();

        let purge = {
            let Some(mut session) = self.sessions.get_mut(code) else {
                return Err(Error::NotFound("Access code".to_string()));
            };
            if session.revoked {
                // Same self-purge as the expired path: past grace end the
                // code reads as gone regardless of sweep cadence.
                if session.grace_until.is_some_and(|g| now >= g) {
                    true
                } else {
                    return Err(Error::Revoked);
                }
            } else if session.is_expired(now) {
                // Grace starts at first detection, whether by a caller or
                // the background sweep.
                let grace_until = *session
                    .grace_until
                    .get_or_insert(now + self.policy.grace);
                if now >= grace_until {
                    true
                } else {
                    return Ok(ValidatedSession {
                        room_id: session.room_id.clone(),
                        phase: SessionPhase::Draining,
                    });
                }
            } else {
                return Ok(ValidatedSession {
                    room_id: session.room_id.clone(),
                    phase: SessionPhase::Active,
                });
            }
        };

        if purge {
            self.sessions.remove(code);
            debug!(code = %code, "Access session purged past grace");
        }
        Err(Error::NotFound("Access code".to_string()))
    }

    /// Bind one more connection to the code, enforcing room scope and the
    /// concurrent-use cap. New connections are refused once the session is
    /// draining; existing ones keep their grace window.
    pub fn attach(&self, code: &str, room_id: &RoomId) -> Result<()> {
        let now = Instant::now();
        let Some(mut session) = self.sessions.get_mut(code) else {
            return Err(Error::NotFound("Access code".to_string()));
        };
        if session.revoked {
            return Err(Error::Revoked);
        }
        if session.is_expired(now) {
            return Err(Error::Expired);
        }
        if session.room_id != *room_id {
            return Err(Error::Unauthorized(
                "Access code is scoped to a different room".to_string(),
            ));
        }
        if session.open_connections >= self.policy.max_concurrent {
            return Err(Error::TooManyConcurrentViewers);
        }
        session.open_connections += 1;
        Ok(())
    }

    /// Release one connection slot. Idempotent for unknown codes; a defunct
    /// session with no remaining connections is purged immediately rather
    /// than waiting out its grace window.
    pub fn detach(&self, code: &str) {
        let purge = {
            let Some(mut session) = self.sessions.get_mut(code) else {
                return;
            };
            session.open_connections = session.open_connections.saturating_sub(1);
            session.open_connections == 0
                && (session.revoked || session.is_expired(Instant::now()))
        };
        if purge {
            self.sessions.remove(code);
            debug!(code = %code, "Access session purged on last disconnect");
        }
    }

    /// Mark a code revoked and start its grace window. Authorization for new
    /// pushes stops here; socket teardown is deferred to the sweeper.
    /// Idempotent under a concurrent sweep of the same session.
    pub fn revoke(&self, code: &str) -> Result<RoomId> {
        let Some(mut session) = self.sessions.get_mut(code) else {
            return Err(Error::NotFound("Access code".to_string()));
        };
        let room_id = session.room_id.clone();
        if !session.revoked {
            session.revoked = true;
            session.grace_until.get_or_insert(Instant::now() + self.policy.grace);
            info!(room_id = %room_id, code = %code, "Access code revoked");
        }
        Ok(room_id)
    }

    /// Room a code is bound to, for authorization checks ahead of revoke.
    pub fn room_of(&self, code: &str) -> Result<RoomId> {
        self.sessions
            .get(code)
            .map(|s| s.room_id.clone())
            .ok_or_else(|| Error::NotFound("Access code".to_string()))
    }

    /// Move past-expiry sessions into their grace window. Returns the
    /// sessions that just transitioned so the hub can send ending notices.
    pub fn expire_overdue(&self) -> Vec<(String, RoomId, EndReason)> {
        let now = Instant::now();
        let mut transitioned = Vec::new();
        for mut entry in self.sessions.iter_mut() {
            if !entry.revoked && entry.is_expired(now) && entry.grace_until.is_none() {
                entry.grace_until = Some(now + self.policy.grace);
                transitioned.push((entry.code.clone(), entry.room_id.clone(), EndReason::Expired));
            }
        }
        transitioned
    }

    /// Remove sessions whose grace window has elapsed. Returns them so the
    /// hub can forcibly close their subscriber connections.
    pub fn collect_elapsed(&self) -> Vec<(String, RoomId)> {
        let now = Instant::now();
        let elapsed: Vec<(String, RoomId)> = self
            .sessions
            .iter()
            .filter(|entry| entry.grace_until.is_some_and(|g| now >= g))
            .map(|entry| (entry.code.clone(), entry.room_id.clone()))
            .collect();
        for (code, _) in &elapsed {
            self.sessions.remove(code);
        }
        elapsed
    }

    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn generate_code(&self) -> String {
        // u64 holds at most 19 full decimal digits; a misconfigured width
        // must not panic code generation.
        let width = self.policy.code_length.clamp(1, 19);
        let max = 10u64.pow(width as u32);
        let n = rand::thread_rng().gen_range(0..max);
        format!("{n:0width$}")
    }
}

/// Background sweep: revoke/expiry grace transitions and forced teardown.
/// Runs on a fixed interval; all store operations are idempotent, so a
/// manual revoke racing the sweep is processed once.
pub fn spawn_sweeper(
    access: Arc<AccessSessionStore>,
    hub: Arc<BroadcastHub>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            for (code, room_id, reason) in access.expire_overdue() {
                let notified = hub.drain_code(&room_id, &code, reason);
                debug!(room_id = %room_id, code = %code, notified, "Session entered grace");
            }
            for (code, room_id) in access.collect_elapsed() {
                let closed = hub.close_code(&room_id, &code);
                if closed > 0 {
                    info!(room_id = %room_id, code = %code, closed, "Grace elapsed, connections closed");
                }
            }
        }
    })
}
