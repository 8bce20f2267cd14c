//! In-memory session store.
//!
//! Maps opaque tokens to sessions behind a reader/writer lock:
//! - Lookups share the read lock
//! - Create, delete and sweeps take the write lock
//! - Expired sessions are evicted lazily on lookup and in bulk by the cleanup task

use chrono::{DateTime, Utc};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

use super::types::{Session, SessionId};
use crate::error::AuthError;

/// Default session TTL in seconds (24 hours).
pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;

/// Upper bound accepted for a session TTL (one year).
pub const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Fresh tokens drawn before giving up on an occupied slot.
const MAX_INSERT_ATTEMPTS: usize = 3;

/// Thread-safe session store.
pub struct SessionStore {
    /// Token → session map.
    sessions: RwLock<HashMap<SessionId, Session>>,

    /// Lifetime of every session created by this store.
    ttl: chrono::Duration,
}

impl SessionStore {
    /// Create an empty store whose sessions live for `ttl_secs` seconds.
    pub fn new(ttl_secs: u64) -> Self {
        let ttl_secs = ttl_secs.clamp(1, MAX_SESSION_TTL_SECS);
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: chrono::Duration::seconds(ttl_secs as i64),
        }
    }

    /// Create a new session for `user_id` and store it.
    pub fn create(&self, user_id: &str) -> Result<Session, AuthError> {
        self.create_at(user_id, Utc::now())
    }

    pub(crate) fn create_at(&self, user_id: &str, now: DateTime<Utc>) -> Result<Session, AuthError> {
        for _ in 0..MAX_INSERT_ATTEMPTS {
            let id = SessionId::generate()?;

            let mut sessions = self.write()?;
            if let Entry::Vacant(slot) = sessions.entry(id) {
                let session = Session::new(id, user_id.to_string(), now, self.ttl);
                slot.insert(session.clone());

                debug!(
                    session = %id.log_prefix(),
                    user_id = %session.user_id,
                    expires_at = %session.expires_at,
                    "Session created"
                );
                return Ok(session);
            }

            warn!(session = %id.log_prefix(), "Session token collision, drawing a new token");
        }

        Err(AuthError::TokenCollision)
    }

    /// Get a live session by ID. Expired sessions are evicted and reported as absent.
    pub fn get(&self, id: &SessionId) -> Result<Option<Session>, AuthError> {
        self.get_at(id, Utc::now())
    }

    pub(crate) fn get_at(&self, id: &SessionId, now: DateTime<Utc>) -> Result<Option<Session>, AuthError> {
        {
            let sessions = self.read()?;
            match sessions.get(id) {
                None => return Ok(None),
                Some(session) if !session.is_expired_at(now) => return Ok(Some(session.clone())),
                Some(_) => {}
            }
        }

        // Expired: take the write lock and re-check, a concurrent delete may have won
        let mut sessions = self.write()?;
        if sessions.get(id).is_some_and(|s| s.is_expired_at(now)) {
            sessions.remove(id);
            debug!(session = %id.log_prefix(), "Evicted expired session on lookup");
        }

        Ok(None)
    }

    /// Get a live session by its presented hex token. Malformed tokens are simply absent.
    pub fn get_by_token(&self, token: &str) -> Result<Option<Session>, AuthError> {
        match SessionId::from_hex(token) {
            Some(id) => self.get(&id),
            None => Ok(None),
        }
    }

    /// Delete a session by ID. Returns whether a record was removed; deleting
    /// an absent session is not an error.
    pub fn delete(&self, id: &SessionId) -> Result<bool, AuthError> {
        let removed = self.write()?.remove(id).is_some();
        if removed {
            debug!(session = %id.log_prefix(), "Session deleted");
        }
        Ok(removed)
    }

    /// Evict all expired sessions. Returns the number of sessions evicted.
    pub fn evict_expired(&self) -> Result<usize, AuthError> {
        self.evict_expired_at(Utc::now())
    }

    pub(crate) fn evict_expired_at(&self, now: DateTime<Utc>) -> Result<usize, AuthError> {
        let mut sessions = self.write()?;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now));
        Ok(before - sessions.len())
    }

    /// Number of stored sessions, expired-but-not-yet-evicted ones included.
    pub fn session_count(&self) -> Result<usize, AuthError> {
        Ok(self.read()?.len())
    }

    // A poisoned lock fails the current call only: the poison flag is cleared
    // so the next request or sweep tick gets the map back. Every mutation is a
    // single HashMap call, so a panicking holder cannot leave it half-updated.
    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<SessionId, Session>>, AuthError> {
        match self.sessions.read() {
            Ok(guard) => Ok(guard),
            Err(poisoned) => {
                drop(poisoned);
                Err(self.recover_poisoned())
            }
        }
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<SessionId, Session>>, AuthError> {
        match self.sessions.write() {
            Ok(guard) => Ok(guard),
            Err(poisoned) => {
                drop(poisoned);
                Err(self.recover_poisoned())
            }
        }
    }

    fn recover_poisoned(&self) -> AuthError {
        self.sessions.clear_poison();
        warn!("Session store lock was poisoned, cleared for the next attempt");
        AuthError::StoreUnavailable
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL_SECS)
    }
}
