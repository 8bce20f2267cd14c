//! Session types for cookie-based admin authentication.

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::TryRngCore;

use crate::error::AuthError;

/// Token width in bytes (256 bits of entropy).
pub const SESSION_ID_BYTES: usize = 32;

/// Length of the hex rendering handed to clients.
pub const SESSION_ID_HEX_LEN: usize = SESSION_ID_BYTES * 2;

/// Opaque session token (32 random bytes, hex-encoded on the wire).
///
/// Uniqueness rests on the width of the token: with 2^256 possible values the
/// probability of any collision among n live sessions is about n^2 / 2^257,
/// which stays below 2^-200 even for a billion sessions. The store still
/// refuses to overwrite an occupied slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId([u8; SESSION_ID_BYTES]);

impl SessionId {
    /// Draw a new token from the operating system's CSPRNG.
    pub fn generate() -> Result<Self, AuthError> {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| AuthError::RandomnessFailure(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Convert to hex string for cookies.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a presented token. Anything but exactly 64 lowercase hex
    /// characters is rejected, so only the issued spelling matches.
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != SESSION_ID_HEX_LEN
            || !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        {
            return None;
        }
        let mut arr = [0u8; SESSION_ID_BYTES];
        hex::decode_to_slice(s, &mut arr).ok()?;
        Some(Self(arr))
    }

    /// Short prefix safe to put in logs.
    pub fn log_prefix(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// Keep full tokens out of debug output.
impl std::fmt::Debug for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionId({}…)", self.log_prefix())
    }
}

/// An authenticated session. Immutable once created.
#[derive(Debug, Clone)]
pub struct Session {
    /// Session token.
    pub id: SessionId,

    /// Authenticated principal.
    pub user_id: String,

    /// Session creation time.
    pub created_at: DateTime<Utc>,

    /// Session expiry time (`created_at + ttl`).
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Build a session starting at `now` and lasting `ttl`.
    pub fn new(id: SessionId, user_id: String, now: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            id,
            user_id,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Check if the session has expired at the given instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
