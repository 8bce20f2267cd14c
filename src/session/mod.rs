//! Session management for admin authentication.
//!
//! This module provides the in-memory session store with lazy expiry
//! and a cancellable background cleanup task.

pub mod cleanup;
pub mod store;
pub mod types;

pub use cleanup::{spawn_cleanup_task, DEFAULT_CLEANUP_INTERVAL_SECS};
pub use store::{SessionStore, DEFAULT_SESSION_TTL_SECS, MAX_SESSION_TTL_SECS};
pub use types::{Session, SessionId};
