//! Background session cleanup task.
//!
//! Periodically evicts expired sessions from the store until cancelled.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::store::SessionStore;

/// Default cleanup interval in seconds.
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 3600; // 1 hour

/// Spawn a background task that periodically cleans up expired sessions.
///
/// The task runs until `shutdown` is cancelled; await the returned handle to
/// know it has stopped.
pub fn spawn_cleanup_task(
    session_store: Arc<SessionStore>,
    cleanup_interval: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(cleanup_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Skip the first immediate tick
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Session cleanup task stopped");
                    break;
                }
                _ = ticker.tick() => {}
            }

            match session_store.evict_expired() {
                Ok(count) if count > 0 => {
                    info!(evicted = count, "Session cleanup completed");
                }
                Ok(_) => {
                    debug!("Session cleanup: no expired sessions");
                }
                Err(e) => {
                    // Retried on the next tick
                    warn!(error = %e, "Session cleanup failed");
                    continue;
                }
            }

            if let Ok(count) = session_store.session_count() {
                debug!(active_sessions = count, "Session store status");
            }
        }
    })
}
