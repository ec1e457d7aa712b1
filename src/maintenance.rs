//! Periodic expiry sweeps
//!
//! One background task evicts expired cache entries and sessions on a fixed
//! interval. Each sweep snapshots keys before evicting, so locks are never
//! held across a full scan. The task exits when the shutdown signal flips.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::cache::TtlCache;
use crate::session::SessionStore;

/// Run the expiry sweep loop until `shutdown` signals true.
pub async fn run_maintenance(
    cache: Arc<TtlCache>,
    sessions: Arc<SessionStore>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(interval_secs = interval.as_secs(), "maintenance task started");
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                let entries = cache.cleanup_expired().await;
                let expired_sessions = sessions.sweep_expired().await;
                if entries > 0 || expired_sessions > 0 {
                    debug!(entries, expired_sessions, "expiry sweep complete");
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("maintenance task shutting down");
                    break;
                }
            }
        }
    }
}
