//! Background sweep of expired shares.

use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

use super::service::ShareRegistry;
use crate::db::Database;

/// Default sweep interval in seconds (1 hour).
pub const DEFAULT_REAP_INTERVAL_SECS: u64 = 3600;

/// Periodically deletes shares whose deadline has passed.
pub struct ShareReaper {
    db: Database,
    reap_interval: Duration,
}

impl ShareReaper {
    /// Create a reaper with the default interval.
    pub fn new(db: Database) -> Self {
        Self::with_interval(db, DEFAULT_REAP_INTERVAL_SECS)
    }

    /// Create a reaper with a custom interval.
    pub fn with_interval(db: Database, interval_secs: u64) -> Self {
        Self {
            db,
            reap_interval: Duration::from_secs(interval_secs.max(1)),
        }
    }

    /// The configured sweep interval.
    pub fn interval(&self) -> Duration {
        self.reap_interval
    }

    /// Run the sweep loop forever. The first sweep happens immediately.
    pub async fn run(&self) {
        info!(
            "Share reaper started (interval: {} seconds)",
            self.reap_interval.as_secs()
        );

        let mut timer = interval(self.reap_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;
            self.sweep().await;
        }
    }

    /// Delete expired shares once. Errors are logged and reported as zero.
    pub async fn sweep(&self) -> u64 {
        debug!("Sweeping expired shares");
        match ShareRegistry::new(&self.db).delete_expired_shares().await {
            Ok(deleted) => deleted,
            Err(e) => {
                error!("Failed to delete expired shares: {}", e);
                0
            }
        }
    }
}
