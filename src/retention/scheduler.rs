//! Scheduled pruning - background task that keeps only recent traffic.
//!
//! The query core never schedules anything itself. The server binary spawns
//! this task so the report store stays bounded to the retention window
//! without an external cron job.
//!
//! Each tick prunes relative to the current wall-clock time. Failures are
//! logged and the next tick tries again.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::task;
use tokio::time::interval;

use crate::config::RetentionConfig;
use crate::error::TmbResult;
use crate::retention::{PruneStats, RetentionManager};
use crate::types::utc_now;
use chrono::{DateTime, Utc};
use log::{error, info};

/// Periodic prune driver.
pub struct RetentionScheduler {
    manager: RetentionManager,
    interval: Duration,
    enabled: bool,
    /// Time of the last successful prune
    last_prune_at: Arc<RwLock<Option<DateTime<Utc>>>>,
}

impl RetentionScheduler {
    /// Creates a scheduler; the manager's window is used for every run.
    ///
    /// # Example
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use tmb::config::RetentionConfig;
    /// use tmb::retention::{RetentionManager, RetentionScheduler};
    /// use tmb::storage::MemoryStore;
    ///
    /// let config = RetentionConfig::default();
    /// let manager = RetentionManager::new(Arc::new(MemoryStore::new()), config.window);
    /// let scheduler = Arc::new(RetentionScheduler::new(manager, &config));
    /// # let _ = scheduler;
    /// ```
    pub fn new(manager: RetentionManager, config: &RetentionConfig) -> Self {
        Self {
            manager,
            interval: config.prune_interval,
            enabled: config.enabled,
            last_prune_at: Arc::new(RwLock::new(None)),
        }
    }

    /// Time of the last successful prune, `None` before the first one.
    pub fn last_prune(&self) -> Option<DateTime<Utc>> {
        *self.last_prune_at.read()
    }

    /// Runs the prune loop forever. Returns immediately when disabled.
    ///
    /// Spawn it as a tokio task:
    /// ```rust,no_run
    /// # async fn demo(scheduler: std::sync::Arc<tmb::retention::RetentionScheduler>) {
    /// tokio::spawn(scheduler.clone().start());
    /// # }
    /// ```
    pub async fn start(self: Arc<Self>) {
        if !self.enabled {
            info!("Scheduled pruning is disabled, skipping");
            return;
        }

        info!(
            "Starting scheduled pruning every {}s with a {}s window",
            self.interval.as_secs(),
            self.manager.window().as_secs()
        );

        let mut ticker = interval(self.interval);
        loop {
            ticker.tick().await;
            self.do_prune().await;
        }
    }

    /// Prunes on the blocking pool; store calls may wait on the busy timeout.
    async fn do_prune(&self) {
        let manager = self.manager.clone();
        let reference = utc_now();
        match task::spawn_blocking(move || manager.prune(reference)).await {
            Ok(Ok(stats)) => {
                info!(
                    "Scheduled prune completed: {} reports removed in {}ms",
                    stats.deleted, stats.duration_ms
                );
                *self.last_prune_at.write() = Some(reference);
            }
            Ok(Err(e)) => {
                error!("Scheduled prune failed: {}", e);
            }
            Err(e) => {
                error!("Scheduled prune task aborted: {}", e);
            }
        }
    }

    /// One prune cycle relative to `reference`.
    pub fn run_once(&self, reference: DateTime<Utc>) -> TmbResult<PruneStats> {
        let stats = self.manager.prune(reference)?;
        *self.last_prune_at.write() = Some(reference);
        Ok(stats)
    }
}
