//! Sliding-window deletion of old reports.

use crate::error::{TmbError, TmbResult};
use crate::storage::DocumentStore;
use crate::types::{from_millis, truncate_millis};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use log::{debug, info};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Format of reference times produced by the ingest tooling, e.g. `2024-03-01 12:00:00.123456`.
const REFERENCE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Statistics from one prune run.
#[derive(Debug, Clone, PartialEq)]
pub struct PruneStats {
    /// Number of reports deleted
    pub deleted: usize,
    /// Reports strictly older than this were deleted
    pub cutoff: DateTime<Utc>,
    /// Duration of the delete in milliseconds
    pub duration_ms: u64,
}

/// Deletes reports older than a rolling window.
#[derive(Clone)]
pub struct RetentionManager {
    store: Arc<dyn DocumentStore>,
    window: Duration,
}

impl RetentionManager {
    pub fn new(store: Arc<dyn DocumentStore>, window: Duration) -> Self {
        Self { store, window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Deletes every report with `timestamp < reference - window`.
    ///
    /// Running it again with the same or an earlier reference deletes nothing.
    pub fn prune_older_than(&self, reference: DateTime<Utc>, window: Duration) -> TmbResult<usize> {
        Ok(self.run(reference, window)?.deleted)
    }

    /// `prune_older_than` with the configured window.
    pub fn prune(&self, reference: DateTime<Utc>) -> TmbResult<PruneStats> {
        self.run(reference, self.window)
    }

    fn run(&self, reference: DateTime<Utc>, window: Duration) -> TmbResult<PruneStats> {
        let cutoff = cutoff(reference, window)?;
        let start = Instant::now();

        let deleted = self.store.delete_reports_before(cutoff)?;
        let duration_ms = start.elapsed().as_millis() as u64;

        if deleted > 0 {
            info!("Pruned {} reports older than {}", deleted, cutoff);
        } else {
            debug!("Nothing to prune before {}", cutoff);
        }

        Ok(PruneStats {
            deleted,
            cutoff,
            duration_ms,
        })
    }
}

fn cutoff(reference: DateTime<Utc>, window: Duration) -> TmbResult<DateTime<Utc>> {
    let window = chrono::Duration::from_std(window)
        .map_err(|_| TmbError::InvalidArgument(format!("retention window {:?} is too large", window)))?;
    let cutoff = reference.checked_sub_signed(window).ok_or_else(|| {
        TmbError::InvalidArgument(format!("reference {} minus window underflows", reference))
    })?;
    // Stores compare whole milliseconds, so a fractional cutoff rounds up.
    let floor = truncate_millis(cutoff);
    if floor == cutoff {
        Ok(cutoff)
    } else {
        Ok(from_millis(floor.timestamp_millis() + 1))
    }
}

/// Parses a reference time given as `YYYY-MM-DD HH:MM:SS[.ffffff]` (UTC) or RFC 3339.
///
/// The result is truncated to millisecond precision.
pub fn parse_reference_time(raw: &str) -> TmbResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, REFERENCE_TIME_FORMAT) {
        let instant = Utc.from_utc_datetime(&naive);
        return Ok(from_millis(instant.timestamp_millis()));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| from_millis(dt.timestamp_millis()))
        .map_err(|_| TmbError::InvalidArgument(format!("unrecognised reference time '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::AisReport;
    use crate::storage::MemoryStore;
    use crate::types::{Mmsi, Position};

    fn manager_with(stamps: &[i64]) -> (RetentionManager, Arc<MemoryStore>) {
        let memory = Arc::new(MemoryStore::new());
        let reports: Vec<AisReport> = stamps
            .iter()
            .map(|ms| {
                AisReport::position_report(
                    Mmsi::new(219000001).unwrap(),
                    from_millis(*ms),
                    Position::new(55.0, 10.0).unwrap(),
                )
            })
            .collect();
        memory.insert_reports(&reports).unwrap();
        let manager = RetentionManager::new(memory.clone(), Duration::from_secs(300));
        (manager, memory)
    }

    #[test]
    fn test_prune_is_idempotent() {
        let reference = from_millis(1_000_000);
        let (manager, memory) = manager_with(&[600_000, 699_999, 700_000, 900_000]);

        let window = Duration::from_secs(300);
        assert_eq!(manager.prune_older_than(reference, window).unwrap(), 2);
        assert_eq!(manager.prune_older_than(reference, window).unwrap(), 0);
        assert_eq!(manager.prune_older_than(from_millis(900_000), window).unwrap(), 0);
        assert_eq!(memory.stats().unwrap().reports, 2);
    }

    #[test]
    fn test_fractional_cutoff_rounds_up() {
        let reference = from_millis(1_300_000) + chrono::Duration::microseconds(950);
        let (manager, _) = manager_with(&[1_000_000, 1_000_001]);

        let stats = manager.prune(reference).unwrap();
        assert_eq!(stats.cutoff, from_millis(1_000_001));
        assert_eq!(stats.deleted, 1);
    }

    #[test]
    fn test_prune_empty_store() {
        let (manager, _) = manager_with(&[]);
        let stats = manager.prune(from_millis(1_000_000)).unwrap();
        assert_eq!(stats.deleted, 0);
        assert_eq!(stats.cutoff, from_millis(700_000));
    }

    #[test]
    fn test_prune_propagates_outage() {
        let (manager, memory) = manager_with(&[1]);
        memory.set_available(false);
        assert!(matches!(
            manager.prune(from_millis(1_000_000)),
            Err(TmbError::StoreUnavailable(_))
        ));
    }

    #[test]
    fn test_parse_reference_time() {
        let t = parse_reference_time("2021-12-14 10:20:30.123456").unwrap();
        assert_eq!(t, parse_reference_time("2021-12-14T10:20:30.123Z").unwrap());
        assert_eq!(t.timestamp_subsec_millis(), 123);

        assert!(parse_reference_time("2021-12-14 10:20:30").is_ok());
        assert!(matches!(
            parse_reference_time("yesterday"),
            Err(TmbError::InvalidArgument(_))
        ));
    }
}
