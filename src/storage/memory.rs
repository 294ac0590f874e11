//! # Memory Store
//!
//! In-memory document store.
//! Fast, but volatile (data lost on shutdown).
//!
//! Good for:
//! - Testing components without a database file
//! - Injecting outages (see `set_available`)
//! - Small replay tools

use std::collections::HashSet;

use parking_lot::RwLock;

use super::{DocumentStore, ReportFilter, StoreStats, VesselFilter};
use crate::error::{TmbError, TmbResult};
use crate::report::AisReport;
use crate::vessels::VesselIdentity;
use chrono::{DateTime, Utc};

#[derive(Default)]
struct Inner {
    /// Reports tagged with their insertion sequence number
    reports: Vec<(u64, AisReport)>,
    vessels: Vec<VesselIdentity>,
    next_seq: u64,
    unavailable: bool,
}

/// `Vec`-backed store behind a `RwLock`.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("MemoryStore")
            .field("reports", &inner.reports.len())
            .field("vessels", &inner.vessels.len())
            .finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an outage: while unavailable every call fails with `StoreUnavailable`.
    pub fn set_available(&self, available: bool) {
        self.inner.write().unavailable = !available;
    }

    fn check(inner: &Inner) -> TmbResult<()> {
        if inner.unavailable {
            return Err(TmbError::StoreUnavailable(
                "memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

impl DocumentStore for MemoryStore {
    fn insert_reports(&self, reports: &[AisReport]) -> TmbResult<usize> {
        let mut inner = self.inner.write();
        Self::check(&inner)?;

        for report in reports {
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.reports.push((seq, report.clone()));
        }
        Ok(reports.len())
    }

    fn delete_reports_before(&self, cutoff: DateTime<Utc>) -> TmbResult<usize> {
        let mut inner = self.inner.write();
        Self::check(&inner)?;

        let before = inner.reports.len();
        let cutoff_ms = cutoff.timestamp_millis();
        inner.reports.retain(|(_, r)| r.timestamp.timestamp_millis() >= cutoff_ms);
        Ok(before - inner.reports.len())
    }

    fn find_reports(&self, filter: &ReportFilter) -> TmbResult<Vec<AisReport>> {
        let inner = self.inner.read();
        Self::check(&inner)?;

        let mut matched: Vec<&(u64, AisReport)> = inner
            .reports
            .iter()
            .filter(|(_, r)| filter.matches(r))
            .collect();
        matched.sort_by(|(seq_a, a), (seq_b, b)| {
            b.timestamp.cmp(&a.timestamp).then(seq_b.cmp(seq_a))
        });

        let limit = filter.limit.unwrap_or(usize::MAX);
        Ok(matched
            .into_iter()
            .take(limit)
            .map(|(_, r)| r.clone())
            .collect())
    }

    fn insert_vessels(&self, identities: &[VesselIdentity]) -> TmbResult<usize> {
        let mut inner = self.inner.write();
        Self::check(&inner)?;

        inner.vessels.extend_from_slice(identities);
        Ok(identities.len())
    }

    fn find_vessels(&self, filter: &VesselFilter) -> TmbResult<Vec<VesselIdentity>> {
        let inner = self.inner.read();
        Self::check(&inner)?;

        Ok(inner
            .vessels
            .iter()
            .filter(|v| filter.matches(v))
            .cloned()
            .collect())
    }

    fn stats(&self) -> TmbResult<StoreStats> {
        let inner = self.inner.read();
        Self::check(&inner)?;

        let position_reports = inner
            .reports
            .iter()
            .filter(|(_, r)| r.position().is_some())
            .count();
        let distinct_vessels = inner
            .reports
            .iter()
            .map(|(_, r)| r.vessel_id)
            .collect::<HashSet<_>>()
            .len();

        Ok(StoreStats {
            reports: inner.reports.len(),
            position_reports,
            static_reports: inner.reports.len() - position_reports,
            distinct_vessels,
            vessel_identities: inner.vessels.len(),
            oldest: inner.reports.iter().map(|(_, r)| r.timestamp).min(),
            newest: inner.reports.iter().map(|(_, r)| r.timestamp).max(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{from_millis, BoundingBox, Mmsi, Position};

    fn report(mmsi: u32, ms: i64, lat: f64, lon: f64) -> AisReport {
        AisReport::position_report(
            Mmsi::new(mmsi).unwrap(),
            from_millis(ms),
            Position::new(lat, lon).unwrap(),
        )
    }

    #[test]
    fn test_memory_store_orders_newest_first() {
        let store = MemoryStore::new();
        store
            .insert_reports(&[report(1, 100, 1.0, 1.0), report(1, 300, 2.0, 2.0), report(1, 200, 3.0, 3.0)])
            .unwrap();

        let found = store.find_reports(&ReportFilter::all()).unwrap();
        let stamps: Vec<i64> = found.iter().map(|r| r.timestamp.timestamp_millis()).collect();
        assert_eq!(stamps, vec![300, 200, 100]);
    }

    #[test]
    fn test_memory_store_equal_timestamps_latest_insert_first() {
        let store = MemoryStore::new();
        store
            .insert_reports(&[report(1, 100, 1.0, 1.0), report(2, 100, 2.0, 2.0)])
            .unwrap();

        let found = store.find_reports(&ReportFilter::all()).unwrap();
        assert_eq!(found[0].vessel_id.get(), 2);
    }

    #[test]
    fn test_memory_store_bbox_filter() {
        let store = MemoryStore::new();
        store
            .insert_reports(&[report(1, 1, 55.0, 10.0), report(2, 2, 57.0, 10.0)])
            .unwrap();

        let bbox = BoundingBox::new(9.0, 54.0, 11.0, 56.0).unwrap();
        let found = store.find_reports(&ReportFilter::within(bbox)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].vessel_id.get(), 1);
    }

    #[test]
    fn test_memory_store_unavailable() {
        let store = MemoryStore::new();
        store.set_available(false);
        assert!(matches!(
            store.find_reports(&ReportFilter::all()),
            Err(TmbError::StoreUnavailable(_))
        ));
        store.set_available(true);
        assert!(store.find_reports(&ReportFilter::all()).unwrap().is_empty());
    }

    #[test]
    fn test_memory_store_delete_before() {
        let store = MemoryStore::new();
        store
            .insert_reports(&[report(1, 100, 1.0, 1.0), report(1, 200, 1.0, 1.0)])
            .unwrap();
        assert_eq!(store.delete_reports_before(from_millis(200)).unwrap(), 1);
        assert_eq!(store.stats().unwrap().reports, 1);
    }
}
