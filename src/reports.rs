//! Report Store: ingestion and basic retrieval of AIS reports.
//!
//! Raw records are parsed into [`AisReport`] before anything reaches the
//! store. Queries return newest-first `Vec`s; an empty result is never an
//! error.

use crate::config::IngestConfig;
use crate::error::{InsertError, TmbResult};
use crate::report::AisReport;
use crate::storage::{DocumentStore, ReportFilter, StoreStats};
use crate::types::{BoundingBox, Mmsi};
use log::{debug, info, warn};
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct ReportStore {
    store: Arc<dyn DocumentStore>,
    ingest: IngestConfig,
}

impl ReportStore {
    pub fn new(store: Arc<dyn DocumentStore>, ingest: IngestConfig) -> Self {
        Self { store, ingest }
    }

    // ============================================================================================
    // INGESTION
    // ============================================================================================

    /// Parses and inserts a batch of raw records.
    ///
    /// The whole batch is parsed before the store is touched, so a malformed
    /// record fails the call with `MalformedInput` and writes nothing. Store
    /// failures fail the whole call.
    ///
    /// # Arguments
    /// - `records`: raw AIS records in the DMA export shape
    ///
    /// # Returns
    /// Number of reports written.
    ///
    /// # Example
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use serde_json::json;
    /// use tmb::config::IngestConfig;
    /// use tmb::{MemoryStore, ReportStore};
    ///
    /// let reports = ReportStore::new(Arc::new(MemoryStore::new()), IngestConfig::default());
    /// let record = json!({
    ///     "Timestamp": "2024-03-01T12:00:00Z", "Class": "Class A", "MMSI": 219000001,
    ///     "MsgType": "position_report",
    ///     "Position": {"type": "Point", "coordinates": [55.1, 10.1]}
    /// });
    /// assert_eq!(reports.insert_batch(&[record])?, 1);
    /// # Ok::<(), tmb::TmbError>(())
    /// ```
    pub fn insert_batch(&self, records: &[Value]) -> TmbResult<usize> {
        let reports = records
            .iter()
            .map(|r| AisReport::from_record(r, self.ingest.coordinate_order))
            .collect::<TmbResult<Vec<_>>>()?;
        self.insert_reports(&reports)
    }

    /// Inserts already-parsed reports.
    pub fn insert_reports(&self, reports: &[AisReport]) -> TmbResult<usize> {
        if reports.is_empty() {
            return Ok(0);
        }
        let count = self.store.insert_reports(reports)?;
        info!("Inserted {} AIS reports", count);
        Ok(count)
    }

    /// Inserts one raw record without propagating errors.
    ///
    /// Bulk pipelines call this per record and keep going on `Err`.
    ///
    /// # Returns
    /// `InsertError::Rejected` for a record that does not parse,
    /// `InsertError::Store` when the store refused the write.
    pub fn insert_one(&self, record: &Value) -> Result<(), InsertError> {
        let report = AisReport::from_record(record, self.ingest.coordinate_order).map_err(|e| {
            debug!("Rejected AIS record: {}", e);
            InsertError::Rejected(e.to_string())
        })?;
        self.store.insert_report(&report).map_err(|e| {
            warn!("Store rejected report from {}: {}", report.vessel_id, e);
            InsertError::Store(e)
        })
    }

    // ============================================================================================
    // QUERIES
    // ============================================================================================

    /// Reports for one vessel or all vessels, newest first, truncated to `limit`.
    pub fn find_latest(&self, vessel_id: Option<Mmsi>, limit: Option<usize>) -> TmbResult<Vec<AisReport>> {
        let filter = ReportFilter {
            vessel_id,
            ..ReportFilter::all()
        }
        .limit(limit);
        self.store.find_reports(&filter)
    }

    /// Position reports inside `bbox`, bounds inclusive, newest first.
    ///
    /// # Example
    /// ```rust,no_run
    /// # fn demo(reports: &tmb::ReportStore) -> tmb::TmbResult<()> {
    /// let bbox = tmb::BoundingBox::new(9.0, 54.5, 10.0, 55.5)?;
    /// for report in reports.find_by_bounding_box(bbox)? {
    ///     println!("{} at {}", report.vessel_id, report.timestamp);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn find_by_bounding_box(&self, bbox: BoundingBox) -> TmbResult<Vec<AisReport>> {
        self.store.find_reports(&ReportFilter::within(bbox))
    }

    pub fn find_by_vessel_id(&self, vessel_id: Mmsi, limit: Option<usize>) -> TmbResult<Vec<AisReport>> {
        self.store
            .find_reports(&ReportFilter::vessel(vessel_id).limit(limit))
    }

    pub fn stats(&self) -> TmbResult<StoreStats> {
        self.store.stats()
    }
}
