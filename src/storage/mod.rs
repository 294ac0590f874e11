//! Store-client abstraction for AIS reports and vessel identities.
//!
//! Two backends:
//! - **SqliteStore**: SQLite database with indexes on vessel id, timestamp,
//!   latitude and longitude (production)
//! - **MemoryStore**: `Vec`-backed store behind a lock (tests, tooling)
//!
//! Components receive an `Arc<dyn DocumentStore>` and never open their own
//! connections.

pub mod memory;
pub mod sqlite;
pub mod types;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use types::{ReportFilter, StoreStats, VesselFilter};

use crate::error::TmbResult;
use crate::report::AisReport;
use crate::vessels::VesselIdentity;
use chrono::{DateTime, Utc};

/// Indexed document store the core is built on.
///
/// Each call is atomic on its own. `insert_reports` is not transactional
/// across the batch; a failure part-way may leave a prefix written.
pub trait DocumentStore: Send + Sync {
    /// Appends reports, returning how many were accepted.
    fn insert_reports(&self, reports: &[AisReport]) -> TmbResult<usize>;

    /// Appends one report.
    fn insert_report(&self, report: &AisReport) -> TmbResult<()> {
        self.insert_reports(std::slice::from_ref(report)).map(|_| ())
    }

    /// Deletes reports with `timestamp < cutoff`, returning the number removed.
    fn delete_reports_before(&self, cutoff: DateTime<Utc>) -> TmbResult<usize>;

    /// Reports matching `filter`, newest first.
    fn find_reports(&self, filter: &ReportFilter) -> TmbResult<Vec<AisReport>>;

    /// Loads vessel identity reference rows.
    fn insert_vessels(&self, identities: &[VesselIdentity]) -> TmbResult<usize>;

    /// Vessel identities matching `filter`, in load order.
    fn find_vessels(&self, filter: &VesselFilter) -> TmbResult<Vec<VesselIdentity>>;

    fn stats(&self) -> TmbResult<StoreStats>;
}
