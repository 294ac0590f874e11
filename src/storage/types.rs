//! Query filters and statistics shared by every store backend.

use crate::report::AisReport;
use crate::types::{BoundingBox, Imo, Mmsi};
use crate::vessels::VesselIdentity;
use chrono::{DateTime, Utc};

/// Predicate over stored reports.
///
/// Results are always ordered by timestamp descending; reports with equal
/// timestamps come back most recently inserted first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReportFilter {
    /// Only reports from this vessel
    pub vessel_id: Option<Mmsi>,
    /// Only position reports inside this box (inclusive)
    pub bbox: Option<BoundingBox>,
    /// Only position reports
    pub positions_only: bool,
    /// Truncate to this many results
    pub limit: Option<usize>,
}

impl ReportFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn vessel(vessel_id: Mmsi) -> Self {
        Self {
            vessel_id: Some(vessel_id),
            ..Default::default()
        }
    }

    pub fn within(bbox: BoundingBox) -> Self {
        Self {
            bbox: Some(bbox),
            positions_only: true,
            ..Default::default()
        }
    }

    pub fn positions(mut self) -> Self {
        self.positions_only = true;
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Whether `report` satisfies every predicate except `limit`.
    pub fn matches(&self, report: &AisReport) -> bool {
        if let Some(vessel_id) = self.vessel_id {
            if report.vessel_id != vessel_id {
                return false;
            }
        }
        let position = report.position();
        if (self.positions_only || self.bbox.is_some()) && position.is_none() {
            return false;
        }
        match (self.bbox, position) {
            (Some(bbox), Some(p)) => bbox.contains(&p),
            _ => true,
        }
    }
}

/// Exact-match predicate over vessel identities. Unset fields are not filtered on.
#[derive(Clone, Debug, PartialEq)]
pub struct VesselFilter {
    pub mmsi: Mmsi,
    pub imo: Option<Imo>,
    pub name: Option<String>,
}

impl VesselFilter {
    pub fn matches(&self, identity: &VesselIdentity) -> bool {
        identity.mmsi == self.mmsi
            && self.imo.map_or(true, |imo| identity.imo == Some(imo))
            && self
                .name
                .as_deref()
                .map_or(true, |name| identity.name.as_deref() == Some(name))
    }
}

/// Statistics about store contents.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StoreStats {
    /// Total stored reports
    pub reports: usize,
    /// Reports carrying a position
    pub position_reports: usize,
    /// Static data reports
    pub static_reports: usize,
    /// Distinct vessels with at least one report
    pub distinct_vessels: usize,
    /// Vessel identity records
    pub vessel_identities: usize,
    /// Oldest report timestamp
    pub oldest: Option<DateTime<Utc>>,
    /// Newest report timestamp
    pub newest: Option<DateTime<Utc>>,
}
