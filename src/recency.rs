//! Recency projections: newest position per vessel and short tracks.

use crate::error::{TmbError, TmbResult};
use crate::report::AisReport;
use crate::storage::{DocumentStore, ReportFilter};
use crate::tiles::TileHierarchy;
use crate::types::{Mmsi, Position, TileId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// A vessel's position at one instant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VesselPosition {
    pub vessel_id: Mmsi,
    pub position: Position,
    pub timestamp: DateTime<Utc>,
}

impl VesselPosition {
    fn from_report(report: &AisReport) -> Option<Self> {
        report.position().map(|position| VesselPosition {
            vessel_id: report.vessel_id,
            position,
            timestamp: report.timestamp,
        })
    }
}

#[derive(Clone)]
pub struct RecencyView {
    store: Arc<dyn DocumentStore>,
    hierarchy: TileHierarchy,
}

impl RecencyView {
    pub fn new(store: Arc<dyn DocumentStore>, hierarchy: TileHierarchy) -> Self {
        Self { store, hierarchy }
    }

    /// Newest position of every vessel, rows newest first.
    pub fn latest_position_per_vessel(&self) -> TmbResult<Vec<VesselPosition>> {
        let reports = self.store.find_reports(&ReportFilter::all().positions())?;
        Ok(first_per_vessel(&reports))
    }

    /// Up to `n` positions of one vessel, newest first.
    pub fn last_n_positions(&self, vessel_id: Mmsi, n: usize) -> TmbResult<Vec<Position>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let filter = ReportFilter::vessel(vessel_id).positions().limit(Some(n));
        Ok(self
            .store
            .find_reports(&filter)?
            .iter()
            .filter_map(AisReport::position)
            .collect())
    }

    pub fn latest_position(&self, vessel_id: Mmsi) -> TmbResult<Option<VesselPosition>> {
        let filter = ReportFilter::vessel(vessel_id).positions().limit(Some(1));
        Ok(self
            .store
            .find_reports(&filter)?
            .first()
            .and_then(VesselPosition::from_report))
    }

    /// Newest position of every vessel currently inside a tile.
    ///
    /// A vessel whose newest position lies outside the tile is left out, even
    /// if older reports place it inside. Fails with `NotFound` for an unknown tile.
    pub fn latest_positions_in_tile(&self, id: TileId) -> TmbResult<Vec<VesselPosition>> {
        let bbox = self
            .hierarchy
            .tile_bounding_box(id)
            .ok_or_else(|| TmbError::NotFound(format!("tile {}", id)))?;
        Ok(self
            .latest_position_per_vessel()?
            .into_iter()
            .filter(|row| bbox.contains(&row.position))
            .collect())
    }
}

/// Keeps the first position of each vessel in an already newest-first list.
fn first_per_vessel(reports: &[AisReport]) -> Vec<VesselPosition> {
    let mut seen = HashSet::new();
    reports
        .iter()
        .filter(|r| seen.insert(r.vessel_id))
        .filter_map(VesselPosition::from_report)
        .collect()
}
