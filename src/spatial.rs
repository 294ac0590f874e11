//! Spatial queries: translate a port or tile into a bounding box and
//! range-query the report store with it.

use crate::error::{TmbError, TmbResult};
use crate::report::AisReport;
use crate::reports::ReportStore;
use crate::tiles::{Port, TileHierarchy};
use crate::types::{PortId, TileId, ZoomLevel};
use log::debug;
use serde::Serialize;

/// Result of a port-anchored position query.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum PortPositions {
    /// Position reports inside the port's finest tile, newest first
    Positions(Vec<AisReport>),
    /// The port could not be narrowed to a tile; the full port catalog
    UnresolvedPort(Vec<Port>),
}

impl PortPositions {
    pub fn positions(&self) -> Option<&[AisReport]> {
        match self {
            PortPositions::Positions(reports) => Some(reports),
            PortPositions::UnresolvedPort(_) => None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, PortPositions::UnresolvedPort(_))
    }
}

#[derive(Clone)]
pub struct SpatialQueryEngine {
    hierarchy: TileHierarchy,
    reports: ReportStore,
}

impl SpatialQueryEngine {
    pub fn new(hierarchy: TileHierarchy, reports: ReportStore) -> Self {
        Self { hierarchy, reports }
    }

    /// Positions in the zoom-3 tile of the named port.
    ///
    /// # Arguments
    /// - `name`: port name, matched exactly
    /// - `country`: narrows the match when several ports share a name
    ///
    /// # Returns
    /// `Positions` with the reports inside the port's tile, newest first. An
    /// unknown port or one without a zoom-3 tile yields `UnresolvedPort` with
    /// every catalog port.
    ///
    /// # Example
    /// ```rust,no_run
    /// # fn demo(engine: &tmb::SpatialQueryEngine) -> tmb::TmbResult<()> {
    /// match engine.positions_near_port("Aabenraa", Some("Denmark"))? {
    ///     tmb::PortPositions::Positions(reports) => println!("{} reports", reports.len()),
    ///     tmb::PortPositions::UnresolvedPort(ports) => println!("pick one of {} ports", ports.len()),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn positions_near_port(&self, name: &str, country: Option<&str>) -> TmbResult<PortPositions> {
        match self.hierarchy.resolve_port_to_tile(name, country, ZoomLevel::FINEST) {
            Some(tile) => self.positions_for_port_tile(tile),
            None => Ok(self.unresolved(name)),
        }
    }

    /// Like `positions_near_port`, keyed by port id. Fails with `NotFound` for an unknown id.
    pub fn positions_near_port_by_id(&self, id: &PortId) -> TmbResult<PortPositions> {
        let port = self
            .hierarchy
            .port(id)
            .ok_or_else(|| TmbError::NotFound(format!("port {}", id)))?;
        match port.tile_ref(ZoomLevel::FINEST) {
            Some(tile) => self.positions_for_port_tile(tile),
            None => Ok(self.unresolved(&port.name)),
        }
    }

    /// Position reports inside a tile, newest first.
    ///
    /// # Arguments
    /// - `id`: tile at any zoom level
    ///
    /// # Returns
    /// Reports whose position lies inside the tile's box, edges included.
    /// Fails with `NotFound` for an unknown tile.
    pub fn positions_in_tile(&self, id: TileId) -> TmbResult<Vec<AisReport>> {
        let bbox = self
            .hierarchy
            .tile_bounding_box(id)
            .ok_or_else(|| TmbError::NotFound(format!("tile {}", id)))?;
        self.reports.find_by_bounding_box(bbox)
    }

    fn positions_for_port_tile(&self, tile: TileId) -> TmbResult<PortPositions> {
        self.positions_in_tile(tile).map(PortPositions::Positions)
    }

    fn unresolved(&self, name: &str) -> PortPositions {
        debug!("Port '{}' has no zoom {} tile, returning port catalog", name, ZoomLevel::FINEST);
        PortPositions::UnresolvedPort(self.hierarchy.ports().to_vec())
    }
}
