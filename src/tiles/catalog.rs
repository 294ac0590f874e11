//! Port and tile reference data.
//!
//! The catalog is built once from loaded records and never mutated, so it is
//! shared between components behind an `Arc` without locking.

use crate::error::{TmbError, TmbResult};
use crate::types::{BoundingBox, PortId, TileId, ZoomLevel};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

// ================================================================================================
// PORT
// ================================================================================================

/// A port with up to one tile reference per zoom level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "PortRecord", into = "PortRecord")]
pub struct Port {
    pub id: PortId,
    pub name: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Indexed by `ZoomLevel::index()`
    pub tile_refs: [Option<TileId>; 3],
    /// Source fields not interpreted here (UN/LOCODE, website, ...)
    pub metadata: Map<String, Value>,
}

impl Port {
    #[inline]
    pub fn tile_ref(&self, zoom: ZoomLevel) -> Option<TileId> {
        self.tile_refs[zoom.index()]
    }

    pub fn matches(&self, name: &str, country: Option<&str>) -> bool {
        self.name == name && country.map_or(true, |c| self.country == c)
    }
}

/// Port shape in the reference files.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct PortRecord {
    id: PortId,
    port_location: String,
    country: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    mapview_1: Option<TileId>,
    #[serde(default)]
    mapview_2: Option<TileId>,
    #[serde(default)]
    mapview_3: Option<TileId>,
    #[serde(flatten)]
    metadata: Map<String, Value>,
}

impl From<PortRecord> for Port {
    fn from(r: PortRecord) -> Self {
        Port {
            id: r.id,
            name: r.port_location,
            country: r.country,
            latitude: r.latitude,
            longitude: r.longitude,
            tile_refs: [r.mapview_1, r.mapview_2, r.mapview_3],
            metadata: r.metadata,
        }
    }
}

impl From<Port> for PortRecord {
    fn from(p: Port) -> Self {
        let [mapview_1, mapview_2, mapview_3] = p.tile_refs;
        PortRecord {
            id: p.id,
            port_location: p.name,
            country: p.country,
            latitude: p.latitude,
            longitude: p.longitude,
            mapview_1,
            mapview_2,
            mapview_3,
            metadata: p.metadata,
        }
    }
}

// ================================================================================================
// TILE
// ================================================================================================

/// A map tile at one zoom level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TileRecord", into = "TileRecord")]
pub struct Tile {
    pub id: TileId,
    pub zoom: ZoomLevel,
    pub bbox: BoundingBox,
    /// Next coarser tile containing this one
    pub parent: Option<TileId>,
    /// Raster asset file name, relative to the tile image directory
    pub image_ref: String,
}

/// Tile shape in the reference files.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct TileRecord {
    id: TileId,
    #[serde(alias = "zoom")]
    scale: ZoomLevel,
    west: f64,
    south: f64,
    east: f64,
    north: f64,
    #[serde(default)]
    contained_by: Option<TileId>,
    filename: String,
}

impl TryFrom<TileRecord> for Tile {
    type Error = TmbError;

    fn try_from(r: TileRecord) -> Result<Self, Self::Error> {
        let bbox = BoundingBox::new(r.west, r.south, r.east, r.north)
            .map_err(|e| TmbError::MalformedInput(format!("tile {}: {}", r.id, e)))?;
        Ok(Tile {
            id: r.id,
            zoom: r.scale,
            bbox,
            parent: r.contained_by,
            image_ref: r.filename,
        })
    }
}

impl From<Tile> for TileRecord {
    fn from(t: Tile) -> Self {
        TileRecord {
            id: t.id,
            scale: t.zoom,
            west: t.bbox.west,
            south: t.bbox.south,
            east: t.bbox.east,
            north: t.bbox.north,
            contained_by: t.parent,
            filename: t.image_ref,
        }
    }
}

// ================================================================================================
// CATALOG
// ================================================================================================

/// Validated, immutable set of ports and tiles.
#[derive(Debug, Default)]
pub struct TileCatalog {
    ports: Vec<Port>,
    port_index: HashMap<PortId, usize>,
    tiles: HashMap<TileId, Tile>,
    /// Parent id → child ids, sorted ascending
    children: HashMap<TileId, Vec<TileId>>,
}

impl TileCatalog {
    /// Builds the catalog, checking the tile tree.
    ///
    /// Fails with `MalformedInput` when a tile id repeats, a parent is
    /// missing, a parent is not exactly one level coarser, or a child's box
    /// escapes its parent's box. Port references to unknown tiles, or to a
    /// tile at another zoom level, are dropped with a warning.
    pub fn new(mut ports: Vec<Port>, tiles: Vec<Tile>) -> TmbResult<Self> {
        let mut by_id: HashMap<TileId, Tile> = HashMap::with_capacity(tiles.len());
        for tile in tiles {
            if by_id.contains_key(&tile.id) {
                return Err(TmbError::MalformedInput(format!("duplicate tile id {}", tile.id)));
            }
            by_id.insert(tile.id, tile);
        }

        let mut children: HashMap<TileId, Vec<TileId>> = HashMap::new();
        for tile in by_id.values() {
            let Some(parent_id) = tile.parent else {
                continue;
            };
            let parent = by_id.get(&parent_id).ok_or_else(|| {
                TmbError::MalformedInput(format!(
                    "tile {} references missing parent {}",
                    tile.id, parent_id
                ))
            })?;
            if parent.zoom.finer() != Some(tile.zoom) {
                return Err(TmbError::MalformedInput(format!(
                    "tile {} at zoom {} cannot have parent {} at zoom {}",
                    tile.id, tile.zoom, parent.id, parent.zoom
                )));
            }
            if !parent.bbox.contains_box(&tile.bbox) {
                return Err(TmbError::MalformedInput(format!(
                    "tile {} extends outside its parent {}",
                    tile.id, parent.id
                )));
            }
            children.entry(parent_id).or_default().push(tile.id);
        }
        for ids in children.values_mut() {
            ids.sort();
        }

        let mut port_index = HashMap::with_capacity(ports.len());
        for (idx, port) in ports.iter_mut().enumerate() {
            for zoom in ZoomLevel::all() {
                let Some(tile_id) = port.tile_ref(zoom) else {
                    continue;
                };
                let valid = by_id.get(&tile_id).map_or(false, |t| t.zoom == zoom);
                if !valid {
                    warn!(
                        "Port {} ({}) references unusable zoom {} tile {}; ignoring",
                        port.id, port.name, zoom, tile_id
                    );
                    port.tile_refs[zoom.index()] = None;
                }
            }
            port_index.entry(port.id.clone()).or_insert(idx);
        }

        Ok(Self {
            ports,
            port_index,
            tiles: by_id,
            children,
        })
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn port(&self, id: &PortId) -> Option<&Port> {
        self.port_index.get(id).map(|&idx| &self.ports[idx])
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(&id)
    }

    pub fn child_ids(&self, id: TileId) -> &[TileId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }
}
