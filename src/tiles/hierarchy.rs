//! Read-only queries over the tile catalog: port resolution, child
//! expansion, bounding boxes and raster assets.

use super::catalog::{Port, Tile, TileCatalog};
use crate::error::{TmbError, TmbResult};
use crate::types::{BoundingBox, PortId, TileId, ZoomLevel};
use log::debug;
use serde_json::Value;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct TileHierarchy {
    catalog: Arc<TileCatalog>,
    image_dir: PathBuf,
}

impl TileHierarchy {
    pub fn new(catalog: Arc<TileCatalog>, image_dir: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            image_dir: image_dir.into(),
        }
    }

    pub fn catalog(&self) -> &Arc<TileCatalog> {
        &self.catalog
    }

    // ============================================================================================
    // PORTS
    // ============================================================================================

    pub fn ports(&self) -> &[Port] {
        self.catalog.ports()
    }

    pub fn port(&self, id: &PortId) -> Option<&Port> {
        self.catalog.port(id)
    }

    /// First port (in catalog order) with this name, and country when given.
    pub fn find_port(&self, name: &str, country: Option<&str>) -> Option<&Port> {
        self.ports().iter().find(|p| p.matches(name, country))
    }

    /// Every port with this name, and country when given.
    pub fn find_ports(&self, name: &str, country: Option<&str>) -> Vec<&Port> {
        self.ports()
            .iter()
            .filter(|p| p.matches(name, country))
            .collect()
    }

    /// Tile reference of the named port at `zoom`.
    ///
    /// `None` when the port is unknown or has no tile at that level.
    pub fn resolve_port_to_tile(
        &self,
        name: &str,
        country: Option<&str>,
        zoom: ZoomLevel,
    ) -> Option<TileId> {
        let port = self.find_port(name, country)?;
        let tile = port.tile_ref(zoom);
        if tile.is_none() {
            debug!("Port {} ({}) has no zoom {} tile", port.name, port.country, zoom);
        }
        tile
    }

    // ============================================================================================
    // TILES
    // ============================================================================================

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.catalog.tile(id)
    }

    /// Tiles whose parent is `id`, ascending by id. Empty for a leaf or unknown tile.
    pub fn child_tiles(&self, id: TileId) -> Vec<Tile> {
        self.catalog
            .child_ids(id)
            .iter()
            .filter_map(|child| self.catalog.tile(*child))
            .cloned()
            .collect()
    }

    /// `child_tiles` for an untyped id; anything but a non-negative integer is rejected.
    pub fn child_tiles_arg(&self, id: &Value) -> TmbResult<Vec<Tile>> {
        let id = TileId::from_value(id)?;
        Ok(self.child_tiles(id))
    }

    pub fn tile_bounding_box(&self, id: TileId) -> Option<BoundingBox> {
        self.catalog.tile(id).map(|t| t.bbox)
    }

    /// Raster bytes of a tile.
    ///
    /// `Ok(None)` when the tile is unknown or its file does not exist. Image
    /// references must be relative paths that stay inside the image directory.
    pub fn tile_image(&self, id: TileId) -> TmbResult<Option<Vec<u8>>> {
        let Some(tile) = self.catalog.tile(id) else {
            return Ok(None);
        };

        let rel = Path::new(&tile.image_ref);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if tile.image_ref.is_empty() || escapes {
            return Err(TmbError::MalformedInput(format!(
                "tile {} has unusable image reference {:?}",
                id, tile.image_ref
            )));
        }

        let path = self.image_dir.join(rel);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Tile {} image {} not found", id, path.display());
                Ok(None)
            }
            Err(e) => Err(TmbError::StoreUnavailable(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn hierarchy(image_dir: &Path) -> TileHierarchy {
        let tiles: Vec<Tile> = serde_json::from_value(json!([
            {"id": 1, "scale": 1, "west": 7.0, "south": 54.0, "east": 13.0, "north": 58.0, "filename": "1.png"},
            {"id": 5331, "scale": 2, "west": 9.0, "south": 54.5, "east": 10.0, "north": 55.5,
             "contained_by": 1, "filename": "5331.png"},
            {"id": 5332, "scale": 2, "west": 10.0, "south": 54.5, "east": 11.0, "north": 55.5,
             "contained_by": 1, "filename": "5332.png"},
            {"id": 53312, "scale": 3, "west": 9.25, "south": 54.9, "east": 9.5, "north": 55.1,
             "contained_by": 5331, "filename": "../53312.png"}
        ]))
        .unwrap();
        let ports: Vec<Port> = serde_json::from_value(json!([
            {"id": "1221", "port_location": "Aabenraa", "country": "Denmark",
             "latitude": 55.0333, "longitude": 9.4333, "mapview_1": 1, "mapview_2": 5331, "mapview_3": 53312},
            {"id": "4242", "port_location": "Hobro", "country": "Denmark",
             "latitude": 56.64, "longitude": 9.79, "mapview_1": 1, "mapview_2": null, "mapview_3": null}
        ]))
        .unwrap();
        let catalog = TileCatalog::new(ports, tiles).unwrap();
        TileHierarchy::new(Arc::new(catalog), image_dir)
    }

    #[test]
    fn test_resolve_port_to_tile() {
        let dir = TempDir::new().unwrap();
        let h = hierarchy(dir.path());

        assert_eq!(
            h.resolve_port_to_tile("Aabenraa", Some("Denmark"), ZoomLevel::Three),
            Some(TileId(53312))
        );
        assert_eq!(
            h.resolve_port_to_tile("Aabenraa", None, ZoomLevel::Two),
            Some(TileId(5331))
        );
        assert_eq!(h.resolve_port_to_tile("Hobro", Some("Denmark"), ZoomLevel::Three), None);
        assert_eq!(h.resolve_port_to_tile("Aabenraa", Some("Sweden"), ZoomLevel::One), None);
    }

    #[test]
    fn test_child_tiles() {
        let dir = TempDir::new().unwrap();
        let h = hierarchy(dir.path());

        let ids: Vec<TileId> = h.child_tiles(TileId(1)).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![TileId(5331), TileId(5332)]);
        assert!(h.child_tiles(TileId(53312)).is_empty());
        assert!(h.child_tiles(TileId(999)).is_empty());

        assert_eq!(h.child_tiles_arg(&json!(5331)).unwrap().len(), 1);
        assert!(matches!(
            h.child_tiles_arg(&json!("5331")),
            Err(TmbError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_tile_bounding_box() {
        let dir = TempDir::new().unwrap();
        let h = hierarchy(dir.path());

        let bbox = h.tile_bounding_box(TileId(5332)).unwrap();
        assert_eq!((bbox.west, bbox.east), (10.0, 11.0));
        assert!(h.tile_bounding_box(TileId(7)).is_none());
    }

    #[test]
    fn test_tile_image() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("5331.png"), b"\x89PNG").unwrap();
        let h = hierarchy(dir.path());

        assert_eq!(h.tile_image(TileId(5331)).unwrap(), Some(b"\x89PNG".to_vec()));
        assert_eq!(h.tile_image(TileId(5332)).unwrap(), None);
        assert_eq!(h.tile_image(TileId(404)).unwrap(), None);
        assert!(matches!(
            h.tile_image(TileId(53312)),
            Err(TmbError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_tile_image_unreadable_path_is_store_unavailable() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("5332.png")).unwrap();
        let h = hierarchy(dir.path());

        assert!(matches!(
            h.tile_image(TileId(5332)),
            Err(TmbError::StoreUnavailable(_))
        ));
    }

    #[test]
    fn test_find_ports() {
        let dir = TempDir::new().unwrap();
        let h = hierarchy(dir.path());

        assert_eq!(h.find_ports("Hobro", None).len(), 1);
        assert!(h.find_ports("Hobro", Some("Norway")).is_empty());
        assert_eq!(h.port(&PortId::from("1221")).unwrap().name, "Aabenraa");
    }
}
