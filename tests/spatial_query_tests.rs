//! Integration tests for the tile hierarchy, spatial queries and recency views.
//!
//! Tests verify:
//! - Port resolution to tiles and the catalog fallback
//! - Tile-bounded position queries over a SQLite store
//! - Latest-per-vessel and last-N projections
//! - Tile image loading from the image directory

use chrono::Duration as ChronoDuration;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tmb::config::{ReferenceConfig, TmbConfig};
use tmb::types::from_millis;
use tmb::{
    AisReport, DocumentStore, Mmsi, Port, PortId, PortPositions, Position, SqliteStore, Tile,
    TileCatalog, TileId, TmbError, TrafficMonitor, ZoomLevel,
};

/// Jutland east coast: one coarse tile, two medium tiles, two fine tiles.
fn catalog() -> TileCatalog {
    let tiles: Vec<Tile> = serde_json::from_value(json!([
        {"id": 1, "scale": 1, "west": 7.0, "south": 54.5, "east": 13.0, "north": 57.8, "filename": "1.png"},
        {"id": 5331, "scale": 2, "west": 9.0, "south": 54.5, "east": 11.0, "north": 56.0,
         "contained_by": 1, "filename": "38F7.png"},
        {"id": 5332, "scale": 2, "west": 9.0, "south": 56.0, "east": 11.0, "north": 57.8,
         "contained_by": 1, "filename": "38F8.png"},
        {"id": 53311, "scale": 3, "west": 9.0, "south": 54.5, "east": 10.0, "north": 55.25,
         "contained_by": 5331, "filename": "38F7A.png"},
        {"id": 53312, "scale": 3, "west": 9.0, "south": 55.25, "east": 10.0, "north": 56.0,
         "contained_by": 5331, "filename": "38F7B.png"}
    ]))
    .unwrap();
    let ports: Vec<Port> = serde_json::from_value(json!([
        {"id": "1221", "un/locode": "DKAAB", "port_location": "Aabenraa", "country": "Denmark",
         "website": "www.aabenraaport.dk", "latitude": 55.0333, "longitude": 9.4333,
         "mapview_1": 1, "mapview_2": 5331, "mapview_3": 53311},
        {"id": "4711", "un/locode": "DKVEJ", "port_location": "Vejle", "country": "Denmark",
         "latitude": 55.7, "longitude": 9.55, "mapview_1": 1, "mapview_2": 5331, "mapview_3": 53312},
        {"id": "8080", "un/locode": "DKHBO", "port_location": "Hobro", "country": "Denmark",
         "latitude": 56.6333, "longitude": 9.8, "mapview_1": 1, "mapview_2": 5332, "mapview_3": null}
    ]))
    .unwrap();
    TileCatalog::new(ports, tiles).unwrap()
}

fn at(mmsi: u32, secs: i64, lat: f64, lon: f64) -> AisReport {
    AisReport::position_report(
        Mmsi::new(mmsi).unwrap(),
        from_millis(1_700_000_000_000) + ChronoDuration::seconds(secs),
        Position::new(lat, lon).unwrap(),
    )
}

fn monitor(dir: &Path) -> TrafficMonitor {
    let store: Arc<dyn DocumentStore> =
        Arc::new(SqliteStore::open_path(dir.join("ais.db"), std::time::Duration::from_secs(5)).unwrap());
    store
        .insert_reports(&[
            at(219000001, 0, 55.05, 9.42),
            at(219000001, 60, 55.06, 9.43),
            at(219000002, 30, 55.70, 9.56),
            at(219000003, 45, 56.60, 9.90),
            at(219000004, 50, 57.00, 12.50),
        ])
        .unwrap();

    let config = TmbConfig {
        reference: ReferenceConfig {
            tile_image_dir: dir.join("tiles"),
            ..ReferenceConfig::default()
        },
        ..TmbConfig::default()
    };
    TrafficMonitor::new(config, store, catalog())
}

// ============================================================================
// TILE HIERARCHY
// ============================================================================

#[test]
fn test_resolve_port_to_tile_per_zoom() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let monitor = monitor(tmp_dir.path());
    let tiles = monitor.tiles();

    assert_eq!(tiles.resolve_port_to_tile("Vejle", Some("Denmark"), ZoomLevel::One), Some(TileId(1)));
    assert_eq!(tiles.resolve_port_to_tile("Vejle", None, ZoomLevel::Two), Some(TileId(5331)));
    assert_eq!(tiles.resolve_port_to_tile("Vejle", None, ZoomLevel::Three), Some(TileId(53312)));
    assert_eq!(tiles.resolve_port_to_tile("Hobro", Some("Denmark"), ZoomLevel::Three), None);
    assert_eq!(tiles.resolve_port_to_tile("Nowhere", None, ZoomLevel::One), None);
}

#[test]
fn test_child_tiles_expand_one_level() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let monitor = monitor(tmp_dir.path());

    let medium: Vec<TileId> = monitor.tiles().child_tiles(TileId(1)).iter().map(|t| t.id).collect();
    assert_eq!(medium, vec![TileId(5331), TileId(5332)]);

    let fine = monitor.tiles().child_tiles_arg(&json!(5331)).unwrap();
    assert_eq!(fine.len(), 2);
    assert!(fine.iter().all(|t| t.zoom == ZoomLevel::Three));

    assert!(matches!(
        monitor.tiles().child_tiles_arg(&json!({"id": 5331})),
        Err(TmbError::InvalidArgument(_))
    ));
}

#[test]
fn test_tile_image_from_directory() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let image_dir = tmp_dir.path().join("tiles");
    std::fs::create_dir_all(&image_dir).unwrap();
    std::fs::write(image_dir.join("38F7.png"), [0x89, b'P', b'N', b'G']).unwrap();
    let monitor = monitor(tmp_dir.path());

    let bytes = monitor.tiles().tile_image(TileId(5331)).unwrap().unwrap();
    assert_eq!(bytes, vec![0x89, b'P', b'N', b'G']);
    assert!(monitor.tiles().tile_image(TileId(5332)).unwrap().is_none());
}

// ============================================================================
// SPATIAL QUERIES
// ============================================================================

#[test]
fn test_positions_near_port_uses_fine_tile() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let monitor = monitor(tmp_dir.path());

    let result = monitor.spatial().positions_near_port("Aabenraa", Some("Denmark")).unwrap();
    let positions = result.positions().expect("Aabenraa has a zoom 3 tile");
    assert_eq!(positions.len(), 2);
    assert!(positions.iter().all(|r| r.vessel_id.get() == 219000001));
    assert!(positions[0].timestamp > positions[1].timestamp);
}

#[test]
fn test_hobro_falls_back_to_port_catalog() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let monitor = monitor(tmp_dir.path());

    assert!(monitor
        .tiles()
        .resolve_port_to_tile("Hobro", Some("Denmark"), ZoomLevel::Three)
        .is_none());
    match monitor.spatial().positions_near_port("Hobro", Some("Denmark")).unwrap() {
        PortPositions::UnresolvedPort(ports) => {
            assert_eq!(ports.len(), 3);
            assert!(ports.iter().any(|p| p.name == "Hobro"));
        }
        PortPositions::Positions(reports) => panic!("expected port catalog, got {} reports", reports.len()),
    }
}

#[test]
fn test_positions_near_port_by_id() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let monitor = monitor(tmp_dir.path());
    let spatial = monitor.spatial();

    let vejle = spatial.positions_near_port_by_id(&PortId::from("4711")).unwrap();
    assert_eq!(vejle.positions().map(|p| p.len()), Some(1));
    assert!(spatial.positions_near_port_by_id(&PortId::from("8080")).unwrap().is_unresolved());
    assert!(matches!(
        spatial.positions_near_port_by_id(&PortId::from("9999")),
        Err(TmbError::NotFound(_))
    ));
}

#[test]
fn test_positions_in_tile() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let monitor = monitor(tmp_dir.path());

    assert_eq!(monitor.spatial().positions_in_tile(TileId(1)).unwrap().len(), 5);
    assert_eq!(monitor.spatial().positions_in_tile(TileId(5332)).unwrap().len(), 1);
    assert!(matches!(
        monitor.spatial().positions_in_tile(TileId(42)),
        Err(TmbError::NotFound(_))
    ));
}

// ============================================================================
// RECENCY VIEW
// ============================================================================

#[test]
fn test_last_n_positions_returns_five_newest() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let monitor = monitor(tmp_dir.path());
    let track: Vec<AisReport> = (0..9).map(|i| at(232323237, 100 + i * 10, 55.0 + i as f64 * 0.001, 9.5)).collect();
    monitor.reports().insert_reports(&track).unwrap();

    let positions = monitor
        .recency()
        .last_n_positions(Mmsi::new(232323237).unwrap(), 5)
        .unwrap();
    assert_eq!(positions.len(), 5);
    let lats: Vec<f64> = positions.iter().map(|p| p.lat).collect();
    let mut sorted = lats.clone();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
    assert_eq!(lats, sorted);
    assert!((lats[0] - 55.008).abs() < 1e-9);
}

#[test]
fn test_latest_position_per_vessel() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let monitor = monitor(tmp_dir.path());

    let rows = monitor.recency().latest_position_per_vessel().unwrap();
    let ids: Vec<u32> = rows.iter().map(|r| r.vessel_id.get()).collect();
    assert_eq!(ids, vec![219000001, 219000004, 219000003, 219000002]);
    assert_eq!(rows[0].position.lat, 55.06);

    let latest = monitor
        .recency()
        .latest_position(Mmsi::new(219000002).unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(latest.position.lon, 9.56);
}

#[test]
fn test_latest_positions_in_tile() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let monitor = monitor(tmp_dir.path());

    let rows = monitor.recency().latest_positions_in_tile(TileId(5331)).unwrap();
    let ids: Vec<u32> = rows.iter().map(|r| r.vessel_id.get()).collect();
    assert_eq!(ids, vec![219000001, 219000002]);
}
