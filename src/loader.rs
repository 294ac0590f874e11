//! Reference-data and ingest file loading.
//!
//! Every file is a single JSON array of records, matching the exports of
//! the `ports`, `mapviews`, `vessels` and report collections.

use crate::config::ReferenceConfig;
use crate::error::{TmbError, TmbResult};
use crate::tiles::{Port, Tile, TileCatalog};
use crate::vessels::VesselIdentity;
use log::info;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

/// Reads a JSON array of `T` from `path`.
pub fn read_json_array<T: DeserializeOwned>(path: &Path) -> TmbResult<Vec<T>> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => TmbError::NotFound(format!("{}", path.display())),
        _ => TmbError::StoreUnavailable(format!("failed to open {}: {}", path.display(), e)),
    })?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| TmbError::MalformedInput(format!("{}: {}", path.display(), e)))
}

pub fn load_ports(path: &Path) -> TmbResult<Vec<Port>> {
    let ports: Vec<Port> = read_json_array(path)?;
    info!("Read {} ports from {}", ports.len(), path.display());
    Ok(ports)
}

pub fn load_tiles(path: &Path) -> TmbResult<Vec<Tile>> {
    let tiles: Vec<Tile> = read_json_array(path)?;
    info!("Read {} tiles from {}", tiles.len(), path.display());
    Ok(tiles)
}

pub fn load_vessels(path: &Path) -> TmbResult<Vec<VesselIdentity>> {
    let vessels: Vec<VesselIdentity> = read_json_array(path)?;
    info!("Read {} vessel identities from {}", vessels.len(), path.display());
    Ok(vessels)
}

/// Raw report records, left unparsed for `ReportStore::insert_batch`/`insert_one`.
pub fn read_reports_file(path: &Path) -> TmbResult<Vec<Value>> {
    read_json_array(path)
}

/// Loads ports and tiles and builds the validated catalog.
pub fn load_catalog(config: &ReferenceConfig) -> TmbResult<TileCatalog> {
    let ports = load_ports(&config.ports_path)?;
    let tiles = load_tiles(&config.tiles_path)?;
    TileCatalog::new(ports, tiles)
}
