//! Runtime configuration.
//!
//! Every section has a `Default`; `TmbConfig::from_env` overlays `TMB_*`
//! environment variables on top of the defaults.

use crate::error::{TmbError, TmbResult};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Order of the two numbers in a raw `Position.coordinates` array.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CoordinateOrder {
    /// `[lat, lon]`, as stored by the DMA export
    #[default]
    LatLon,
    /// `[lon, lat]`, GeoJSON order
    LonLat,
}

impl FromStr for CoordinateOrder {
    type Err = TmbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "latlon" | "lat_lon" | "lat-lon" => Ok(CoordinateOrder::LatLon),
            "lonlat" | "lon_lat" | "lon-lat" | "geojson" => Ok(CoordinateOrder::LonLat),
            other => Err(TmbError::InvalidArgument(format!(
                "unknown coordinate order '{}'",
                other
            ))),
        }
    }
}

/// Configuration for the SQLite document store.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    pub db_path: PathBuf,
    /// How long a call waits on a locked database before failing with `Timeout`
    pub busy_timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./var/data/ais.db"),
            busy_timeout: Duration::from_millis(5_000),
        }
    }
}

/// Retention policy and the optional prune timer.
#[derive(Clone, Debug)]
pub struct RetentionConfig {
    /// Reports older than `reference - window` are deleted
    pub window: Duration,
    /// Interval between scheduled prunes
    pub prune_interval: Duration,
    /// Whether the server binary runs the prune timer
    pub enabled: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(5 * 60),
            prune_interval: Duration::from_secs(60),
            enabled: true,
        }
    }
}

/// Locations of the read-only reference data.
#[derive(Clone, Debug)]
pub struct ReferenceConfig {
    pub ports_path: PathBuf,
    pub tiles_path: PathBuf,
    pub vessels_path: PathBuf,
    /// Directory holding the tile PNGs named by each tile's `filename`
    pub tile_image_dir: PathBuf,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            ports_path: PathBuf::from("./var/reference/ports.json"),
            tiles_path: PathBuf::from("./var/reference/mapviews.json"),
            vessels_path: PathBuf::from("./var/reference/vessels.json"),
            tile_image_dir: PathBuf::from("./var/reference/tiles"),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct IngestConfig {
    pub coordinate_order: CoordinateOrder,
}

/// Top-level configuration.
#[derive(Clone, Debug, Default)]
pub struct TmbConfig {
    pub storage: StorageConfig,
    pub retention: RetentionConfig,
    pub reference: ReferenceConfig,
    pub ingest: IngestConfig,
}

impl TmbConfig {
    /// Defaults overlaid with `TMB_*` environment variables.
    pub fn from_env() -> TmbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> TmbResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = TmbConfig::default();

        if let Some(path) = lookup("TMB_DB_PATH") {
            config.storage.db_path = PathBuf::from(path);
        }
        if let Some(ms) = lookup("TMB_BUSY_TIMEOUT_MS") {
            config.storage.busy_timeout = Duration::from_millis(parse_number("TMB_BUSY_TIMEOUT_MS", &ms)?);
        }
        if let Some(secs) = lookup("TMB_RETENTION_WINDOW_SECS") {
            config.retention.window =
                Duration::from_secs(parse_number("TMB_RETENTION_WINDOW_SECS", &secs)?);
        }
        if let Some(secs) = lookup("TMB_PRUNE_INTERVAL_SECS") {
            let secs = parse_number("TMB_PRUNE_INTERVAL_SECS", &secs)?;
            if secs == 0 {
                return Err(TmbError::InvalidArgument(
                    "TMB_PRUNE_INTERVAL_SECS must be greater than zero".to_string(),
                ));
            }
            config.retention.prune_interval = Duration::from_secs(secs);
        }
        if let Some(flag) = lookup("TMB_PRUNE_ENABLED") {
            config.retention.enabled = parse_flag("TMB_PRUNE_ENABLED", &flag)?;
        }
        if let Some(path) = lookup("TMB_PORTS_PATH") {
            config.reference.ports_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("TMB_TILES_PATH") {
            config.reference.tiles_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("TMB_VESSELS_PATH") {
            config.reference.vessels_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("TMB_TILE_IMAGE_DIR") {
            config.reference.tile_image_dir = PathBuf::from(dir);
        }
        if let Some(order) = lookup("TMB_COORDINATE_ORDER") {
            config.ingest.coordinate_order = order.parse()?;
        }

        Ok(config)
    }
}

fn parse_number(key: &str, raw: &str) -> TmbResult<u64> {
    raw.trim()
        .parse()
        .map_err(|_| TmbError::InvalidArgument(format!("{} must be an integer, got '{}'", key, raw)))
}

fn parse_flag(key: &str, raw: &str) -> TmbResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(TmbError::InvalidArgument(format!(
            "{} must be a boolean, got '{}'",
            key, raw
        ))),
    }
}
