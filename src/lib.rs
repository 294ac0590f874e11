//! # AIS Traffic Monitoring Backend
//!
//! Data-access core for a live vessel traffic map. AIS reports are ingested
//! into an indexed document store, kept for a sliding retention window, and
//! queried by vessel, by bounding box and by port through a three-level tile
//! hierarchy.
//!
//! Components (leaf first):
//! - [`reports::ReportStore`]: ingestion and basic report queries
//! - [`retention::RetentionManager`]: deletes reports older than the window
//! - [`vessels::VesselDirectory`]: MMSI/IMO/name identity lookups
//! - [`tiles::TileHierarchy`]: ports, tiles, child expansion and tile images
//! - [`spatial::SpatialQueryEngine`]: port and tile anchored position queries
//! - [`recency::RecencyView`]: latest position per vessel and short tracks
//!
//! [`monitor::TrafficMonitor`] wires them together around one store.

pub mod config;
pub mod error;
pub mod loader;
pub mod monitor;
pub mod recency;
pub mod report;
pub mod reports;
pub mod retention;
pub mod spatial;
pub mod storage;
pub mod tiles;
pub mod types;
pub mod vessels;

pub use config::{CoordinateOrder, TmbConfig};
pub use error::{InsertError, TmbError, TmbResult};
pub use monitor::{MonitorStats, TrafficMonitor};
pub use recency::{RecencyView, VesselPosition};
pub use report::{AisReport, MessageType};
pub use reports::ReportStore;
pub use retention::{RetentionManager, RetentionScheduler};
pub use spatial::{PortPositions, SpatialQueryEngine};
pub use storage::{DocumentStore, MemoryStore, SqliteStore};
pub use tiles::{Port, Tile, TileCatalog, TileHierarchy};
pub use types::{BoundingBox, Imo, Mmsi, PortId, Position, TileId, ZoomLevel};
pub use vessels::{VesselDirectory, VesselIdentity, VesselQuery};
