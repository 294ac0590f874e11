//! Wires the traffic monitoring components around one shared store.
//!
//! # Architecture
//! - One `Arc<dyn DocumentStore>` injected into every component
//! - One immutable `TileCatalog` shared by the hierarchy, spatial engine and recency view
//! - Components are cheap to clone and hold no mutable state of their own

use crate::config::TmbConfig;
use crate::error::{TmbError, TmbResult};
use crate::loader;
use crate::recency::RecencyView;
use crate::reports::ReportStore;
use crate::retention::{RetentionManager, RetentionScheduler};
use crate::spatial::SpatialQueryEngine;
use crate::storage::{DocumentStore, SqliteStore, StoreStats};
use crate::tiles::{TileCatalog, TileHierarchy};
use crate::types::utc_now;
use crate::vessels::VesselDirectory;
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::sync::Arc;

// ================================================================================================
// MONITOR STRUCTURE
// ================================================================================================

/// Root object of a running backend.
///
/// # Thread Safety
/// - Every component is `Send + Sync`; share the monitor behind an `Arc`
/// - Locking, where any, happens inside the store backend
/// - Reference data is read-only after construction
pub struct TrafficMonitor {
    config: TmbConfig,
    store: Arc<dyn DocumentStore>,
    reports: ReportStore,
    retention: RetentionManager,
    vessels: VesselDirectory,
    tiles: TileHierarchy,
    spatial: SpatialQueryEngine,
    recency: RecencyView,
    /// Construction time
    created_at: DateTime<Utc>,
}

impl TrafficMonitor {
    /// Opens the SQLite store and loads reference data from the configured paths.
    ///
    /// Vessel identities are loaded only into a store that has none yet. A
    /// missing vessels file is logged and skipped; missing port or tile
    /// files fail with `NotFound`.
    pub fn open(config: TmbConfig) -> TmbResult<Self> {
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteStore::open(&config.storage)?);
        let catalog = loader::load_catalog(&config.reference)?;
        let monitor = Self::new(config, store, catalog);

        if monitor.store.stats()?.vessel_identities == 0 {
            match loader::load_vessels(&monitor.config.reference.vessels_path) {
                Ok(identities) => {
                    monitor.vessels.load(&identities)?;
                }
                Err(TmbError::NotFound(path)) => {
                    warn!("No vessel reference file at {}, directory is empty", path);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(monitor)
    }

    /// Builds the components over an existing store and catalog.
    pub fn new(config: TmbConfig, store: Arc<dyn DocumentStore>, catalog: TileCatalog) -> Self {
        let tiles = TileHierarchy::new(Arc::new(catalog), config.reference.tile_image_dir.clone());
        let reports = ReportStore::new(store.clone(), config.ingest.clone());
        let retention = RetentionManager::new(store.clone(), config.retention.window);
        let vessels = VesselDirectory::new(store.clone());
        let spatial = SpatialQueryEngine::new(tiles.clone(), reports.clone());
        let recency = RecencyView::new(store.clone(), tiles.clone());

        info!(
            "Traffic monitor ready: {} ports, {} tiles",
            tiles.ports().len(),
            tiles.catalog().tile_count()
        );

        TrafficMonitor {
            config,
            store,
            reports,
            retention,
            vessels,
            tiles,
            spatial,
            recency,
            created_at: utc_now(),
        }
    }

    // ============================================================================================
    // ACCESSORS
    // ============================================================================================

    pub fn config(&self) -> &TmbConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn reports(&self) -> &ReportStore {
        &self.reports
    }

    pub fn retention(&self) -> &RetentionManager {
        &self.retention
    }

    pub fn vessels(&self) -> &VesselDirectory {
        &self.vessels
    }

    pub fn tiles(&self) -> &TileHierarchy {
        &self.tiles
    }

    pub fn spatial(&self) -> &SpatialQueryEngine {
        &self.spatial
    }

    pub fn recency(&self) -> &RecencyView {
        &self.recency
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Prune timer using the configured retention policy.
    pub fn scheduler(&self) -> RetentionScheduler {
        RetentionScheduler::new(self.retention.clone(), &self.config.retention)
    }

    // ============================================================================================
    // STATISTICS & MONITORING
    // ============================================================================================

    pub fn stats(&self) -> TmbResult<MonitorStats> {
        Ok(MonitorStats {
            store: self.store.stats()?,
            ports: self.tiles.ports().len(),
            tiles: self.tiles.catalog().tile_count(),
            created_at: self.created_at,
        })
    }
}

// ================================================================================================
// STATISTICS STRUCTURES
// ================================================================================================

/// Monitor-level statistics
#[derive(Debug, Clone)]
pub struct MonitorStats {
    /// Report and identity counts from the store
    pub store: StoreStats,

    /// Ports in the catalog
    pub ports: usize,

    /// Tiles in the catalog
    pub tiles: usize,

    /// Monitor creation time
    pub created_at: DateTime<Utc>,
}

// ================================================================================================
// TESTS
// ================================================================================================
