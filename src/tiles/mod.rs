//! Three-level tile hierarchy anchored at ports.
//!
//! - `catalog`: validated port and tile reference data
//! - `hierarchy`: lookups over the catalog

pub mod catalog;
pub mod hierarchy;

pub use catalog::{Port, Tile, TileCatalog};
pub use hierarchy::TileHierarchy;
