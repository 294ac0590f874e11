//! # Traffic Viewer CLI
//!
//! Command-line tool for querying the AIS report store.
//!
//! Usage:
//!   traffic_viewer latest [--limit N] [--vessel MMSI]
//!   traffic_viewer track <mmsi> [-n N]
//!   traffic_viewer near-port <name> [--country C]
//!   traffic_viewer tile <tile_id> [--latest] [--image FILE]
//!   traffic_viewer children <tile_id>
//!   traffic_viewer vessel <mmsi> [--imo IMO] [--name NAME]
//!   traffic_viewer prune [--reference TIME] [--window-secs S]
//!   traffic_viewer stats

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tmb::retention::parse_reference_time;
use tmb::types::utc_now;
use tmb::{Imo, Mmsi, PortPositions, TileId, TmbConfig, TrafficMonitor, VesselQuery};

#[derive(Parser)]
#[command(name = "traffic_viewer")]
#[command(about = "Query the AIS traffic monitoring store", long_about = None)]
struct Cli {
    /// Path to the report database (overrides TMB_DB_PATH)
    #[arg(short, long)]
    db: Option<PathBuf>,

    /// Print raw JSON instead of summaries
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the newest reports
    Latest {
        /// Maximum number of reports to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Only reports from this MMSI
        #[arg(long)]
        vessel: Option<u32>,
    },

    /// Show a vessel's recent positions
    Track {
        mmsi: u32,

        /// Number of positions
        #[arg(short, default_value_t = 5)]
        n: usize,
    },

    /// Show positions near a port
    NearPort {
        name: String,

        #[arg(long)]
        country: Option<String>,
    },

    /// Show positions inside a tile
    Tile {
        tile_id: u32,

        /// One newest position per vessel
        #[arg(long)]
        latest: bool,

        /// Write the tile image to this file
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// List the finer tiles of a tile
    Children { tile_id: u32 },

    /// Look up vessel identities
    Vessel {
        mmsi: u32,

        #[arg(long)]
        imo: Option<u32>,

        #[arg(long)]
        name: Option<String>,
    },

    /// Delete reports older than the retention window
    Prune {
        /// Reference time, `YYYY-MM-DD HH:MM:SS[.ffffff]` or RFC 3339 (default: now)
        #[arg(long)]
        reference: Option<String>,

        /// Window in seconds (default: configured window)
        #[arg(long)]
        window_secs: Option<u64>,
    },

    /// Show store and catalog statistics
    Stats,
}

fn main() -> Result<(), String> {
    let cli = Cli::parse();

    let mut config = TmbConfig::from_env().map_err(|e| e.to_string())?;
    if let Some(db) = cli.db {
        config.storage.db_path = db;
    }
    let monitor = TrafficMonitor::open(config).map_err(|e| e.to_string())?;

    match cli.command {
        Commands::Latest { limit, vessel } => {
            let vessel = vessel.map(Mmsi::new).transpose().map_err(|e| e.to_string())?;
            let reports = monitor
                .reports()
                .find_latest(vessel, Some(limit))
                .map_err(|e| e.to_string())?;

            if cli.json {
                return print_json(&reports);
            }
            println!("📋 {} newest reports:\n", reports.len());
            for report in &reports {
                let position = report
                    .position()
                    .map(|p| format!("{:.5}, {:.5}", p.lat, p.lon))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{} | {} | {:<15} | {}",
                    report.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                    report.vessel_id,
                    report.message_type().as_str(),
                    position
                );
            }
        }

        Commands::Track { mmsi, n } => {
            let mmsi = Mmsi::new(mmsi).map_err(|e| e.to_string())?;
            let track = monitor
                .recency()
                .last_n_positions(mmsi, n)
                .map_err(|e| e.to_string())?;

            if cli.json {
                return print_json(&track);
            }
            println!("🚢 Last {} positions of {}:\n", track.len(), mmsi);
            for (i, p) in track.iter().enumerate() {
                println!("{}. {:.5}, {:.5}", i + 1, p.lat, p.lon);
            }
        }

        Commands::NearPort { name, country } => {
            let result = monitor
                .spatial()
                .positions_near_port(&name, country.as_deref())
                .map_err(|e| e.to_string())?;

            if cli.json {
                return print_json(&result);
            }
            match result {
                PortPositions::Positions(reports) => {
                    println!("⚓ {} positions near {}:\n", reports.len(), name);
                    for report in &reports {
                        if let Some(p) = report.position() {
                            println!("{} | {:.5}, {:.5}", report.vessel_id, p.lat, p.lon);
                        }
                    }
                }
                PortPositions::UnresolvedPort(ports) => {
                    println!("❌ '{}' has no zoom 3 tile. Known ports:\n", name);
                    for port in &ports {
                        println!("{:>6} | {} ({})", port.id, port.name, port.country);
                    }
                }
            }
        }

        Commands::Tile {
            tile_id,
            latest,
            image,
        } => {
            let id = TileId(tile_id);
            if let Some(out) = image {
                match monitor.tiles().tile_image(id).map_err(|e| e.to_string())? {
                    Some(bytes) => {
                        std::fs::write(&out, &bytes).map_err(|e| e.to_string())?;
                        println!("🖼  Wrote {} bytes to {}", bytes.len(), out.display());
                    }
                    None => println!("❌ No image for tile {}", id),
                }
            }

            if latest {
                let rows = monitor
                    .recency()
                    .latest_positions_in_tile(id)
                    .map_err(|e| e.to_string())?;
                if cli.json {
                    return print_json(&rows);
                }
                println!("📍 {} vessels in tile {}:\n", rows.len(), id);
                for row in &rows {
                    println!(
                        "{} | {} | {:.5}, {:.5}",
                        row.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        row.vessel_id,
                        row.position.lat,
                        row.position.lon
                    );
                }
            } else {
                let reports = monitor
                    .spatial()
                    .positions_in_tile(id)
                    .map_err(|e| e.to_string())?;
                if cli.json {
                    return print_json(&reports);
                }
                println!("📍 {} positions in tile {}", reports.len(), id);
            }
        }

        Commands::Children { tile_id } => {
            let children = monitor.tiles().child_tiles(TileId(tile_id));
            if cli.json {
                return print_json(&children);
            }
            println!("🗺  {} child tiles of {}:\n", children.len(), tile_id);
            for tile in &children {
                println!(
                    "{:>6} | zoom {} | W {:.4} S {:.4} E {:.4} N {:.4}",
                    tile.id, tile.zoom, tile.bbox.west, tile.bbox.south, tile.bbox.east, tile.bbox.north
                );
            }
        }

        Commands::Vessel { mmsi, imo, name } => {
            let mut query = VesselQuery::new(Mmsi::new(mmsi).map_err(|e| e.to_string())?);
            if let Some(imo) = imo {
                query = query.with_imo(Imo(imo));
            }
            if let Some(name) = name {
                query = query.with_name(name);
            }
            let found = monitor.vessels().lookup(&query).map_err(|e| e.to_string())?;
            print_json(&found)?;
        }

        Commands::Prune {
            reference,
            window_secs,
        } => {
            let reference = match reference {
                Some(raw) => parse_reference_time(&raw).map_err(|e| e.to_string())?,
                None => utc_now(),
            };
            let window = window_secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| monitor.retention().window());
            let deleted = monitor
                .retention()
                .prune_older_than(reference, window)
                .map_err(|e| e.to_string())?;
            println!("🧹 Deleted {} reports older than {}s before {}", deleted, window.as_secs(), reference);
        }

        Commands::Stats => {
            let stats = monitor.stats().map_err(|e| e.to_string())?;

            println!("📊 Traffic Store Statistics\n");
            println!("Reports:            {}", stats.store.reports);
            println!("  Position:         {}", stats.store.position_reports);
            println!("  Static:           {}", stats.store.static_reports);
            println!("Distinct vessels:   {}", stats.store.distinct_vessels);
            println!("Vessel identities:  {}", stats.store.vessel_identities);
            if let (Some(oldest), Some(newest)) = (stats.store.oldest, stats.store.newest) {
                println!("Span:               {} → {}", oldest, newest);
            }
            println!("Ports:              {}", stats.ports);
            println!("Tiles:              {}", stats.tiles);
        }
    }

    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", text);
    Ok(())
}
