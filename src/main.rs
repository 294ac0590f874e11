//! # Traffic Monitoring Backend Entry Point
//!
//! Opens the report store, loads reference data, ingests any report files
//! given on the command line and then keeps the store pruned to the
//! retention window until interrupted.

use std::path::PathBuf;
use std::sync::Arc;
use tmb::{loader, TmbConfig, TrafficMonitor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=================================================");
    println!("  AIS Traffic Monitoring Backend  ");
    println!("=================================================");
    println!();

    let config = TmbConfig::from_env()?;

    println!("Opening report store at {}...", config.storage.db_path.display());
    let monitor = match TrafficMonitor::open(config) {
        Ok(monitor) => Arc::new(monitor),
        Err(e) => {
            eprintln!("✗ Failed to initialize traffic monitor: {}", e);
            return Err(e.into());
        }
    };
    let stats = monitor.stats()?;
    println!("✓ Traffic monitor initialized");
    println!("  - Ports: {}", stats.ports);
    println!("  - Tiles: {}", stats.tiles);
    println!("  - Vessel identities: {}", stats.store.vessel_identities);
    println!("  - Stored reports: {}", stats.store.reports);
    println!();

    // Each argument is a JSON array of raw reports
    for path in std::env::args().skip(1).map(PathBuf::from) {
        println!("Ingesting {}...", path.display());
        let records = loader::read_reports_file(&path)?;
        let mut accepted = 0usize;
        let mut rejected = 0usize;
        for record in &records {
            match monitor.reports().insert_one(record) {
                Ok(()) => accepted += 1,
                Err(_) => rejected += 1,
            }
        }
        println!("  - Accepted: {}", accepted);
        println!("  - Rejected: {}", rejected);
    }
    println!();

    let retention = &monitor.config().retention;
    println!("Retention:");
    println!("  - Window: {}s", retention.window.as_secs());
    println!("  - Prune interval: {}s", retention.prune_interval.as_secs());
    println!("  - Enabled: {}", retention.enabled);
    println!();

    let scheduler = Arc::new(monitor.scheduler());
    let prune_task = tokio::spawn(scheduler.start());

    println!("Running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    prune_task.abort();

    println!("=================================================");
    println!("  Traffic Monitor Shut Down");
    println!("=================================================");

    Ok(())
}
