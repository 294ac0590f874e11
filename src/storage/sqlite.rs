//! SQLite document store.
//!
//! Each report is kept as its canonical JSON document alongside the columns
//! queries filter and sort on:
//!
//! ```text
//! reports(id, mmsi, timestamp_ms, message_type, lat, lon, report_json)
//!   idx_reports_mmsi_ts  (mmsi, timestamp_ms)
//!   idx_reports_ts       (timestamp_ms)
//!   idx_reports_lat      (lat)
//!   idx_reports_lon      (lon)
//!
//! vessels(id, mmsi, imo, name)
//!   idx_vessels_mmsi     (mmsi)
//! ```
//!
//! `lat`/`lon` are NULL for static data reports. `id` is the insertion order
//! and breaks timestamp ties.

use log::info;
use parking_lot::Mutex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{DocumentStore, ReportFilter, StoreStats, VesselFilter};
use crate::config::StorageConfig;
use crate::error::{TmbError, TmbResult};
use crate::report::AisReport;
use crate::types::{from_millis, Imo, Mmsi};
use crate::vessels::VesselIdentity;
use chrono::{DateTime, Utc};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS reports (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        mmsi INTEGER NOT NULL,
        timestamp_ms INTEGER NOT NULL,
        message_type TEXT NOT NULL,
        lat REAL,
        lon REAL,
        report_json TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_reports_mmsi_ts ON reports (mmsi, timestamp_ms);
    CREATE INDEX IF NOT EXISTS idx_reports_ts ON reports (timestamp_ms);
    CREATE INDEX IF NOT EXISTS idx_reports_lat ON reports (lat);
    CREATE INDEX IF NOT EXISTS idx_reports_lon ON reports (lon);

    CREATE TABLE IF NOT EXISTS vessels (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        mmsi INTEGER NOT NULL,
        imo INTEGER,
        name TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_vessels_mmsi ON vessels (mmsi);
";

/// SQLite-backed [`DocumentStore`].
pub struct SqliteStore {
    /// Database location, `None` for in-memory databases
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").field("path", &self.path).finish()
    }
}

impl SqliteStore {
    /// Open or create the database described by `config`.
    pub fn open(config: &StorageConfig) -> TmbResult<Self> {
        Self::open_path(&config.db_path, config.busy_timeout)
    }

    pub fn open_path<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> TmbResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                TmbError::StoreUnavailable(format!("Failed to create store directory: {}", e))
            })?;
        }

        let conn = Connection::open(&path)?;
        // Returns the resulting mode as a row, so it cannot go through execute().
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        let store = Self::init(conn, Some(path), busy_timeout)?;
        info!("Opened SQLite report store at {:?}", store.path);
        Ok(store)
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> TmbResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, None, StorageConfig::default().busy_timeout)
    }

    fn init(conn: Connection, path: Option<PathBuf>, busy_timeout: Duration) -> TmbResult<Self> {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn decode_report(json: &str) -> TmbResult<AisReport> {
    serde_json::from_str(json)
        .map_err(|e| TmbError::StoreUnavailable(format!("Corrupt stored report: {}", e)))
}

fn decode_vessel(mmsi: i64, imo: Option<i64>, name: Option<String>) -> TmbResult<VesselIdentity> {
    let mmsi = u32::try_from(mmsi)
        .ok()
        .and_then(|raw| Mmsi::new(raw).ok())
        .ok_or_else(|| TmbError::StoreUnavailable(format!("Corrupt stored MMSI {}", mmsi)))?;
    let imo = imo
        .map(|raw| {
            u32::try_from(raw)
                .map(Imo)
                .map_err(|_| TmbError::StoreUnavailable(format!("Corrupt stored IMO {}", raw)))
        })
        .transpose()?;
    Ok(VesselIdentity { mmsi, imo, name })
}

impl DocumentStore for SqliteStore {
    fn insert_reports(&self, reports: &[AisReport]) -> TmbResult<usize> {
        if reports.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO reports (mmsi, timestamp_ms, message_type, lat, lon, report_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;

            for report in reports {
                let json = serde_json::to_string(report)?;
                let position = report.position();
                stmt.execute(params![
                    i64::from(report.vessel_id.get()),
                    report.timestamp.timestamp_millis(),
                    report.message_type().as_str(),
                    position.map(|p| p.lat),
                    position.map(|p| p.lon),
                    json
                ])?;
            }
        }
        tx.commit()?;

        Ok(reports.len())
    }

    fn delete_reports_before(&self, cutoff: DateTime<Utc>) -> TmbResult<usize> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM reports WHERE timestamp_ms < ?1",
            params![cutoff.timestamp_millis()],
        )?;
        Ok(deleted)
    }

    fn find_reports(&self, filter: &ReportFilter) -> TmbResult<Vec<AisReport>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<SqlValue> = Vec::new();

        if let Some(vessel_id) = filter.vessel_id {
            clauses.push("mmsi = ?");
            args.push(SqlValue::Integer(i64::from(vessel_id.get())));
        }
        if filter.positions_only || filter.bbox.is_some() {
            clauses.push("lat IS NOT NULL");
        }
        if let Some(bbox) = filter.bbox {
            clauses.push("lat >= ? AND lat <= ?");
            args.push(SqlValue::Real(bbox.south));
            args.push(SqlValue::Real(bbox.north));
            clauses.push("lon >= ? AND lon <= ?");
            args.push(SqlValue::Real(bbox.west));
            args.push(SqlValue::Real(bbox.east));
        }

        let mut sql = String::from("SELECT report_json FROM reports");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY timestamp_ms DESC, id DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            args.push(SqlValue::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        }

        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<String>, _>>()?;
        drop(stmt);
        drop(conn); // Release lock before decoding

        rows.iter().map(|json| decode_report(json)).collect()
    }

    fn insert_vessels(&self, identities: &[VesselIdentity]) -> TmbResult<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt =
                tx.prepare_cached("INSERT INTO vessels (mmsi, imo, name) VALUES (?1, ?2, ?3)")?;
            for identity in identities {
                stmt.execute(params![
                    i64::from(identity.mmsi.get()),
                    identity.imo.map(|imo| i64::from(imo.0)),
                    identity.name
                ])?;
            }
        }
        tx.commit()?;
        Ok(identities.len())
    }

    fn find_vessels(&self, filter: &VesselFilter) -> TmbResult<Vec<VesselIdentity>> {
        let mut sql = String::from("SELECT mmsi, imo, name FROM vessels WHERE mmsi = ?");
        let mut args = vec![SqlValue::Integer(i64::from(filter.mmsi.get()))];
        if let Some(imo) = filter.imo {
            sql.push_str(" AND imo = ?");
            args.push(SqlValue::Integer(i64::from(imo.0)));
        }
        if let Some(name) = &filter.name {
            sql.push_str(" AND name = ?");
            args.push(SqlValue::Text(name.clone()));
        }
        sql.push_str(" ORDER BY id");

        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(mmsi, imo, name)| decode_vessel(mmsi, imo, name))
            .collect()
    }

    fn stats(&self) -> TmbResult<StoreStats> {
        let conn = self.conn.lock();
        let (reports, position_reports, distinct_vessels, oldest, newest) = conn.query_row(
            "SELECT COUNT(*), COUNT(lat), COUNT(DISTINCT mmsi), MIN(timestamp_ms), MAX(timestamp_ms)
             FROM reports",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                ))
            },
        )?;
        let vessel_identities: i64 =
            conn.query_row("SELECT COUNT(*) FROM vessels", [], |row| row.get(0))?;

        Ok(StoreStats {
            reports: reports as usize,
            position_reports: position_reports as usize,
            static_reports: (reports - position_reports) as usize,
            distinct_vessels: distinct_vessels as usize,
            vessel_identities: vessel_identities as usize,
            oldest: oldest.map(from_millis),
            newest: newest.map(from_millis),
        })
    }
}
