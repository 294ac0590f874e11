//! Identifier newtypes and geometry shared by every component.

use crate::error::{TmbError, TmbResult};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Largest value a nine-digit MMSI can take.
pub const MAX_MMSI: u32 = 999_999_999;

/// Current UTC instant truncated to millisecond precision.
pub fn utc_now() -> DateTime<Utc> {
    from_millis(Utc::now().timestamp_millis())
}

/// Builds a UTC instant from Unix milliseconds, saturating at the epoch on overflow.
pub fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

/// Drops sub-millisecond precision; stores keep report times at millisecond grain.
pub fn truncate_millis(instant: DateTime<Utc>) -> DateTime<Utc> {
    from_millis(instant.timestamp_millis())
}

/// Reads a non-negative JSON integer that fits in `u32`.
///
/// Strings, floats and booleans are rejected even when they look numeric.
fn u32_from_value(value: &Value, what: &str) -> TmbResult<u32> {
    let raw = value
        .as_u64()
        .ok_or_else(|| TmbError::InvalidArgument(format!("{} must be an integer, got {}", what, value)))?;
    u32::try_from(raw)
        .map_err(|_| TmbError::InvalidArgument(format!("{} {} is out of range", what, raw)))
}

// ================================================================================================
// IDENTIFIERS
// ================================================================================================

/// Maritime Mobile Service Identity, the primary vessel key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Mmsi(u32);

impl Mmsi {
    pub fn new(raw: u32) -> TmbResult<Self> {
        if raw == 0 || raw > MAX_MMSI {
            return Err(TmbError::InvalidArgument(format!(
                "MMSI {} is outside 1..={}",
                raw, MAX_MMSI
            )));
        }
        Ok(Mmsi(raw))
    }

    pub fn from_value(value: &Value) -> TmbResult<Self> {
        Self::new(u32_from_value(value, "MMSI")?)
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for Mmsi {
    type Error = TmbError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Mmsi::new(raw)
    }
}

impl From<Mmsi> for u32 {
    fn from(mmsi: Mmsi) -> u32 {
        mmsi.0
    }
}

impl fmt::Display for Mmsi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// International Maritime Organization number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Imo(pub u32);

impl Imo {
    pub fn from_value(value: &Value) -> TmbResult<Self> {
        Ok(Imo(u32_from_value(value, "IMO")?))
    }
}

impl fmt::Display for Imo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a map tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(pub u32);

impl TileId {
    pub fn from_value(value: &Value) -> TmbResult<Self> {
        Ok(TileId(u32_from_value(value, "tile id")?))
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a port. Source data carries both numeric and string ids.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PortId(pub String);

impl<'de> Deserialize<'de> for PortId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => PortId(s),
            Raw::Number(n) => PortId(n.to_string()),
        })
    }
}

impl From<&str> for PortId {
    fn from(s: &str) -> Self {
        PortId(s.to_string())
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tile zoom level, 1 coarsest to 3 finest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ZoomLevel {
    One,
    Two,
    Three,
}

impl ZoomLevel {
    pub const FINEST: ZoomLevel = ZoomLevel::Three;

    pub fn all() -> [ZoomLevel; 3] {
        [ZoomLevel::One, ZoomLevel::Two, ZoomLevel::Three]
    }

    /// Position of this level in a port's `tile_refs` array.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Next finer level, if any.
    pub fn finer(self) -> Option<ZoomLevel> {
        match self {
            ZoomLevel::One => Some(ZoomLevel::Two),
            ZoomLevel::Two => Some(ZoomLevel::Three),
            ZoomLevel::Three => None,
        }
    }
}

impl TryFrom<u8> for ZoomLevel {
    type Error = TmbError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            1 => Ok(ZoomLevel::One),
            2 => Ok(ZoomLevel::Two),
            3 => Ok(ZoomLevel::Three),
            other => Err(TmbError::InvalidArgument(format!(
                "zoom level must be 1, 2 or 3, got {}",
                other
            ))),
        }
    }
}

impl From<ZoomLevel> for u8 {
    fn from(level: ZoomLevel) -> u8 {
        level.index() as u8 + 1
    }
}

impl fmt::Display for ZoomLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

// ================================================================================================
// GEOMETRY
// ================================================================================================

/// A geographic point in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> TmbResult<Self> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(TmbError::MalformedInput(format!(
                "latitude {} is outside [-90, 90]",
                lat
            )));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(TmbError::MalformedInput(format!(
                "longitude {} is outside [-180, 180]",
                lon
            )));
        }
        Ok(Position { lat, lon })
    }
}

/// Axis-aligned geographic window. Bounds are inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Boxes crossing the antimeridian (west > east) are not supported.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> TmbResult<Self> {
        let values = [west, south, east, north];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(TmbError::InvalidArgument(
                "bounding box edges must be finite".to_string(),
            ));
        }
        if south > north || west > east {
            return Err(TmbError::InvalidArgument(format!(
                "degenerate bounding box w={} s={} e={} n={}",
                west, south, east, north
            )));
        }
        Ok(BoundingBox {
            west,
            south,
            east,
            north,
        })
    }

    #[inline]
    pub fn contains(&self, position: &Position) -> bool {
        position.lat >= self.south
            && position.lat <= self.north
            && position.lon >= self.west
            && position.lon <= self.east
    }

    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        other.west >= self.west
            && other.east <= self.east
            && other.south >= self.south
            && other.north <= self.north
    }
}
