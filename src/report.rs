//! AIS report model and ingestion parsing.
//!
//! Raw records arrive in the DMA export shape (PascalCase keys, a GeoJSON-like
//! `Position` object). They are mapped onto [`AisReport`], whose payload is
//! either a position fix or static voyage data, never both.

use crate::config::CoordinateOrder;
use crate::error::{TmbError, TmbResult};
use crate::types::{from_millis, truncate_millis, Imo, Mmsi, Position};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of AIS message a report was decoded from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    PositionReport,
    StaticData,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::PositionReport => "position_report",
            MessageType::StaticData => "static_data",
        }
    }

    fn parse(raw: &str) -> TmbResult<Self> {
        match raw {
            "position_report" => Ok(MessageType::PositionReport),
            "static_data" => Ok(MessageType::StaticData),
            other => Err(TmbError::MalformedInput(format!(
                "unknown MsgType '{}'",
                other
            ))),
        }
    }
}

/// Dynamic fields of a position report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionReport {
    pub position: Position,
    pub status: Option<String>,
    pub rate_of_turn: Option<f64>,
    pub speed_over_ground: Option<f64>,
    pub course_over_ground: Option<f64>,
    pub heading: Option<f64>,
}

/// Hull dimensions and antenna offsets (A/B/C/D) in metres.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: Option<f64>,
    pub breadth: Option<f64>,
    pub draught: Option<f64>,
    pub to_bow: Option<f64>,
    pub to_stern: Option<f64>,
    pub to_port: Option<f64>,
    pub to_starboard: Option<f64>,
}

/// Static and voyage-related fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticData {
    pub imo: Option<Imo>,
    pub call_sign: Option<String>,
    pub name: Option<String>,
    pub vessel_type: Option<String>,
    pub cargo_type: Option<String>,
    pub dimensions: Dimensions,
    pub destination: Option<String>,
    pub eta: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportPayload {
    Position(PositionReport),
    Static(StaticData),
}

/// A single stored AIS report. Immutable once written.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AisReport {
    pub vessel_id: Mmsi,
    pub timestamp: DateTime<Utc>,
    pub class: Option<String>,
    pub payload: ReportPayload,
}

impl AisReport {
    pub fn position_report(vessel_id: Mmsi, timestamp: DateTime<Utc>, position: Position) -> Self {
        AisReport {
            vessel_id,
            timestamp: truncate_millis(timestamp),
            class: None,
            payload: ReportPayload::Position(PositionReport {
                position,
                status: None,
                rate_of_turn: None,
                speed_over_ground: None,
                course_over_ground: None,
                heading: None,
            }),
        }
    }

    pub fn static_report(vessel_id: Mmsi, timestamp: DateTime<Utc>, data: StaticData) -> Self {
        AisReport {
            vessel_id,
            timestamp: truncate_millis(timestamp),
            class: None,
            payload: ReportPayload::Static(data),
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self.payload {
            ReportPayload::Position(_) => MessageType::PositionReport,
            ReportPayload::Static(_) => MessageType::StaticData,
        }
    }

    /// Position carried by the report, if it is a position report.
    pub fn position(&self) -> Option<Position> {
        match &self.payload {
            ReportPayload::Position(p) => Some(p.position),
            ReportPayload::Static(_) => None,
        }
    }

    pub fn static_data(&self) -> Option<&StaticData> {
        match &self.payload {
            ReportPayload::Static(s) => Some(s),
            ReportPayload::Position(_) => None,
        }
    }

    /// Parses one raw ingestion record.
    pub fn from_record(record: &Value, order: CoordinateOrder) -> TmbResult<Self> {
        let raw = RawReport::deserialize(record)
            .map_err(|e| TmbError::MalformedInput(format!("record shape: {}", e)))?;
        raw.into_report(order)
    }
}

// ================================================================================================
// RAW INGESTION SHAPE
// ================================================================================================

#[derive(Debug, Deserialize)]
struct RawGeometry {
    coordinates: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawReport {
    timestamp: String,
    class: Option<String>,
    #[serde(rename = "MMSI")]
    mmsi: Value,
    msg_type: String,
    position: Option<RawGeometry>,
    status: Option<String>,
    #[serde(rename = "RoT")]
    rot: Option<f64>,
    #[serde(rename = "SoG")]
    sog: Option<f64>,
    #[serde(rename = "CoG")]
    cog: Option<f64>,
    heading: Option<f64>,
    #[serde(rename = "IMO")]
    imo: Option<Value>,
    call_sign: Option<String>,
    name: Option<String>,
    vessel_type: Option<String>,
    // Misspelled in the DMA export.
    #[serde(alias = "CargoType")]
    cargo_tye: Option<String>,
    length: Option<f64>,
    breadth: Option<f64>,
    draught: Option<f64>,
    destination: Option<String>,
    #[serde(rename = "ETA")]
    eta: Option<String>,
    #[serde(rename = "A")]
    a: Option<f64>,
    #[serde(rename = "B")]
    b: Option<f64>,
    #[serde(rename = "C")]
    c: Option<f64>,
    #[serde(rename = "D")]
    d: Option<f64>,
}

/// RFC 3339 instant truncated to milliseconds.
fn parse_instant(raw: &str, field: &str) -> TmbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| from_millis(dt.timestamp_millis()))
        .map_err(|e| TmbError::MalformedInput(format!("{} '{}': {}", field, raw, e)))
}

impl RawReport {
    fn into_report(self, order: CoordinateOrder) -> TmbResult<AisReport> {
        let vessel_id = Mmsi::from_value(&self.mmsi)
            .map_err(|e| TmbError::MalformedInput(e.to_string()))?;
        let timestamp = parse_instant(&self.timestamp, "Timestamp")?;

        let payload = match MessageType::parse(&self.msg_type)? {
            MessageType::PositionReport => {
                let geometry = self.position.ok_or_else(|| {
                    TmbError::MalformedInput("position_report without Position".to_string())
                })?;
                let (first, second) = match geometry.coordinates.as_slice() {
                    [first, second] => (*first, *second),
                    other => {
                        return Err(TmbError::MalformedInput(format!(
                            "Position needs 2 coordinates, got {}",
                            other.len()
                        )))
                    }
                };
                let position = match order {
                    CoordinateOrder::LatLon => Position::new(first, second)?,
                    CoordinateOrder::LonLat => Position::new(second, first)?,
                };
                ReportPayload::Position(PositionReport {
                    position,
                    status: self.status,
                    rate_of_turn: self.rot,
                    speed_over_ground: self.sog,
                    course_over_ground: self.cog,
                    heading: self.heading,
                })
            }
            MessageType::StaticData => {
                if self.position.is_some() {
                    return Err(TmbError::MalformedInput(
                        "static_data report must not carry a Position".to_string(),
                    ));
                }
                // Exports write "Unknown" when no IMO was broadcast.
                let imo = match self.imo {
                    Some(Value::String(_)) | Some(Value::Null) | None => None,
                    Some(ref value) => Some(
                        Imo::from_value(value)
                            .map_err(|e| TmbError::MalformedInput(e.to_string()))?,
                    ),
                };
                let eta = self
                    .eta
                    .as_deref()
                    .map(|raw| parse_instant(raw, "ETA"))
                    .transpose()?;
                ReportPayload::Static(StaticData {
                    imo,
                    call_sign: self.call_sign,
                    name: self.name,
                    vessel_type: self.vessel_type,
                    cargo_type: self.cargo_tye,
                    dimensions: Dimensions {
                        length: self.length,
                        breadth: self.breadth,
                        draught: self.draught,
                        to_bow: self.a,
                        to_stern: self.b,
                        to_port: self.c,
                        to_starboard: self.d,
                    },
                    destination: self.destination,
                    eta,
                })
            }
        };

        Ok(AisReport {
            vessel_id,
            timestamp,
            class: self.class,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn static_record() -> Value {
        json!({
            "Timestamp": "2020-11-18T00:00:00.000Z", "Class": "Class A", "MMSI": 210169000,
            "MsgType": "static_data", "IMO": 9584865, "CallSign": "5BNZ3",
            "Name": "KATHARINA SCHEPERS", "VesselType": "Cargo", "CargoTye": "Category X",
            "Length": 152, "Breadth": 24, "Draught": 7.8, "Destination": "NODRM",
            "ETA": "2020-11-18T09:00:00.000Z", "A": 143, "B": 9, "C": 13, "D": 11
        })
    }

    fn position_record() -> Value {
        json!({
            "Timestamp": "2020-11-18T00:00:01.000Z", "Class": "Class A", "MMSI": 219005465,
            "MsgType": "position_report",
            "Position": {"type": "Point", "coordinates": [54.572602, 11.929218]},
            "Status": "Under way using engine", "RoT": 0, "SoG": 0, "CoG": 298.7, "Heading": 203
        })
    }

    #[test]
    fn test_parse_static_data() {
        let report = AisReport::from_record(&static_record(), CoordinateOrder::LatLon).unwrap();
        assert_eq!(report.message_type(), MessageType::StaticData);
        assert_eq!(report.position(), None);
        let data = report.static_data().unwrap();
        assert_eq!(data.imo, Some(Imo(9584865)));
        assert_eq!(data.cargo_type.as_deref(), Some("Category X"));
        assert_eq!(data.dimensions.to_bow, Some(143.0));
        assert!(data.eta.is_some());
    }

    #[test]
    fn test_parse_position_lat_lon_order() {
        let report = AisReport::from_record(&position_record(), CoordinateOrder::LatLon).unwrap();
        let position = report.position().unwrap();
        assert_eq!(position.lat, 54.572602);
        assert_eq!(position.lon, 11.929218);
    }

    #[test]
    fn test_parse_position_lon_lat_order() {
        let report = AisReport::from_record(&position_record(), CoordinateOrder::LonLat).unwrap();
        let position = report.position().unwrap();
        assert_eq!(position.lat, 11.929218);
        assert_eq!(position.lon, 54.572602);
    }

    #[test]
    fn test_unknown_imo_is_absent() {
        let mut record = static_record();
        record["IMO"] = json!("Unknown");
        let report = AisReport::from_record(&record, CoordinateOrder::LatLon).unwrap();
        assert_eq!(report.static_data().unwrap().imo, None);
    }

    #[test]
    fn test_static_with_position_is_malformed() {
        let mut record = static_record();
        record["Position"] = json!({"type": "Point", "coordinates": [55.0, 10.0]});
        assert!(matches!(
            AisReport::from_record(&record, CoordinateOrder::LatLon),
            Err(TmbError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_swapped_coordinates_are_rejected() {
        let mut record = position_record();
        record["Position"]["coordinates"] = json!([120.5, 10.0]);
        assert!(matches!(
            AisReport::from_record(&record, CoordinateOrder::LatLon),
            Err(TmbError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_string_mmsi_is_malformed() {
        let mut record = position_record();
        record["MMSI"] = json!("219005465");
        assert!(matches!(
            AisReport::from_record(&record, CoordinateOrder::LatLon),
            Err(TmbError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_missing_timestamp_is_malformed() {
        let mut record = position_record();
        record.as_object_mut().unwrap().remove("Timestamp");
        assert!(AisReport::from_record(&record, CoordinateOrder::LatLon).is_err());
    }

    #[test]
    fn test_stored_document_keeps_payload_tag() {
        let report = AisReport::from_record(&position_record(), CoordinateOrder::LatLon).unwrap();
        let doc = serde_json::to_value(&report).unwrap();
        assert_eq!(doc["payload"]["kind"], "position");
        let back: AisReport = serde_json::from_value(doc).unwrap();
        assert_eq!(back, report);
    }
}
