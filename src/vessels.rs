//! Vessel directory: static identity records keyed by MMSI.
//!
//! Identities are reference data loaded once at startup. Lookups match the
//! MMSI and, when supplied, the IMO number and name exactly.

use crate::error::{TmbError, TmbResult};
use crate::storage::{DocumentStore, VesselFilter};
use crate::types::{Imo, Mmsi};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Identity record of a vessel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VesselIdentity {
    #[serde(rename = "MMSI")]
    pub mmsi: Mmsi,
    #[serde(rename = "IMO", default, skip_serializing_if = "Option::is_none")]
    pub imo: Option<Imo>,
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Validated lookup parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct VesselQuery {
    pub mmsi: Mmsi,
    pub imo: Option<Imo>,
    pub name: Option<String>,
}

impl VesselQuery {
    pub fn new(mmsi: Mmsi) -> Self {
        Self {
            mmsi,
            imo: None,
            name: None,
        }
    }

    pub fn with_imo(mut self, imo: Imo) -> Self {
        self.imo = Some(imo);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds a query from untyped arguments, rejecting wrong types up front.
    ///
    /// `mmsi` and `imo` must be JSON integers and `name` a JSON string.
    /// `None` or JSON `null` for an optional argument means "not supplied".
    pub fn from_args(mmsi: &Value, imo: Option<&Value>, name: Option<&Value>) -> TmbResult<Self> {
        let mmsi = Mmsi::from_value(mmsi)?;

        let imo = match imo {
            None | Some(Value::Null) => None,
            Some(value) => Some(Imo::from_value(value)?),
        };

        let name = match name {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                return Err(TmbError::InvalidArgument(format!(
                    "name must be a string, got {}",
                    other
                )))
            }
        };

        Ok(Self { mmsi, imo, name })
    }

    fn to_filter(&self) -> VesselFilter {
        VesselFilter {
            mmsi: self.mmsi,
            imo: self.imo,
            name: self.name.clone(),
        }
    }
}

/// Read access to vessel identities.
#[derive(Clone)]
pub struct VesselDirectory {
    store: Arc<dyn DocumentStore>,
}

impl VesselDirectory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Loads reference identities. Called by the startup loader only.
    pub fn load(&self, identities: &[VesselIdentity]) -> TmbResult<usize> {
        let count = self.store.insert_vessels(identities)?;
        info!("Loaded {} vessel identities", count);
        Ok(count)
    }

    /// Identities matching every field the query sets.
    ///
    /// # Arguments
    /// - `query`: MMSI plus optional IMO and name, all compared exactly
    ///
    /// # Returns
    /// Matching identities; empty when nothing matches.
    ///
    /// # Example
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use tmb::{MemoryStore, Mmsi, VesselDirectory, VesselQuery};
    ///
    /// let directory = VesselDirectory::new(Arc::new(MemoryStore::new()));
    /// let query = VesselQuery::new(Mmsi::new(235095435)?).with_name("Lady K Ii");
    /// let found = directory.lookup(&query)?;
    /// # let _ = found;
    /// # Ok::<(), tmb::TmbError>(())
    /// ```
    pub fn lookup(&self, query: &VesselQuery) -> TmbResult<Vec<VesselIdentity>> {
        self.store.find_vessels(&query.to_filter())
    }

    /// Validates untyped arguments, then runs `lookup`.
    ///
    /// # Arguments
    /// - `mmsi`: must be a JSON integer in MMSI range
    /// - `imo`: optional JSON integer; `null` is treated as absent
    /// - `name`: optional JSON string; `null` is treated as absent
    ///
    /// # Returns
    /// `InvalidArgument` before any store access when a value has the wrong type.
    pub fn lookup_args(
        &self,
        mmsi: &Value,
        imo: Option<&Value>,
        name: Option<&Value>,
    ) -> TmbResult<Vec<VesselIdentity>> {
        let query = VesselQuery::from_args(mmsi, imo, name)?;
        self.lookup(&query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn directory() -> VesselDirectory {
        let dir = VesselDirectory::new(Arc::new(MemoryStore::new()));
        let rows: Vec<VesselIdentity> = serde_json::from_value(json!([
            {"MMSI": 235095435, "IMO": 1000019, "Name": "Lady K Ii"},
            {"MMSI": 235095435, "IMO": 1000020, "Name": "Lady K Iii"},
            {"MMSI": 219005465, "Name": "Pilot 2"}
        ]))
        .unwrap();
        dir.load(&rows).unwrap();
        dir
    }

    #[test]
    fn test_lookup_by_mmsi_only_returns_all_matches() {
        let found = directory()
            .lookup(&VesselQuery::new(Mmsi::new(235095435).unwrap()))
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_lookup_name_must_match_exactly() {
        let query = VesselQuery::new(Mmsi::new(235095435).unwrap()).with_name("lady k ii");
        assert!(directory().lookup(&query).unwrap().is_empty());
    }

    #[test]
    fn test_lookup_args_null_means_unsupplied() {
        let found = directory()
            .lookup_args(&json!(219005465), Some(&Value::Null), None)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].imo, None);
    }

    #[test]
    fn test_lookup_args_rejects_wrong_types() {
        let dir = directory();
        assert!(matches!(
            dir.lookup_args(&json!("235095435"), None, None),
            Err(TmbError::InvalidArgument(_))
        ));
        assert!(matches!(
            dir.lookup_args(&json!(235095435), Some(&json!("1000019")), None),
            Err(TmbError::InvalidArgument(_))
        ));
        assert!(matches!(
            dir.lookup_args(&json!(235095435), None, Some(&json!(42))),
            Err(TmbError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_identity_serializes_with_source_keys() {
        let identity = VesselIdentity {
            mmsi: Mmsi::new(235095435).unwrap(),
            imo: Some(Imo(1000019)),
            name: Some("Lady K Ii".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&identity).unwrap(),
            json!({"MMSI": 235095435, "IMO": 1000019, "Name": "Lady K Ii"})
        );
    }
}
