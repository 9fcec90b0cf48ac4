//! Loaders for the static per-system station lists.
//!
//! The static data store is an external collaborator: a directory of
//! `<system_id>/stations.json` files, each an array of canonical stations.
//! The trait exists so the aggregator and tests can swap in an in-memory
//! source.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::debug;

use crate::error::FetchError;
use crate::model::CanonicalStation;

pub trait StationStore: Send + Sync {
    fn load_stations(&self, system_id: &str) -> Result<Vec<CanonicalStation>, FetchError>;
}

/// Reads station lists from a data directory on disk.
pub struct JsonStationStore {
    data_dir: PathBuf,
}

impl JsonStationStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

impl StationStore for JsonStationStore {
    fn load_stations(&self, system_id: &str) -> Result<Vec<CanonicalStation>, FetchError> {
        let path = self.data_dir.join(system_id).join("stations.json");
        debug!(system_id, path = %path.display(), "Loading station list");

        let content = std::fs::read_to_string(&path).map_err(|e| {
            FetchError::ConfigurationMissing(format!(
                "station data for `{system_id}` at {}: {e}",
                path.display()
            ))
        })?;

        let stations: Vec<CanonicalStation> = serde_json::from_str(&content)
            .map_err(|e| FetchError::decode("station_store", e.to_string()))?;
        Ok(stations)
    }
}

/// In-memory store used by tests and by callers that already hold the
/// reference data.
#[derive(Default)]
pub struct MemoryStationStore {
    systems: HashMap<String, Vec<CanonicalStation>>,
}

impl MemoryStationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system(mut self, system_id: &str, stations: Vec<CanonicalStation>) -> Self {
        self.systems.insert(system_id.to_string(), stations);
        self
    }
}

impl StationStore for MemoryStationStore {
    fn load_stations(&self, system_id: &str) -> Result<Vec<CanonicalStation>, FetchError> {
        self.systems.get(system_id).cloned().ok_or_else(|| {
            FetchError::ConfigurationMissing(format!("no station data for `{system_id}`"))
        })
    }
}
