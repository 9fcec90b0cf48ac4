//! In-memory lookup from normalized station names to canonical candidates.

use std::collections::HashMap;

use crate::model::CanonicalStation;
use crate::stations::normalize::normalize_name;

/// One canonical candidate stored under a normalized name key.
#[derive(Debug, Clone, PartialEq)]
pub struct StationRef {
    pub station_id: String,
    pub lines: Vec<String>,
    pub coordinates: Option<(f64, f64)>,
}

/// Lookup index for one transit system, built once from the canonical
/// station list and kept for the process lifetime. Ambiguous normalized
/// names (shared by several stations) keep every candidate; disambiguation
/// is the resolver's job.
#[derive(Debug, Default)]
pub struct StationIndex {
    by_name: HashMap<String, Vec<StationRef>>,
    by_id: HashMap<String, StationRef>,
}

impl StationIndex {
    pub fn build(stations: &[CanonicalStation]) -> Self {
        let mut by_name: HashMap<String, Vec<StationRef>> = HashMap::new();
        let mut by_id = HashMap::new();

        for station in stations {
            let station_ref = StationRef {
                station_id: station.id.clone(),
                lines: station.lines.clone(),
                coordinates: station.coordinates,
            };
            by_name
                .entry(normalize_name(&station.name))
                .or_default()
                .push(station_ref.clone());
            by_id.insert(station.id.clone(), station_ref);
        }

        StationIndex { by_name, by_id }
    }

    /// All candidates stored under `name` after normalization. Empty slice
    /// when the name is unknown.
    pub fn lookup(&self, name: &str) -> &[StationRef] {
        self.by_name
            .get(&normalize_name(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Candidates for an already-normalized key (alias tables store
    /// normalized values, so their hits skip re-normalization).
    pub fn lookup_normalized(&self, key: &str) -> &[StationRef] {
        self.by_name.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn by_id(&self, station_id: &str) -> Option<&StationRef> {
        self.by_id.get(station_id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
