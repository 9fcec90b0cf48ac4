//! Canonical data model for the incident reconciliation engine.
//!
//! Everything an adapter produces is eventually normalized into these
//! shapes; the read API serves them as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reference data for one station of one transit system, loaded from the
/// static data store. Immutable for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalStation {
    pub id: String,
    pub system_id: String,
    pub name: String,
    #[serde(default)]
    pub lines: Vec<String>,
    /// `(latitude, longitude)` in degrees, when the store has them.
    #[serde(default)]
    pub coordinates: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    Elevator,
    Escalator,
}

/// Canonical equipment-outage record, grouped by canonical station id
/// inside [`IncidentData`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitOutage {
    pub unit_name: String,
    pub unit_type: UnitType,
    pub location: String,
    pub symptom: String,
    pub out_of_service_since: DateTime<Utc>,
    pub estimated_return: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// The canonical three-valued alert classification every agency vocabulary
/// is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Delay,
    Emergency,
    Advisory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceAlert {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub affected_lines: Vec<String>,
    #[serde(default)]
    pub affected_stations: Vec<String>,
    pub posted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentSummary {
    pub total_outages: usize,
    pub elevator_outages: usize,
    pub escalator_outages: usize,
    pub stations_affected: usize,
    pub active_alerts: usize,
}

/// Per-system aggregate document, rebuilt from scratch on every successful
/// fetch cycle. A new document always replaces the previous one wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentData {
    pub fetched_at: DateTime<Utc>,
    pub system_id: String,
    pub summary: IncidentSummary,
    pub alerts: Vec<ServiceAlert>,
    pub outages_by_station: BTreeMap<String, Vec<UnitOutage>>,
}

impl IncidentData {
    /// Assembles a document from normalized parts, deriving the summary so
    /// the counting invariants hold by construction.
    pub fn assemble(
        system_id: &str,
        fetched_at: DateTime<Utc>,
        alerts: Vec<ServiceAlert>,
        outages_by_station: BTreeMap<String, Vec<UnitOutage>>,
    ) -> Self {
        let elevator_outages = outages_by_station
            .values()
            .flatten()
            .filter(|o| o.unit_type == UnitType::Elevator)
            .count();
        let escalator_outages = outages_by_station
            .values()
            .flatten()
            .filter(|o| o.unit_type == UnitType::Escalator)
            .count();

        IncidentData {
            fetched_at,
            system_id: system_id.to_string(),
            summary: IncidentSummary {
                total_outages: elevator_outages + escalator_outages,
                elevator_outages,
                escalator_outages,
                stations_affected: outages_by_station.len(),
                active_alerts: alerts.len(),
            },
            alerts,
            outages_by_station,
        }
    }
}

/// Raw facility note scraped out of one station-page block.
#[derive(Debug, Clone, PartialEq)]
pub struct FacilityNote {
    pub unit_type: UnitType,
    pub status_text: String,
}

/// Record from a JSON equipment-status poll (one unit per entry).
#[derive(Debug, Clone)]
pub struct RawUnitStatus {
    pub unit_name: String,
    pub unit_type_code: String,
    pub station_code: Option<String>,
    pub station_name: Option<String>,
    pub location: String,
    pub symptom: String,
    pub out_of_service_since: Option<DateTime<Utc>>,
    pub estimated_return: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Record decoded from one GTFS-Realtime alert entity.
#[derive(Debug, Clone, Default)]
pub struct RawRtAlert {
    pub id: String,
    pub header: String,
    pub description: String,
    pub effect: Option<i32>,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub routes: Vec<String>,
    pub stop_ids: Vec<String>,
}

/// Record scraped from one station page (or XML line-map entry).
#[derive(Debug, Clone, Default)]
pub struct RawFacility {
    pub station_name: Option<String>,
    pub line_code: Option<String>,
    pub coordinates: Option<(f64, f64)>,
    pub notes: Vec<FacilityNote>,
    pub accessible: bool,
    pub restroom: bool,
}

/// One raw record from one upstream source, tagged by source kind so the
/// normalizer can branch without inspecting structure.
#[derive(Debug, Clone)]
pub enum RawRecord {
    UnitStatus(RawUnitStatus),
    RtAlert(RawRtAlert),
    Facility(RawFacility),
}
