//! JSON polling adapter for elevator/escalator status APIs.
//!
//! The WMATA-style endpoint returns `{"ElevatorIncidents": [...]}` with one
//! entry per out-of-service unit. The API key rides as a query parameter,
//! which the caller supplies via a [`crate::fetch::auth::UrlParam`] wrapper
//! around the client.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::adapters::FeedAdapter;
use crate::error::FetchError;
use crate::fetch::{HttpClient, fetch_bytes};
use crate::model::{RawRecord, RawUnitStatus};

const SOURCE: &str = "elevator_json";

pub struct ElevatorJsonAdapter {
    client: Box<dyn HttpClient>,
    url: String,
}

impl ElevatorJsonAdapter {
    pub fn new(client: Box<dyn HttpClient>, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[derive(Deserialize)]
struct IncidentsResponse {
    // A feed with nothing broken omits the array entirely.
    #[serde(rename = "ElevatorIncidents", default)]
    elevator_incidents: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct IncidentEntry {
    #[serde(rename = "UnitName")]
    unit_name: String,
    #[serde(rename = "UnitType")]
    unit_type: String,
    #[serde(rename = "StationCode", default)]
    station_code: Option<String>,
    #[serde(rename = "StationName", default)]
    station_name: Option<String>,
    #[serde(rename = "LocationDescription", default)]
    location_description: Option<String>,
    #[serde(rename = "SymptomDescription", default)]
    symptom_description: Option<String>,
    #[serde(rename = "DateOutOfServ", default)]
    date_out_of_serv: Option<String>,
    #[serde(rename = "EstimatedReturnToService", default)]
    estimated_return: Option<String>,
    #[serde(rename = "DateUpdated", default)]
    date_updated: Option<String>,
}

// The API writes local timestamps without a zone designator.
fn parse_timestamp(raw: &Option<String>) -> Option<DateTime<Utc>> {
    let raw = raw.as_deref()?;
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parses the incident array out of a response body. Entries that fail to
/// deserialize are skipped individually; an unparseable document is a
/// decode failure.
pub fn parse_unit_statuses(bytes: &[u8]) -> Result<Vec<RawRecord>, FetchError> {
    let response: IncidentsResponse =
        serde_json::from_slice(bytes).map_err(|e| FetchError::decode(SOURCE, e.to_string()))?;

    let mut records = Vec::new();
    for value in response.elevator_incidents {
        let entry: IncidentEntry = match serde_json::from_value(value) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(source = SOURCE, error = %e, "Skipping malformed incident entry");
                continue;
            }
        };

        records.push(RawRecord::UnitStatus(RawUnitStatus {
            unit_name: entry.unit_name,
            unit_type_code: entry.unit_type,
            station_code: entry.station_code,
            station_name: entry.station_name,
            location: entry.location_description.unwrap_or_default(),
            symptom: entry.symptom_description.unwrap_or_default(),
            out_of_service_since: parse_timestamp(&entry.date_out_of_serv),
            estimated_return: parse_timestamp(&entry.estimated_return),
            updated_at: parse_timestamp(&entry.date_updated),
        }));
    }
    Ok(records)
}

#[async_trait]
impl FeedAdapter for ElevatorJsonAdapter {
    fn source(&self) -> &'static str {
        SOURCE
    }

    async fn fetch_raw(&self) -> Result<Vec<RawRecord>, FetchError> {
        let bytes = fetch_bytes(self.client.as_ref(), SOURCE, &self.url).await?;
        let records = parse_unit_statuses(&bytes)?;
        debug!(source = SOURCE, count = records.len(), "Parsed unit statuses");
        Ok(records)
    }
}
