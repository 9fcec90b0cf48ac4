//! Per-system fetch pipeline: run the system's adapters concurrently,
//! resolve raw references against the station index, normalize into the
//! canonical document.
//!
//! Adapter failures are isolated settle-all style. A failed *required*
//! adapter fails the cycle (the aggregator then serves cache); a failed
//! supplementary adapter only degrades the document (an alert feed going
//! dark must not push a healthy outage feed back onto stale data).

use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::adapters::FeedAdapter;
use crate::error::FetchError;
use crate::model::{
    IncidentData, RawFacility, RawRecord, RawRtAlert, RawUnitStatus, ServiceAlert, UnitOutage,
    UnitType,
};
use crate::normalize::{classify_effect, classify_text, infer_unit_outages, text_indicates_disruption};
use crate::resolve::{LineMatch, RawStationRef, Resolver};
use crate::stations::{StationIndex, normalize_name};

struct AdapterSlot {
    adapter: Box<dyn FeedAdapter>,
    required: bool,
}

pub struct SystemPipeline {
    system_id: String,
    resolver: Resolver,
    slots: Vec<AdapterSlot>,
}

impl SystemPipeline {
    pub fn new(system_id: impl Into<String>, resolver: Resolver) -> Self {
        Self {
            system_id: system_id.into(),
            resolver,
            slots: Vec::new(),
        }
    }

    /// Adds a feed whose failure fails the whole cycle.
    pub fn with_adapter(mut self, adapter: Box<dyn FeedAdapter>) -> Self {
        self.slots.push(AdapterSlot {
            adapter,
            required: true,
        });
        self
    }

    /// Adds a supplementary feed; its failure only degrades the document.
    pub fn with_optional_adapter(mut self, adapter: Box<dyn FeedAdapter>) -> Self {
        self.slots.push(AdapterSlot {
            adapter,
            required: false,
        });
        self
    }

    pub fn system_id(&self) -> &str {
        &self.system_id
    }

    /// One full fetch cycle. The returned document is always assembled
    /// fresh; the caller replaces any previous value wholesale.
    #[tracing::instrument(skip(self, index), fields(system_id = %self.system_id))]
    pub async fn run(
        &self,
        index: &StationIndex,
        now: DateTime<Utc>,
    ) -> Result<IncidentData, FetchError> {
        let fetches = self.slots.iter().map(|slot| slot.adapter.fetch_raw());
        let outcomes = futures::future::join_all(fetches).await;

        let mut records = Vec::new();
        for (slot, outcome) in self.slots.iter().zip(outcomes) {
            match outcome {
                Ok(mut raw) => {
                    debug!(source = slot.adapter.source(), count = raw.len(), "Feed fetched");
                    records.append(&mut raw);
                }
                Err(e) if slot.required => {
                    warn!(source = slot.adapter.source(), error = %e, "Required feed failed");
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        source = slot.adapter.source(),
                        error = %e,
                        "Supplementary feed failed, degrading"
                    );
                }
            }
        }

        Ok(self.normalize(records, index, now))
    }

    fn normalize(
        &self,
        records: Vec<RawRecord>,
        index: &StationIndex,
        now: DateTime<Utc>,
    ) -> IncidentData {
        let mut unit_statuses = Vec::new();
        let mut rt_alerts = Vec::new();
        let mut facilities = Vec::new();
        for record in records {
            match record {
                RawRecord::UnitStatus(u) => unit_statuses.push(u),
                RawRecord::RtAlert(a) => rt_alerts.push(a),
                RawRecord::Facility(f) => facilities.push(f),
            }
        }

        let mut outages: BTreeMap<String, Vec<UnitOutage>> = BTreeMap::new();

        for unit in unit_statuses {
            if let Some((station_id, outage)) = self.normalize_unit_status(unit, index, now) {
                outages.entry(station_id).or_default().push(outage);
            }
        }

        for (station_id, outage) in self.normalize_facilities(facilities, index, now) {
            outages.entry(station_id).or_default().push(outage);
        }

        let mut alerts = Vec::new();
        for raw in rt_alerts {
            let alert = self.normalize_rt_alert(raw, index, now);
            for (station_id, outage) in infer_unit_outages(&alert, now) {
                outages.entry(station_id).or_default().push(outage);
            }
            alerts.push(alert);
        }

        IncidentData::assemble(&self.system_id, now, alerts, outages)
    }

    fn normalize_unit_status(
        &self,
        unit: RawUnitStatus,
        index: &StationIndex,
        now: DateTime<Utc>,
    ) -> Option<(String, UnitOutage)> {
        let unit_type = match unit.unit_type_code.to_uppercase().as_str() {
            "ELEVATOR" => UnitType::Elevator,
            "ESCALATOR" => UnitType::Escalator,
            other => {
                warn!(unit_name = %unit.unit_name, unit_type = other, "Unknown unit type, skipping");
                return None;
            }
        };

        let raw_ref = RawStationRef {
            stop_id: unit.station_code.as_deref(),
            name: unit.station_name.as_deref(),
            ..Default::default()
        };
        let station_id = self.resolver.resolve_station(&raw_ref, index)?;

        let outage = UnitOutage {
            unit_name: unit.unit_name,
            unit_type,
            location: unit.location,
            symptom: unit.symptom,
            out_of_service_since: unit.out_of_service_since.or(unit.updated_at).unwrap_or(now),
            estimated_return: unit.estimated_return,
            updated_at: unit.updated_at.unwrap_or(now),
        };
        Some((station_id, outage))
    }

    /// Folds line-map context records (no facility notes) into the scraped
    /// facility records that share a station name, then emits an outage for
    /// every note whose status text reads as a disruption.
    fn normalize_facilities(
        &self,
        facilities: Vec<RawFacility>,
        index: &StationIndex,
        now: DateTime<Utc>,
    ) -> Vec<(String, UnitOutage)> {
        struct Context {
            coordinates: Option<(f64, f64)>,
            routes: Vec<String>,
        }

        let mut context_by_name: HashMap<String, Context> = HashMap::new();
        for facility in facilities.iter().filter(|f| f.notes.is_empty()) {
            let Some(name) = &facility.station_name else {
                continue;
            };
            let entry = context_by_name
                .entry(normalize_name(name))
                .or_insert(Context {
                    coordinates: None,
                    routes: Vec::new(),
                });
            if entry.coordinates.is_none() {
                entry.coordinates = facility.coordinates;
            }
            if let Some(line) = &facility.line_code
                && !entry.routes.contains(line)
            {
                entry.routes.push(line.clone());
            }
        }

        let mut resolved = Vec::new();
        for facility in facilities.iter().filter(|f| !f.notes.is_empty()) {
            let Some(name) = &facility.station_name else {
                continue;
            };
            let context = context_by_name.get(&normalize_name(name));
            let routes: Vec<String> = context.map(|c| c.routes.clone()).unwrap_or_default();
            let raw_ref = RawStationRef {
                name: Some(name),
                routes: &routes,
                coordinates: facility
                    .coordinates
                    .or(context.and_then(|c| c.coordinates)),
                ..Default::default()
            };
            let Some(station_id) = self.resolver.resolve_station(&raw_ref, index) else {
                continue;
            };

            for note in &facility.notes {
                if !text_indicates_disruption(&note.status_text) {
                    continue;
                }
                let kind_label = match note.unit_type {
                    UnitType::Elevator => "Elevator",
                    UnitType::Escalator => "Escalator",
                };
                resolved.push((
                    station_id.clone(),
                    UnitOutage {
                        unit_name: format!("{kind_label} ({name})"),
                        unit_type: note.unit_type,
                        location: name.clone(),
                        symptom: note.status_text.clone(),
                        // Scrapes carry no timestamps; the cycle time is
                        // the best bound we have.
                        out_of_service_since: now,
                        estimated_return: None,
                        updated_at: now,
                    },
                ));
            }
        }
        resolved
    }

    fn normalize_rt_alert(
        &self,
        raw: RawRtAlert,
        index: &StationIndex,
        now: DateTime<Utc>,
    ) -> ServiceAlert {
        let combined = format!("{} {}", raw.header, raw.description);
        let kind = match raw.effect {
            Some(effect) => classify_effect(effect),
            None => classify_text(&combined),
        };

        let mut affected_lines = Vec::new();
        for route in &raw.routes {
            if let LineMatch::Line(line) = self.resolver.resolve_line(route)
                && !affected_lines.contains(&line)
            {
                affected_lines.push(line);
            }
        }

        let mut affected_stations = Vec::new();
        for stop_id in &raw.stop_ids {
            let raw_ref = RawStationRef {
                stop_id: Some(stop_id),
                routes: &raw.routes,
                ..Default::default()
            };
            if let Some(station_id) = self.resolver.resolve_station(&raw_ref, index)
                && !affected_stations.contains(&station_id)
            {
                affected_stations.push(station_id);
            }
        }
        if affected_stations.is_empty() {
            affected_stations = self.resolver.search_text(&combined);
        }

        ServiceAlert {
            id: raw.id,
            kind,
            title: raw.header,
            description: raw.description,
            affected_lines,
            affected_stations,
            posted_at: raw
                .start
                .and_then(|s| Utc.timestamp_opt(s, 0).single())
                .unwrap_or(now),
            expires_at: raw.end.and_then(|e| Utc.timestamp_opt(e, 0).single()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CanonicalStation, FacilityNote};
    use crate::resolve::AgencyTables;
    use async_trait::async_trait;

    struct CannedAdapter {
        records: Vec<RawRecord>,
        fail: bool,
    }

    #[async_trait]
    impl FeedAdapter for CannedAdapter {
        fn source(&self) -> &'static str {
            "canned"
        }

        async fn fetch_raw(&self) -> Result<Vec<RawRecord>, FetchError> {
            if self.fail {
                Err(FetchError::upstream("canned", "status 503"))
            } else {
                Ok(self.records.clone())
            }
        }
    }

    fn ok(records: Vec<RawRecord>) -> Box<CannedAdapter> {
        Box::new(CannedAdapter {
            records,
            fail: false,
        })
    }

    fn failing() -> Box<CannedAdapter> {
        Box::new(CannedAdapter {
            records: vec![],
            fail: true,
        })
    }

    fn wmata_index() -> StationIndex {
        StationIndex::build(&[
            CanonicalStation {
                id: "a01".to_string(),
                system_id: "wmata".to_string(),
                name: "Metro Center".to_string(),
                lines: vec!["red".to_string()],
                coordinates: Some((38.8983, -77.0281)),
            },
            CanonicalStation {
                id: "b01".to_string(),
                system_id: "wmata".to_string(),
                name: "Gallery Pl-Chinatown".to_string(),
                lines: vec!["red".to_string(), "green".to_string()],
                coordinates: Some((38.8983, -77.0219)),
            },
        ])
    }

    fn unit_status(station_name: &str, unit_type: &str) -> RawRecord {
        RawRecord::UnitStatus(RawUnitStatus {
            unit_name: "X01".to_string(),
            unit_type_code: unit_type.to_string(),
            station_code: None,
            station_name: Some(station_name.to_string()),
            location: "platform".to_string(),
            symptom: "Out of Service".to_string(),
            out_of_service_since: None,
            estimated_return: None,
            updated_at: None,
        })
    }

    #[tokio::test]
    async fn test_empty_feed_yields_zeroed_document_not_none() {
        let pipeline = SystemPipeline::new("wmata", Resolver::new(AgencyTables::wmata()))
            .with_adapter(ok(vec![]));
        let data = pipeline.run(&wmata_index(), Utc::now()).await.unwrap();

        assert_eq!(data.summary.total_outages, 0);
        assert_eq!(data.summary.stations_affected, 0);
        assert!(data.outages_by_station.is_empty());
    }

    #[tokio::test]
    async fn test_required_feed_failure_fails_the_cycle() {
        let pipeline = SystemPipeline::new("wmata", Resolver::new(AgencyTables::wmata()))
            .with_adapter(failing());
        assert!(pipeline.run(&wmata_index(), Utc::now()).await.is_err());
    }

    #[tokio::test]
    async fn test_supplementary_feed_failure_degrades() {
        let pipeline = SystemPipeline::new("wmata", Resolver::new(AgencyTables::wmata()))
            .with_adapter(ok(vec![unit_status("Metro Center", "ELEVATOR")]))
            .with_optional_adapter(failing());
        let data = pipeline.run(&wmata_index(), Utc::now()).await.unwrap();

        assert_eq!(data.summary.elevator_outages, 1);
        assert!(data.alerts.is_empty());
    }

    #[tokio::test]
    async fn test_unit_statuses_group_by_station() {
        let pipeline = SystemPipeline::new("wmata", Resolver::new(AgencyTables::wmata()))
            .with_adapter(ok(vec![
                unit_status("Metro Center", "ELEVATOR"),
                unit_status("Metro Center", "ESCALATOR"),
                unit_status("Gallery Place", "ESCALATOR"),
            ]));
        let data = pipeline.run(&wmata_index(), Utc::now()).await.unwrap();

        assert_eq!(data.summary.total_outages, 3);
        assert_eq!(data.summary.elevator_outages, 1);
        assert_eq!(data.summary.escalator_outages, 2);
        assert_eq!(data.summary.stations_affected, 2);
        assert_eq!(data.outages_by_station["a01"].len(), 2);
        assert_eq!(data.outages_by_station["b01"].len(), 1);
    }

    #[tokio::test]
    async fn test_unresolved_station_is_dropped_not_fatal() {
        let pipeline = SystemPipeline::new("wmata", Resolver::new(AgencyTables::wmata()))
            .with_adapter(ok(vec![
                unit_status("Atlantis Central", "ELEVATOR"),
                unit_status("Metro Center", "ELEVATOR"),
            ]));
        let data = pipeline.run(&wmata_index(), Utc::now()).await.unwrap();
        assert_eq!(data.summary.total_outages, 1);
    }

    #[tokio::test]
    async fn test_rt_alert_with_elevator_text_emits_synthetic_outage() {
        let pipeline = SystemPipeline::new("wmata", Resolver::new(AgencyTables::wmata()))
            .with_adapter(ok(vec![RawRecord::RtAlert(RawRtAlert {
                id: "alert-9".to_string(),
                header: "Elevator out of service at Metro Center".to_string(),
                ..Default::default()
            })]));
        let data = pipeline.run(&wmata_index(), Utc::now()).await.unwrap();

        assert_eq!(data.summary.active_alerts, 1);
        assert_eq!(data.alerts[0].affected_stations, vec!["a01".to_string()]);
        assert_eq!(data.summary.elevator_outages, 1);
        assert_eq!(data.summary.escalator_outages, 0);
        assert_eq!(data.outages_by_station["a01"][0].unit_type, UnitType::Elevator);
    }

    #[tokio::test]
    async fn test_facility_notes_with_line_map_context() {
        let resolver = Resolver::new(AgencyTables::seoul());
        let index = StationIndex::build(&[CanonicalStation {
            id: "seoul-jamsil".to_string(),
            system_id: "seoul".to_string(),
            name: "Jamsil".to_string(),
            lines: vec!["line-2".to_string()],
            coordinates: Some((37.5133, 127.1001)),
        }]);

        let line_map_record = RawRecord::Facility(RawFacility {
            station_name: Some("Jamsil".to_string()),
            line_code: Some("2".to_string()),
            coordinates: Some((37.5133, 127.1001)),
            ..Default::default()
        });
        let scraped = RawRecord::Facility(RawFacility {
            station_name: Some("Jamsil".to_string()),
            notes: vec![
                FacilityNote {
                    unit_type: UnitType::Elevator,
                    status_text: "\u{C5D8}\u{B9AC}\u{BCA0}\u{C774}\u{D130}: \u{ACE0}\u{C7A5}"
                        .to_string(),
                },
                FacilityNote {
                    unit_type: UnitType::Escalator,
                    status_text: "\u{C5D0}\u{C2A4}\u{CEEC}\u{B808}\u{C774}\u{D130}: \u{C815}\u{C0C1}"
                        .to_string(),
                },
            ],
            ..Default::default()
        });

        let pipeline = SystemPipeline::new("seoul", resolver)
            .with_adapter(ok(vec![scraped]))
            .with_optional_adapter(ok(vec![line_map_record]));
        let data = pipeline.run(&index, Utc::now()).await.unwrap();

        // Only the 고장 (broken) note becomes an outage.
        assert_eq!(data.summary.elevator_outages, 1);
        assert_eq!(data.summary.escalator_outages, 0);
        assert!(data.outages_by_station.contains_key("seoul-jamsil"));
    }

    #[tokio::test]
    async fn test_alert_effect_classification_flows_through() {
        let pipeline = SystemPipeline::new("mbta", Resolver::new(AgencyTables::mbta()))
            .with_adapter(ok(vec![RawRecord::RtAlert(RawRtAlert {
                id: "alert-1".to_string(),
                header: "Red Line suspended".to_string(),
                effect: Some(gtfs_realtime::alert::Effect::NoService as i32),
                routes: vec!["Red".to_string()],
                stop_ids: vec!["place-pktrm".to_string()],
                ..Default::default()
            })]));
        let index = StationIndex::build(&[CanonicalStation {
            id: "park-street".to_string(),
            system_id: "mbta".to_string(),
            name: "Park Street".to_string(),
            lines: vec!["red".to_string(), "green-b".to_string()],
            coordinates: None,
        }]);
        let data = pipeline.run(&index, Utc::now()).await.unwrap();

        let alert = &data.alerts[0];
        assert_eq!(alert.kind, crate::model::AlertKind::Emergency);
        assert_eq!(alert.affected_lines, vec!["red".to_string()]);
        assert_eq!(alert.affected_stations, vec!["park-street".to_string()]);
    }
}
