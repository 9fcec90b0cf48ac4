//! End-to-end tests: raw feed bytes through parsing, resolution,
//! normalization, and the aggregator's cache policy, with fake transports.

use async_trait::async_trait;
use chrono::Utc;
use prost::Message;

use transit_incidents::adapters::FeedAdapter;
use transit_incidents::aggregator::{Clock, IncidentAggregator};
use transit_incidents::adapters::{parse_alert_feed, parse_unit_statuses};
use transit_incidents::error::FetchError;
use transit_incidents::model::{CanonicalStation, RawRecord, UnitType};
use transit_incidents::pipeline::SystemPipeline;
use transit_incidents::resolve::{AgencyTables, Resolver};
use transit_incidents::stations::MemoryStationStore;

struct WallClock;

impl Clock for WallClock {
    fn now(&self) -> chrono::DateTime<Utc> {
        Utc::now()
    }
}

/// Serves a canned body through the real parser for one source kind.
struct CannedFeed {
    source: &'static str,
    body: Vec<u8>,
}

#[async_trait]
impl FeedAdapter for CannedFeed {
    fn source(&self) -> &'static str {
        self.source
    }

    async fn fetch_raw(&self) -> Result<Vec<RawRecord>, FetchError> {
        match self.source {
            "elevator_json" => parse_unit_statuses(&self.body),
            "gtfs_alerts" => parse_alert_feed(&self.body),
            other => Err(FetchError::upstream(other, "unknown canned source")),
        }
    }
}

fn wmata_stations() -> Vec<CanonicalStation> {
    vec![
        CanonicalStation {
            id: "a01".to_string(),
            system_id: "wmata".to_string(),
            name: "Metro Center".to_string(),
            lines: vec!["red".to_string(), "blue".to_string()],
            coordinates: Some((38.8983, -77.0281)),
        },
        CanonicalStation {
            id: "b01".to_string(),
            system_id: "wmata".to_string(),
            name: "Gallery Pl-Chinatown".to_string(),
            lines: vec!["red".to_string(), "green".to_string()],
            coordinates: Some((38.8983, -77.0219)),
        },
    ]
}

fn alert_feed_bytes(header: &str, effect: Option<i32>, route: Option<&str>) -> Vec<u8> {
    let feed = gtfs_realtime::FeedMessage {
        header: gtfs_realtime::FeedHeader {
            gtfs_realtime_version: "2.0".to_string(),
            timestamp: Some(1_700_000_000),
            ..Default::default()
        },
        entity: vec![gtfs_realtime::FeedEntity {
            id: "alert-1".to_string(),
            alert: Some(gtfs_realtime::Alert {
                header_text: Some(gtfs_realtime::TranslatedString {
                    translation: vec![gtfs_realtime::translated_string::Translation {
                        text: header.to_string(),
                        language: Some("en".to_string()),
                    }],
                }),
                effect,
                informed_entity: route
                    .map(|r| {
                        vec![gtfs_realtime::EntitySelector {
                            route_id: Some(r.to_string()),
                            ..Default::default()
                        }]
                    })
                    .unwrap_or_default(),
                ..Default::default()
            }),
            ..Default::default()
        }],
    };
    feed.encode_to_vec()
}

fn aggregator(pipeline: SystemPipeline) -> IncidentAggregator {
    let store = MemoryStationStore::new().with_system("wmata", wmata_stations());
    IncidentAggregator::new(Box::new(store), Box::new(WallClock)).with_system(pipeline)
}

#[tokio::test]
async fn test_full_pipeline_json_and_protobuf_sources() {
    let incidents_body = br#"{
        "ElevatorIncidents": [{
            "UnitName": "A01E01",
            "UnitType": "ELEVATOR",
            "StationCode": "PF_A01_C",
            "StationName": "Metro Center",
            "LocationDescription": "Street to mezzanine",
            "SymptomDescription": "Service Call",
            "DateOutOfServ": "2025-03-14T07:22:00",
            "DateUpdated": "2025-03-14T07:25:00"
        }]
    }"#;
    let alerts_body = alert_feed_bytes(
        "Escalator unavailable at Gallery Place",
        None,
        Some("RED"),
    );

    let pipeline = SystemPipeline::new("wmata", Resolver::new(AgencyTables::wmata()))
        .with_adapter(Box::new(CannedFeed {
            source: "elevator_json",
            body: incidents_body.to_vec(),
        }))
        .with_optional_adapter(Box::new(CannedFeed {
            source: "gtfs_alerts",
            body: alerts_body,
        }));

    let data = aggregator(pipeline).get_incidents("wmata").await.unwrap();

    // One real elevator outage plus one synthetic escalator outage
    // inferred from the alert text.
    assert_eq!(data.summary.elevator_outages, 1);
    assert_eq!(data.summary.escalator_outages, 1);
    assert_eq!(data.summary.total_outages, 2);
    assert_eq!(data.summary.stations_affected, 2);
    assert_eq!(data.summary.active_alerts, 1);

    assert_eq!(data.outages_by_station["a01"][0].unit_name, "A01E01");
    assert_eq!(data.outages_by_station["b01"][0].unit_type, UnitType::Escalator);
    assert_eq!(data.alerts[0].affected_lines, vec!["red".to_string()]);

    // Counting invariants hold on the assembled document.
    assert_eq!(
        data.summary.total_outages,
        data.summary.elevator_outages + data.summary.escalator_outages
    );
    assert_eq!(data.summary.stations_affected, data.outages_by_station.len());
}

#[tokio::test]
async fn test_no_service_effect_is_emergency_end_to_end() {
    let alerts_body = alert_feed_bytes(
        "Red Line suspended",
        Some(gtfs_realtime::alert::Effect::NoService as i32),
        Some("RED"),
    );
    let pipeline = SystemPipeline::new("wmata", Resolver::new(AgencyTables::wmata()))
        .with_adapter(Box::new(CannedFeed {
            source: "gtfs_alerts",
            body: alerts_body,
        }));

    let data = aggregator(pipeline).get_incidents("wmata").await.unwrap();
    assert_eq!(
        data.alerts[0].kind,
        transit_incidents::model::AlertKind::Emergency
    );
}

#[tokio::test]
async fn test_empty_upstream_array_yields_zeroed_document() {
    let pipeline = SystemPipeline::new("wmata", Resolver::new(AgencyTables::wmata()))
        .with_adapter(Box::new(CannedFeed {
            source: "elevator_json",
            body: br#"{"ElevatorIncidents": []}"#.to_vec(),
        }));

    let data = aggregator(pipeline).get_incidents("wmata").await.unwrap();
    assert_eq!(data.summary.total_outages, 0);
    assert!(data.outages_by_station.is_empty());
    assert!(data.alerts.is_empty());
}

#[tokio::test]
async fn test_undecodable_feed_serves_none_without_panicking() {
    let pipeline = SystemPipeline::new("wmata", Resolver::new(AgencyTables::wmata()))
        .with_adapter(Box::new(CannedFeed {
            source: "elevator_json",
            body: b"<html>maintenance page</html>".to_vec(),
        }));

    assert!(aggregator(pipeline).get_incidents("wmata").await.is_none());
}

#[tokio::test]
async fn test_refresh_all_aggregate_flag() {
    let good = SystemPipeline::new("wmata", Resolver::new(AgencyTables::wmata())).with_adapter(
        Box::new(CannedFeed {
            source: "elevator_json",
            body: br#"{"ElevatorIncidents": []}"#.to_vec(),
        }),
    );
    let agg = aggregator(good);

    let report = agg.refresh_all().await;
    assert!(report.all_succeeded);
    assert_eq!(report.succeeded.len(), 1);
    assert!(report.failed.is_empty());
}
