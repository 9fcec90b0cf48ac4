//! GTFS-Realtime service-alert adapter.
//!
//! Fetches the agency's binary alert feed and lifts each `entity[].alert`
//! into a [`RawRtAlert`], keeping the first translation of the header and
//! description, the effect enum value, the first active period, and the
//! informed-entity route/stop references the resolver matches on.

use async_trait::async_trait;
use gtfs_realtime::{FeedMessage, TranslatedString};
use prost::Message;
use tracing::debug;

use crate::adapters::FeedAdapter;
use crate::error::FetchError;
use crate::fetch::{HttpClient, fetch_bytes};
use crate::model::{RawRecord, RawRtAlert};

const SOURCE: &str = "gtfs_alerts";

pub struct GtfsAlertsAdapter {
    client: Box<dyn HttpClient>,
    url: String,
}

impl GtfsAlertsAdapter {
    pub fn new(client: Box<dyn HttpClient>, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

fn first_translation(text: &Option<TranslatedString>) -> String {
    text.as_ref()
        .and_then(|ts| ts.translation.first())
        .map(|t| t.text.clone())
        .unwrap_or_default()
}

/// Decodes a protobuf feed body into alert records. Entities without an
/// alert payload (vehicle positions, trip updates) are ignored.
pub fn parse_alert_feed(bytes: &[u8]) -> Result<Vec<RawRecord>, FetchError> {
    let feed = FeedMessage::decode(bytes).map_err(|e| FetchError::decode(SOURCE, e.to_string()))?;
    Ok(extract_alerts(&feed))
}

pub fn extract_alerts(feed: &FeedMessage) -> Vec<RawRecord> {
    let mut records = Vec::new();
    for entity in &feed.entity {
        let Some(alert) = &entity.alert else {
            continue;
        };

        let period = alert.active_period.first();
        let mut routes = Vec::new();
        let mut stop_ids = Vec::new();
        for informed in &alert.informed_entity {
            if let Some(route_id) = &informed.route_id
                && !route_id.is_empty()
            {
                routes.push(route_id.clone());
            }
            if let Some(stop_id) = &informed.stop_id
                && !stop_id.is_empty()
            {
                stop_ids.push(stop_id.clone());
            }
        }

        records.push(RawRecord::RtAlert(RawRtAlert {
            id: entity.id.clone(),
            header: first_translation(&alert.header_text),
            description: first_translation(&alert.description_text),
            effect: alert.effect,
            start: period.and_then(|p| p.start).map(|s| s as i64),
            end: period.and_then(|p| p.end).map(|e| e as i64),
            routes,
            stop_ids,
        }));
    }
    records
}

#[async_trait]
impl FeedAdapter for GtfsAlertsAdapter {
    fn source(&self) -> &'static str {
        SOURCE
    }

    async fn fetch_raw(&self) -> Result<Vec<RawRecord>, FetchError> {
        let bytes = fetch_bytes(self.client.as_ref(), SOURCE, &self.url).await?;
        let records = parse_alert_feed(&bytes)?;
        debug!(source = SOURCE, count = records.len(), "Extracted alert entities");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gtfs_realtime::{
        Alert, EntitySelector, FeedEntity, FeedHeader, TimeRange, translated_string::Translation,
    };

    fn translated(text: &str) -> Option<TranslatedString> {
        Some(TranslatedString {
            translation: vec![Translation {
                text: text.to_string(),
                language: Some("en".to_string()),
            }],
        })
    }

    fn feed_with(entities: Vec<FeedEntity>) -> FeedMessage {
        FeedMessage {
            header: FeedHeader {
                gtfs_realtime_version: "2.0".to_string(),
                timestamp: Some(1_700_000_000),
                ..Default::default()
            },
            entity: entities,
        }
    }

    #[test]
    fn test_extracts_alert_fields() {
        let feed = feed_with(vec![FeedEntity {
            id: "alert-42".to_string(),
            alert: Some(Alert {
                header_text: translated("Red Line suspended"),
                description_text: translated("Shuttle buses replace trains"),
                effect: Some(gtfs_realtime::alert::Effect::NoService as i32),
                active_period: vec![TimeRange {
                    start: Some(1_700_000_000),
                    end: Some(1_700_010_000),
                }],
                informed_entity: vec![
                    EntitySelector {
                        route_id: Some("Red".to_string()),
                        ..Default::default()
                    },
                    EntitySelector {
                        stop_id: Some("place-pktrm".to_string()),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }),
            ..Default::default()
        }]);

        let records = extract_alerts(&feed);
        assert_eq!(records.len(), 1);
        let RawRecord::RtAlert(alert) = &records[0] else {
            panic!("expected an alert record");
        };
        assert_eq!(alert.id, "alert-42");
        assert_eq!(alert.header, "Red Line suspended");
        assert_eq!(alert.routes, vec!["Red".to_string()]);
        assert_eq!(alert.stop_ids, vec!["place-pktrm".to_string()]);
        assert_eq!(alert.start, Some(1_700_000_000));
    }

    #[test]
    fn test_non_alert_entities_ignored() {
        let feed = feed_with(vec![FeedEntity {
            id: "vehicle-1".to_string(),
            ..Default::default()
        }]);
        assert!(extract_alerts(&feed).is_empty());
    }

    #[test]
    fn test_missing_translations_become_empty_strings() {
        let feed = feed_with(vec![FeedEntity {
            id: "alert-1".to_string(),
            alert: Some(Alert::default()),
            ..Default::default()
        }]);
        let records = extract_alerts(&feed);
        let RawRecord::RtAlert(alert) = &records[0] else {
            panic!("expected an alert record");
        };
        assert_eq!(alert.header, "");
        assert_eq!(alert.effect, None);
        assert!(alert.routes.is_empty());
    }

    #[test]
    fn test_round_trip_through_decode() {
        let feed = feed_with(vec![FeedEntity {
            id: "alert-7".to_string(),
            alert: Some(Alert {
                header_text: translated("Elevator out of service"),
                ..Default::default()
            }),
            ..Default::default()
        }]);
        let bytes = feed.encode_to_vec();
        let records = parse_alert_feed(&bytes).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_invalid_protobuf_is_decode_error() {
        assert!(matches!(
            parse_alert_feed(&[0xFF, 0xFE, 0x00, 0x01]),
            Err(FetchError::Decode { .. })
        ));
    }
}
