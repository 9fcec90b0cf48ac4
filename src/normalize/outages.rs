//! Equipment-outage inference from unstructured alert text.
//!
//! An outage is inferred when the combined header+description mentions an
//! equipment kind (elevator/escalator, either language) together with a
//! disruption term (out of service, unavailable, closed, outage, 고장).
//! One synthetic outage is emitted per equipment kind per station the
//! resolver attached to the alert, so an alert naming both kinds yields
//! both entries. The co-occurrence test is a known-lossy heuristic: it can
//! over- and under-report, and carries no confidence signal.

use chrono::{DateTime, Utc};

use crate::model::{ServiceAlert, UnitOutage, UnitType};

const ELEVATOR_KEYWORDS: &[&str] = &[
    "elevator",
    "lift",
    "\u{C5D8}\u{B9AC}\u{BCA0}\u{C774}\u{D130}", // 엘리베이터
];

const ESCALATOR_KEYWORDS: &[&str] = &[
    "escalator",
    "\u{C5D0}\u{C2A4}\u{CEEC}\u{B808}\u{C774}\u{D130}", // 에스컬레이터
];

const DISRUPTION_KEYWORDS: &[&str] = &[
    "out of service",
    "out-of-service",
    "unavailable",
    "closed",
    "outage",
    "not working",
    "\u{ACE0}\u{C7A5}", // 고장
    "\u{C911}\u{C9C0}", // 중지
];

fn mentions(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// Whether a facility status line reads as "this unit is down". Shared
/// with the scraped-facility pipeline so both paths agree on what counts
/// as a disruption.
pub fn text_indicates_disruption(text: &str) -> bool {
    mentions(&text.to_lowercase(), DISRUPTION_KEYWORDS)
}

/// Emits synthetic [`UnitOutage`] entries for an alert whose text implies
/// broken equipment, keyed by the alert's already-resolved stations.
/// Returns an empty list when no station was resolved or the text lacks
/// either keyword half.
pub fn infer_unit_outages(alert: &ServiceAlert, now: DateTime<Utc>) -> Vec<(String, UnitOutage)> {
    let text = format!("{} {}", alert.title, alert.description).to_lowercase();

    if !mentions(&text, DISRUPTION_KEYWORDS) {
        return Vec::new();
    }

    let mut kinds = Vec::new();
    if mentions(&text, ELEVATOR_KEYWORDS) {
        kinds.push(UnitType::Elevator);
    }
    if mentions(&text, ESCALATOR_KEYWORDS) {
        kinds.push(UnitType::Escalator);
    }

    let mut outages = Vec::new();
    for station_id in &alert.affected_stations {
        for &unit_type in &kinds {
            let kind_label = match unit_type {
                UnitType::Elevator => "Elevator",
                UnitType::Escalator => "Escalator",
            };
            outages.push((
                station_id.clone(),
                UnitOutage {
                    unit_name: format!("{kind_label} ({})", alert.id),
                    unit_type,
                    location: alert.title.clone(),
                    symptom: "Reported out of service".to_string(),
                    out_of_service_since: alert.posted_at,
                    estimated_return: alert.expires_at,
                    updated_at: now,
                },
            ));
        }
    }
    outages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AlertKind;

    fn alert(title: &str, description: &str, stations: &[&str]) -> ServiceAlert {
        ServiceAlert {
            id: "alert-1".to_string(),
            kind: AlertKind::Advisory,
            title: title.to_string(),
            description: description.to_string(),
            affected_lines: vec![],
            affected_stations: stations.iter().map(|s| s.to_string()).collect(),
            posted_at: Utc::now(),
            expires_at: None,
        }
    }

    #[test]
    fn test_elevator_outage_single_station() {
        let outages = infer_unit_outages(
            &alert("Elevator out of service at Main St", "", &["main-st"]),
            Utc::now(),
        );
        assert_eq!(outages.len(), 1);
        assert_eq!(outages[0].0, "main-st");
        assert_eq!(outages[0].1.unit_type, UnitType::Elevator);
    }

    #[test]
    fn test_both_kinds_emit_both_entries() {
        let outages = infer_unit_outages(
            &alert(
                "Facility outage",
                "Elevator and escalator out of service at the north entrance",
                &["main-st"],
            ),
            Utc::now(),
        );
        let kinds: Vec<UnitType> = outages.iter().map(|(_, o)| o.unit_type).collect();
        assert_eq!(kinds, vec![UnitType::Elevator, UnitType::Escalator]);
    }

    #[test]
    fn test_equipment_without_disruption_is_not_an_outage() {
        let outages = infer_unit_outages(
            &alert("New elevator now open at Main St", "", &["main-st"]),
            Utc::now(),
        );
        assert!(outages.is_empty());
    }

    #[test]
    fn test_disruption_without_equipment_is_not_an_outage() {
        let outages = infer_unit_outages(
            &alert("Station temporarily closed", "", &["main-st"]),
            Utc::now(),
        );
        assert!(outages.is_empty());
    }

    #[test]
    fn test_no_resolved_stations_emits_nothing() {
        let outages = infer_unit_outages(&alert("Elevator out of service", "", &[]), Utc::now());
        assert!(outages.is_empty());
    }

    #[test]
    fn test_korean_keywords() {
        // 엘리베이터 고장 at one station
        let outages = infer_unit_outages(
            &alert(
                "\u{C5D8}\u{B9AC}\u{BCA0}\u{C774}\u{D130} \u{ACE0}\u{C7A5}",
                "",
                &["seoul-station"],
            ),
            Utc::now(),
        );
        assert_eq!(outages.len(), 1);
        assert_eq!(outages[0].1.unit_type, UnitType::Elevator);
    }

    #[test]
    fn test_multiple_stations_each_get_an_entry() {
        let outages = infer_unit_outages(
            &alert("Escalators unavailable", "", &["a01", "b01"]),
            Utc::now(),
        );
        assert_eq!(outages.len(), 2);
        assert!(outages.iter().all(|(_, o)| o.unit_type == UnitType::Escalator));
    }
}
