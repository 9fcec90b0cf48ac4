//! Alert classification per agency vocabulary kind.

use gtfs_realtime::alert::Effect;

use crate::model::AlertKind;

/// Classifies a GTFS-Realtime `effect` enum value.
///
/// `NO_SERVICE` is an emergency; the service-degrading effects are delays;
/// everything else (including unrecognized future values) is an advisory.
pub fn classify_effect(effect: i32) -> AlertKind {
    match Effect::try_from(effect) {
        Ok(Effect::NoService) => AlertKind::Emergency,
        Ok(Effect::ReducedService)
        | Ok(Effect::SignificantDelays)
        | Ok(Effect::Detour)
        | Ok(Effect::ModifiedService) => AlertKind::Delay,
        _ => AlertKind::Advisory,
    }
}

// Keyword sets for agencies that publish prose instead of a structured
// effect field. Korean terms cover the scraped sources.
const EMERGENCY_KEYWORDS: &[&str] = &[
    "suspend",
    "suspension",
    "no service",
    "service halted",
    "\u{C911}\u{B2E8}",           // 중단
    "\u{C6B4}\u{D589} \u{C911}\u{C9C0}", // 운행 중지
    "\u{BB34}\u{C815}\u{CC28}",   // 무정차
];

const DELAY_KEYWORDS: &[&str] = &[
    "delay",
    "delayed",
    "single tracking",
    "residual",
    "\u{C9C0}\u{C5F0}", // 지연
    "\u{C11C}\u{D589}", // 서행
];

/// Keyword classification of free alert text, native language and English.
/// Suspension vocabulary outranks delay vocabulary; default is advisory.
pub fn classify_text(text: &str) -> AlertKind {
    let lowered = text.to_lowercase();
    if EMERGENCY_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return AlertKind::Emergency;
    }
    if DELAY_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return AlertKind::Delay;
    }
    AlertKind::Advisory
}

/// Severity score above which a non-planned alert counts as a delay.
pub const SEVERITY_DELAY_THRESHOLD: i32 = 5;

const PLANNED_CATEGORIES: &[&str] = &[
    "planned",
    "planned work",
    "special note",
    "\u{ACC4}\u{D68D}",                 // 계획
    "\u{D2B9}\u{BCC4}\u{ACF5}\u{C9C0}", // 특별공지
];

/// Classification for agencies that publish a numeric severity plus a
/// "major alert" flag and a category string.
pub fn classify_severity(score: i32, major_flag: bool, category: Option<&str>) -> AlertKind {
    if major_flag {
        return AlertKind::Emergency;
    }
    let planned = category
        .map(|c| {
            let lowered = c.to_lowercase();
            PLANNED_CATEGORIES.iter().any(|p| lowered.contains(p))
        })
        .unwrap_or(false);
    if score > SEVERITY_DELAY_THRESHOLD && !planned {
        return AlertKind::Delay;
    }
    AlertKind::Advisory
}
