//! Scraped-HTML facility adapter for agencies without a machine-readable
//! equipment feed.
//!
//! Station pages are fetched sequentially with a configurable pause so the
//! scrape never hammers the origin. Extraction is regex-based over station
//! blocks; a block missing pieces yields a partial record and a block that
//! defies parsing entirely is skipped, never fatal. Facility lines are
//! matched against Korean and English keyword sets.

use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

use crate::adapters::FeedAdapter;
use crate::error::FetchError;
use crate::fetch::{HttpClient, fetch_bytes};
use crate::model::{FacilityNote, RawFacility, RawRecord, UnitType};

const SOURCE: &str = "facility_scrape";

pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(500);

static STATION_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<section[^>]*class="[^"]*station[^"]*"[^>]*>(.*?)</section>"#)
        .expect("station block pattern")
});
static STATION_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<h3[^>]*>(?:\s*<a[^>]*>)?\s*([^<]+?)\s*<").expect("station name pattern")
});
static COORDINATES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"data-lat="(-?[0-9.]+)"\s+data-lng="(-?[0-9.]+)""#).expect("coordinate pattern")
});
static FACILITY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<li[^>]*class="[^"]*facility[^"]*"[^>]*>\s*([^<]+?)\s*</li>"#)
        .expect("facility line pattern")
});

const ELEVATOR_WORDS: &[&str] = &["elevator", "\u{C5D8}\u{B9AC}\u{BCA0}\u{C774}\u{D130}"];
const ESCALATOR_WORDS: &[&str] = &["escalator", "\u{C5D0}\u{C2A4}\u{CEEC}\u{B808}\u{C774}\u{D130}"];
const ACCESSIBLE_WORDS: &[&str] = &[
    "wheelchair",
    "accessible",
    "\u{D720}\u{CCB4}\u{C5B4}", // 휠체어
    "\u{C7A5}\u{C560}\u{C778}", // 장애인
];
const RESTROOM_WORDS: &[&str] = &["restroom", "toilet", "\u{D654}\u{C7A5}\u{C2E4}"]; // 화장실

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

pub struct FacilityScrapeAdapter {
    client: Box<dyn HttpClient>,
    page_urls: Vec<String>,
    page_delay: Duration,
}

impl FacilityScrapeAdapter {
    pub fn new(client: Box<dyn HttpClient>, page_urls: Vec<String>, page_delay: Duration) -> Self {
        Self {
            client,
            page_urls,
            page_delay,
        }
    }
}

/// Extracts facility records from one scraped page. Blocks without even a
/// station name are dropped; everything else is kept as a partial record.
pub fn parse_station_page(html: &str) -> Vec<RawRecord> {
    let mut records = Vec::new();

    for block in STATION_BLOCK.captures_iter(html) {
        let body = &block[1];

        let station_name = STATION_NAME
            .captures(body)
            .map(|c| c[1].trim().to_string())
            .filter(|name| !name.is_empty());
        let Some(station_name) = station_name else {
            warn!(source = SOURCE, "Skipping station block without a name");
            continue;
        };

        let coordinates = COORDINATES.captures(body).and_then(|c| {
            let lat = c[1].parse::<f64>().ok()?;
            let lng = c[2].parse::<f64>().ok()?;
            Some((lat, lng))
        });

        let mut facility = RawFacility {
            station_name: Some(station_name),
            coordinates,
            ..Default::default()
        };

        for line in FACILITY_LINE.captures_iter(body) {
            let text = line[1].trim().to_string();
            let lowered = text.to_lowercase();
            if contains_any(&lowered, ELEVATOR_WORDS) {
                facility.notes.push(FacilityNote {
                    unit_type: UnitType::Elevator,
                    status_text: text.clone(),
                });
            }
            if contains_any(&lowered, ESCALATOR_WORDS) {
                facility.notes.push(FacilityNote {
                    unit_type: UnitType::Escalator,
                    status_text: text.clone(),
                });
            }
            if contains_any(&lowered, ACCESSIBLE_WORDS) {
                facility.accessible = true;
            }
            if contains_any(&lowered, RESTROOM_WORDS) {
                facility.restroom = true;
            }
        }

        records.push(RawRecord::Facility(facility));
    }

    records
}

#[async_trait]
impl FeedAdapter for FacilityScrapeAdapter {
    fn source(&self) -> &'static str {
        SOURCE
    }

    async fn fetch_raw(&self) -> Result<Vec<RawRecord>, FetchError> {
        let mut records = Vec::new();
        let mut last_error = None;

        for (i, url) in self.page_urls.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.page_delay).await;
            }
            match fetch_bytes(self.client.as_ref(), SOURCE, url).await {
                Ok(bytes) => {
                    let page = String::from_utf8_lossy(&bytes);
                    let mut parsed = parse_station_page(&page);
                    debug!(source = SOURCE, url, count = parsed.len(), "Parsed station page");
                    records.append(&mut parsed);
                }
                Err(e) => {
                    warn!(source = SOURCE, url, error = %e, "Station page fetch failed, continuing");
                    last_error = Some(e);
                }
            }
        }

        // Only a total wipeout fails the adapter; partial scrapes stand.
        if records.is_empty()
            && let Some(e) = last_error
        {
            return Err(e);
        }
        Ok(records)
    }
}
