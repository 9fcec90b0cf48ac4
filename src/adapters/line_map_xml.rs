//! XML line-map adapter.
//!
//! The line-map document lists every station on a line with its code and
//! coordinates. The records carry no outage information themselves; the
//! pipeline folds them into scraped facility records so the resolver gets
//! line and coordinate context for disambiguation.

use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::adapters::FeedAdapter;
use crate::error::FetchError;
use crate::fetch::{HttpClient, fetch_bytes};
use crate::model::{RawFacility, RawRecord};

const SOURCE: &str = "line_map_xml";

static STATION_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<station\b([^>]*)/?>").expect("station element pattern"));
static ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\w+)="([^"]*)""#).expect("attribute pattern"));

pub struct LineMapXmlAdapter {
    client: Box<dyn HttpClient>,
    url: String,
}

impl LineMapXmlAdapter {
    pub fn new(client: Box<dyn HttpClient>, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

/// Pulls `<station name=".." line=".." lat=".." lng=".."/>` elements out of
/// a line-map document. Elements with no name attribute are dropped; other
/// missing attributes just leave the record partial.
pub fn parse_line_map(xml: &str) -> Vec<RawRecord> {
    let mut records = Vec::new();

    for element in STATION_ELEMENT.captures_iter(xml) {
        let mut name = None;
        let mut line = None;
        let mut lat = None;
        let mut lng = None;

        for attr in ATTR.captures_iter(&element[1]) {
            let value = attr[2].trim();
            match &attr[1] {
                "name" if !value.is_empty() => name = Some(value.to_string()),
                "line" if !value.is_empty() => line = Some(value.to_string()),
                "lat" => lat = value.parse::<f64>().ok(),
                "lng" => lng = value.parse::<f64>().ok(),
                _ => {}
            }
        }

        let Some(name) = name else {
            continue;
        };

        records.push(RawRecord::Facility(RawFacility {
            station_name: Some(name),
            line_code: line,
            coordinates: lat.zip(lng),
            ..Default::default()
        }));
    }

    records
}

#[async_trait]
impl FeedAdapter for LineMapXmlAdapter {
    fn source(&self) -> &'static str {
        SOURCE
    }

    async fn fetch_raw(&self) -> Result<Vec<RawRecord>, FetchError> {
        let bytes = fetch_bytes(self.client.as_ref(), SOURCE, &self.url).await?;
        let records = parse_line_map(&String::from_utf8_lossy(&bytes));
        if records.is_empty() {
            return Err(FetchError::decode(SOURCE, "no station elements in line map"));
        }
        debug!(source = SOURCE, count = records.len(), "Parsed line map");
        Ok(records)
    }
}
