//! One adapter per upstream source kind. Each adapter owns its fetch and
//! its agency-specific parsing and produces tagged [`RawRecord`]s; it knows
//! nothing about station resolution or the canonical document.

mod elevator_json;
mod facility_scrape;
mod gtfs_alerts;
mod line_map_xml;

pub use elevator_json::{ElevatorJsonAdapter, parse_unit_statuses};
pub use facility_scrape::{DEFAULT_PAGE_DELAY, FacilityScrapeAdapter, parse_station_page};
pub use gtfs_alerts::{GtfsAlertsAdapter, extract_alerts, parse_alert_feed};
pub use line_map_xml::{LineMapXmlAdapter, parse_line_map};

use async_trait::async_trait;

use crate::error::FetchError;
use crate::model::RawRecord;

/// A single upstream feed. Implementations are independently retryable and
/// never take down a sibling: the pipeline isolates each adapter's failure.
#[async_trait]
pub trait FeedAdapter: Send + Sync {
    /// Short source tag used in logs and error messages.
    fn source(&self) -> &'static str;

    async fn fetch_raw(&self) -> Result<Vec<RawRecord>, FetchError>;
}
