//! Environment-driven engine configuration.
//!
//! Each system registers only when its required settings are present; a
//! half-configured system is left out (its read API serves `None`) without
//! affecting the others.

use std::time::Duration;

use tracing::{info, warn};

use crate::adapters::{
    ElevatorJsonAdapter, FacilityScrapeAdapter, GtfsAlertsAdapter, LineMapXmlAdapter,
};
use crate::aggregator::{IncidentAggregator, SystemClock};
use crate::fetch::{
    BasicClient,
    auth::{ApiKey, UrlParam},
};
use crate::pipeline::SystemPipeline;
use crate::resolve::{AgencyTables, Resolver};
use crate::stations::JsonStationStore;

const DEFAULT_WMATA_INCIDENTS_URL: &str =
    "https://api.wmata.com/Incidents.svc/json/ElevatorIncidents";
const DEFAULT_WMATA_ALERTS_URL: &str = "https://api.wmata.com/gtfs/rail-gtfsrt-alerts.pb";
const DEFAULT_MBTA_ALERTS_URL: &str = "https://cdn.mbta.com/realtime/Alerts.pb";

#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: String,
    pub scrape_delay: Duration,
    pub cache_ttl: Option<chrono::Duration>,
    pub wmata_api_key: Option<String>,
    pub wmata_incidents_url: String,
    pub wmata_alerts_url: String,
    pub mbta_alerts_url: Option<String>,
    pub seoul_facility_pages: Vec<String>,
    pub seoul_line_map_url: Option<String>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl Settings {
    pub fn from_env() -> Self {
        let scrape_delay = env_var("SCRAPE_DELAY_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(crate::adapters::DEFAULT_PAGE_DELAY);

        Settings {
            data_dir: env_var("STATION_DATA_DIR").unwrap_or_else(|| "data".to_string()),
            scrape_delay,
            cache_ttl: env_var("INCIDENT_CACHE_TTL_SECS")
                .and_then(|v| v.parse::<i64>().ok())
                .map(chrono::Duration::seconds),
            wmata_api_key: env_var("WMATA_API_KEY"),
            wmata_incidents_url: env_var("WMATA_INCIDENTS_URL")
                .unwrap_or_else(|| DEFAULT_WMATA_INCIDENTS_URL.to_string()),
            wmata_alerts_url: env_var("WMATA_ALERTS_URL")
                .unwrap_or_else(|| DEFAULT_WMATA_ALERTS_URL.to_string()),
            mbta_alerts_url: env_var("MBTA_ALERTS_URL")
                .or_else(|| Some(DEFAULT_MBTA_ALERTS_URL.to_string())),
            seoul_facility_pages: env_var("SEOUL_FACILITY_PAGES")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_default(),
            seoul_line_map_url: env_var("SEOUL_LINE_MAP_URL"),
        }
    }

    /// Builds the live aggregator with every fully-configured system
    /// registered.
    pub fn build_aggregator(&self) -> IncidentAggregator {
        let mut aggregator = IncidentAggregator::new(
            Box::new(JsonStationStore::new(&self.data_dir)),
            Box::new(SystemClock),
        );
        if let Some(ttl) = self.cache_ttl {
            aggregator = aggregator.with_ttl(ttl);
        }

        match &self.wmata_api_key {
            Some(key) => {
                // The incidents API takes its key as a query parameter, the
                // GTFS-RT endpoint as a header.
                let incidents_client = UrlParam::new(
                    BasicClient::with_timeout(Duration::from_secs(30)),
                    "api_key",
                    key,
                );
                let alerts_client = ApiKey::new(
                    BasicClient::with_timeout(Duration::from_secs(60)),
                    "api_key",
                    key,
                );
                match alerts_client {
                    Some(alerts_client) => {
                        let pipeline =
                            SystemPipeline::new("wmata", Resolver::new(AgencyTables::wmata()))
                                .with_adapter(Box::new(ElevatorJsonAdapter::new(
                                    Box::new(incidents_client),
                                    &self.wmata_incidents_url,
                                )))
                                .with_optional_adapter(Box::new(GtfsAlertsAdapter::new(
                                    Box::new(alerts_client),
                                    &self.wmata_alerts_url,
                                )));
                        aggregator = aggregator.with_system(pipeline);
                    }
                    None => warn!("WMATA_API_KEY is not a valid header value, wmata not registered"),
                }
            }
            None => info!("WMATA_API_KEY not set, wmata not registered"),
        }

        match &self.mbta_alerts_url {
            Some(url) => {
                let pipeline = SystemPipeline::new("mbta", Resolver::new(AgencyTables::mbta()))
                    .with_adapter(Box::new(GtfsAlertsAdapter::new(
                        Box::new(BasicClient::with_timeout(Duration::from_secs(60))),
                        url,
                    )));
                aggregator = aggregator.with_system(pipeline);
            }
            None => info!("MBTA_ALERTS_URL not set, mbta not registered"),
        }

        if self.seoul_facility_pages.is_empty() {
            info!("SEOUL_FACILITY_PAGES not set, seoul not registered");
        } else {
            let mut pipeline = SystemPipeline::new("seoul", Resolver::new(AgencyTables::seoul()))
                .with_adapter(Box::new(FacilityScrapeAdapter::new(
                    Box::new(BasicClient::with_timeout(Duration::from_secs(120))),
                    self.seoul_facility_pages.clone(),
                    self.scrape_delay,
                )));
            if let Some(line_map_url) = &self.seoul_line_map_url {
                pipeline = pipeline.with_optional_adapter(Box::new(LineMapXmlAdapter::new(
                    Box::new(BasicClient::with_timeout(Duration::from_secs(30))),
                    line_map_url,
                )));
            }
            aggregator = aggregator.with_system(pipeline);
        }

        aggregator
    }
}
