//! The long-lived aggregator that owns all mutable engine state: the
//! per-system incident cache, the lazily-built station indexes, and the
//! registered pipelines. Clock and station store are injected so tests can
//! run with fake time and canned reference data.
//!
//! The read API never errors: every failure path lands on "previous cached
//! document, or nothing".

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::model::{IncidentData, IncidentSummary, UnitOutage};
use crate::pipeline::SystemPipeline;
use crate::stations::{StationIndex, StationStore};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct CacheEntry {
    data: IncidentData,
    fetched_at: DateTime<Utc>,
}

/// Outcome of one forced refresh of one system.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshSummary {
    pub system_id: String,
    pub fetched_at: DateTime<Utc>,
    pub summary: IncidentSummary,
}

/// Outcome of a bulk refresh. `all_succeeded` distinguishes a clean sweep
/// from partial success; per-system entries stay independent either way.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub succeeded: BTreeMap<String, RefreshSummary>,
    pub failed: BTreeMap<String, String>,
    pub all_succeeded: bool,
}

pub struct IncidentAggregator {
    pipelines: HashMap<String, SystemPipeline>,
    store: Box<dyn StationStore>,
    clock: Box<dyn Clock>,
    ttl: Duration,
    cache: Mutex<HashMap<String, CacheEntry>>,
    indexes: Mutex<HashMap<String, Arc<StationIndex>>>,
}

impl IncidentAggregator {
    pub fn new(store: Box<dyn StationStore>, clock: Box<dyn Clock>) -> Self {
        Self {
            pipelines: HashMap::new(),
            store,
            clock,
            ttl: Duration::minutes(5),
            cache: Mutex::new(HashMap::new()),
            indexes: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_system(mut self, pipeline: SystemPipeline) -> Self {
        self.pipelines.insert(pipeline.system_id().to_string(), pipeline);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn system_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.pipelines.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Serves the per-system incident document: cached copy while fresh,
    /// refetched when stale, previous copy when the refetch fails, `None`
    /// for unknown systems or when there is nothing to fall back on.
    pub async fn get_incidents(&self, system_id: &str) -> Option<IncidentData> {
        let pipeline = self.pipelines.get(system_id)?;
        let now = self.clock.now();

        {
            let cache = self.cache.lock().expect("cache lock");
            if let Some(entry) = cache.get(system_id)
                && now - entry.fetched_at < self.ttl
            {
                debug!(system_id, "Cache hit");
                return Some(entry.data.clone());
            }
        }

        match self.run_pipeline(pipeline).await {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(system_id, error = %e, "Fetch cycle failed, falling back to cache");
                let cache = self.cache.lock().expect("cache lock");
                cache.get(system_id).map(|entry| entry.data.clone())
            }
        }
    }

    /// Outages at one station. Empty when the system is unknown, the fetch
    /// failed with no fallback, or the station simply has none.
    pub async fn get_station_outages(&self, system_id: &str, station_id: &str) -> Vec<UnitOutage> {
        self.get_incidents(system_id)
            .await
            .and_then(|data| data.outages_by_station.get(station_id).cloned())
            .unwrap_or_default()
    }

    /// Operator-facing refresh: bypasses the TTL and reports the error
    /// instead of masking it with cache fallback.
    pub async fn force_refresh(&self, system_id: &str) -> Result<RefreshSummary, FetchError> {
        let pipeline = self.pipelines.get(system_id).ok_or_else(|| {
            FetchError::ConfigurationMissing(format!("unknown system `{system_id}`"))
        })?;

        let data = self.run_pipeline(pipeline).await?;
        Ok(RefreshSummary {
            system_id: system_id.to_string(),
            fetched_at: data.fetched_at,
            summary: data.summary,
        })
    }

    /// Refreshes every registered system concurrently, settle-all: each
    /// system's outcome is reported on its own and one failure never blocks
    /// or invalidates a sibling's result.
    pub async fn refresh_all(&self) -> RefreshReport {
        let ids = self.system_ids();
        let outcomes =
            futures::future::join_all(ids.iter().map(|id| self.force_refresh(id))).await;

        let mut succeeded = BTreeMap::new();
        let mut failed = BTreeMap::new();
        for (id, outcome) in ids.into_iter().zip(outcomes) {
            match outcome {
                Ok(summary) => {
                    succeeded.insert(id, summary);
                }
                Err(e) => {
                    failed.insert(id, e.to_string());
                }
            }
        }

        let all_succeeded = failed.is_empty();
        info!(
            succeeded = succeeded.len(),
            failed = failed.len(),
            all_succeeded,
            "Bulk refresh complete"
        );
        RefreshReport {
            succeeded,
            failed,
            all_succeeded,
        }
    }

    async fn run_pipeline(&self, pipeline: &SystemPipeline) -> Result<IncidentData, FetchError> {
        let system_id = pipeline.system_id().to_string();
        let index = self.index_for(&system_id)?;
        let data = pipeline.run(&index, self.clock.now()).await?;

        let mut cache = self.cache.lock().expect("cache lock");
        cache.insert(
            system_id,
            CacheEntry {
                data: data.clone(),
                fetched_at: data.fetched_at,
            },
        );
        Ok(data)
    }

    /// Station index for one system, built on first access from the static
    /// store and kept for the process lifetime.
    fn index_for(&self, system_id: &str) -> Result<Arc<StationIndex>, FetchError> {
        {
            let indexes = self.indexes.lock().expect("index lock");
            if let Some(index) = indexes.get(system_id) {
                return Ok(index.clone());
            }
        }

        let stations = self.store.load_stations(system_id)?;
        let index = Arc::new(StationIndex::build(&stations));
        info!(system_id, stations = index.len(), "Station index built");

        let mut indexes = self.indexes.lock().expect("index lock");
        Ok(indexes
            .entry(system_id.to_string())
            .or_insert(index)
            .clone())
    }
}
