//! Layered station/line resolution.
//!
//! Strategy order, first hit wins: structured stop id, alias rewrite,
//! normalized-name index, line-overlap scoring with geographic tie-break,
//! free-text pattern search. Resolution never fails loudly; a reference
//! nobody can match is dropped with a debug log, because wrongly attributing
//! an outage to the wrong station is worse than under-reporting it.

use geo::{Distance, Haversine, Point};
use std::collections::HashSet;
use tracing::debug;

use crate::resolve::tables::{AgencyTables, LineMatch};
use crate::stations::{StationIndex, StationRef, normalize_name};

/// The parts of a raw record that matter for station matching. Adapters
/// fill in whatever their source carries and leave the rest empty.
#[derive(Debug, Default)]
pub struct RawStationRef<'a> {
    pub stop_id: Option<&'a str>,
    pub name: Option<&'a str>,
    pub routes: &'a [String],
    pub coordinates: Option<(f64, f64)>,
}

pub struct Resolver {
    tables: AgencyTables,
}

impl Resolver {
    pub fn new(tables: AgencyTables) -> Self {
        Self { tables }
    }

    pub fn agency(&self) -> &'static str {
        self.tables.agency
    }

    /// Resolves a raw reference to a canonical station id, or `None` when
    /// every layer misses.
    pub fn resolve_station(&self, raw: &RawStationRef<'_>, index: &StationIndex) -> Option<String> {
        // Layer 1: structured stop id straight into the hand-kept table.
        if let Some(stop_id) = raw.stop_id
            && let Some(station_id) = self.tables.stop_id_map.get(stop_id)
        {
            return Some((*station_id).to_string());
        }

        let name = raw.name?;
        let mut key = normalize_name(name);

        // Layer 2: alias rewrite before touching the index.
        if let Some(canonical) = self.tables.aliases.get(&key) {
            key = canonical.clone();
        }

        // Layer 3: normalized-name index.
        let candidates = index.lookup_normalized(&key);
        match candidates.len() {
            0 => {
                debug!(
                    agency = self.tables.agency,
                    name, "Station reference unresolved, dropping"
                );
                None
            }
            1 => Some(candidates[0].station_id.clone()),
            // Layer 4: ambiguous shared name, score the candidates.
            _ => Some(self.disambiguate(raw, candidates).station_id.clone()),
        }
    }

    /// Picks among candidates sharing one normalized name: line overlap
    /// first, haversine distance among the near-top overlaps (margin 1,
    /// zero-overlap candidates never ride the margin). Without usable
    /// coordinates overlap alone decides, first candidate among equal
    /// overlaps.
    fn disambiguate<'c>(
        &self,
        raw: &RawStationRef<'_>,
        candidates: &'c [StationRef],
    ) -> &'c StationRef {
        let raw_lines = self.expand_routes(raw.routes);

        let overlaps: Vec<usize> = candidates
            .iter()
            .map(|c| c.lines.iter().filter(|l| raw_lines.contains(l.as_str())).count())
            .collect();
        let top = overlaps.iter().copied().max().unwrap_or(0);
        let floor = if top > 0 { (top - 1).max(1) } else { 0 };

        if let Some((raw_lat, raw_lon)) = raw.coordinates {
            let here = Point::new(raw_lon, raw_lat);
            let nearest = candidates
                .iter()
                .zip(&overlaps)
                .filter(|&(_, &o)| o >= floor)
                .filter_map(|(c, _)| {
                    let (lat, lon) = c.coordinates?;
                    let dist = Haversine.distance(here, Point::new(lon, lat));
                    Some((c, dist))
                })
                .min_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((station, _)) = nearest {
                return station;
            }
        }

        candidates
            .iter()
            .zip(&overlaps)
            .find(|&(_, &o)| o == top)
            .map(|(c, _)| c)
            .unwrap_or(&candidates[0])
    }

    /// Expands raw route codes into the canonical line-id set used for
    /// overlap scoring, applying shuttle/branch fan-out aliases.
    fn expand_routes(&self, routes: &[String]) -> HashSet<String> {
        let mut lines = HashSet::new();
        for route in routes {
            if let Some(expansion) = self.tables.route_aliases.get(route.as_str()) {
                lines.extend(expansion.iter().map(|l| l.to_string()));
            } else if let LineMatch::Line(line) = self.resolve_line(route) {
                lines.insert(line);
            }
        }
        lines
    }

    /// Single-step route code lookup with an explicit out-of-scope
    /// sentinel for routes the table knows but the canonical set excludes.
    pub fn resolve_line(&self, route_id: &str) -> LineMatch {
        match self.tables.route_to_line.get(route_id) {
            Some(Some(line)) => LineMatch::Line((*line).to_string()),
            Some(None) => LineMatch::OutOfScope,
            None => LineMatch::Unknown,
        }
    }

    /// Free-text pattern search for adapters with no structured reference.
    /// Every matching pattern contributes its station; order in the table
    /// controls specificity, dedup keeps the first occurrence.
    pub fn search_text(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut hits = Vec::new();
        for entry in &self.tables.name_patterns {
            if entry.pattern.is_match(text) && seen.insert(entry.station_id) {
                hits.push(entry.station_id.to_string());
            }
        }
        hits
    }
}
