//! Hand-maintained per-agency lookup tables.
//!
//! These encode the known divergences between each agency's feeds and the
//! canonical station list: GTFS stop ids that map straight to stations,
//! names the feeds spell differently than the data store, route codes that
//! fan out to several canonical lines, and text patterns for alerts that
//! only name stations in prose. Extending an agency means editing its
//! constructor here, never the resolver.

use regex::Regex;
use std::collections::HashMap;

use crate::stations::normalize_name;

/// Result of a line lookup. `OutOfScope` marks routes the table knows about
/// but that have no canonical line (commuter-rail codes riding in a metro
/// feed); `Unknown` marks codes the table has never seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineMatch {
    Line(String),
    OutOfScope,
    Unknown,
}

/// One ordered text pattern: first match wins, so multi-word patterns must
/// sort before single-word fallbacks.
pub struct NamePattern {
    pub pattern: Regex,
    pub station_id: &'static str,
}

pub struct AgencyTables {
    pub agency: &'static str,
    /// GTFS stop id -> canonical station id.
    pub stop_id_map: HashMap<&'static str, &'static str>,
    /// Normalized divergent name -> normalized canonical name.
    pub aliases: HashMap<String, String>,
    /// Route code -> canonical line ids it expands to (shuttles span lines).
    pub route_aliases: HashMap<&'static str, Vec<&'static str>>,
    /// Route code -> canonical line id, `None` = known but out of scope.
    pub route_to_line: HashMap<&'static str, Option<&'static str>>,
    /// Ordered alert-text patterns, most specific first.
    pub name_patterns: Vec<NamePattern>,
}

fn alias_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(from, to)| (normalize_name(from), normalize_name(to)))
        .collect()
}

fn pattern(re: &str, station_id: &'static str) -> NamePattern {
    NamePattern {
        pattern: Regex::new(re).expect("hand-authored pattern"),
        station_id,
    }
}

impl AgencyTables {
    /// Tables with no entries, for agencies whose feeds are fully
    /// structured and for tests.
    pub fn empty(agency: &'static str) -> Self {
        AgencyTables {
            agency,
            stop_id_map: HashMap::new(),
            aliases: alias_map(&[]),
            route_aliases: HashMap::new(),
            route_to_line: HashMap::new(),
            name_patterns: Vec::new(),
        }
    }

    pub fn wmata() -> Self {
        AgencyTables {
            agency: "wmata",
            // Platform-level GTFS stop ids for multi-platform stations.
            stop_id_map: HashMap::from([
                ("PF_A01_C", "a01"),
                ("PF_C01_C", "c01"),
                ("PF_B01_C", "b01"),
                ("PF_F01_C", "f01"),
                ("PF_D03_C", "d03"),
                ("STN_A01_C01", "a01"),
                ("STN_B01_F01", "b01"),
                ("STN_D03_F03", "d03"),
            ]),
            // Feed spellings that never match the data store directly.
            aliases: alias_map(&[
                ("Gallery Place", "Gallery Pl-Chinatown"),
                ("Gallery Pl", "Gallery Pl-Chinatown"),
                ("L'Enfant", "L'Enfant Plaza"),
                ("Mt Vernon Sq", "Mt Vernon Sq 7th St-Convention Center"),
                ("Vernon Square", "Mt Vernon Sq 7th St-Convention Center"),
                ("King Street", "King St-Old Town"),
                ("Stadium Armory", "Stadium-Armory"),
                ("U St", "U Street"),
            ]),
            route_aliases: HashMap::from([
                // Blue/Yellow shuttle bridges both lines during trackwork.
                ("SHUTTLE-BLYL", vec!["blue", "yellow"]),
                ("SHUTTLE-RD", vec!["red"]),
            ]),
            route_to_line: HashMap::from([
                ("RED", Some("red")),
                ("BLUE", Some("blue")),
                ("ORANGE", Some("orange")),
                ("SILVER", Some("silver")),
                ("YELLOW", Some("yellow")),
                ("GREEN", Some("green")),
                // MARC trains appear in regional alert feeds but have no
                // canonical metro line.
                ("MARC-PENN", None),
                ("MARC-BRUNSWICK", None),
            ]),
            name_patterns: vec![
                pattern(r"(?i)gallery\s+pl(ace)?([\s\u{2013}-]*chinatown)?", "b01"),
                pattern(r"(?i)mt\.?\s+vernon\s+sq(uare)?", "e01"),
                pattern(r"(?i)l'?enfant\s+plaza", "d03"),
                pattern(r"(?i)fort\s+totten", "b06"),
                pattern(r"(?i)metro\s+center", "a01"),
                pattern(r"(?i)\banacostia\b", "f06"),
            ],
        }
    }

    pub fn mbta() -> Self {
        AgencyTables {
            agency: "mbta",
            stop_id_map: HashMap::from([
                ("place-pktrm", "park-street"),
                ("place-dwnxg", "downtown-crossing"),
                ("place-gover", "government-center"),
                ("place-harsq", "harvard"),
                ("place-portr", "porter"),
                ("place-alfcl", "alewife"),
            ]),
            aliases: alias_map(&[
                ("Park St", "Park Street"),
                ("Gov Center", "Government Center"),
                ("Gov't Center", "Government Center"),
                ("Downtown Xing", "Downtown Crossing"),
            ]),
            route_aliases: HashMap::from([
                // A Green Line shuttle alert affects every branch.
                ("Shuttle-Green", vec!["green-b", "green-c", "green-d", "green-e"]),
                ("Mattapan", vec!["red"]),
            ]),
            route_to_line: HashMap::from([
                ("Red", Some("red")),
                ("Orange", Some("orange")),
                ("Blue", Some("blue")),
                ("Green-B", Some("green-b")),
                ("Green-C", Some("green-c")),
                ("Green-D", Some("green-d")),
                ("Green-E", Some("green-e")),
                // Commuter rail routes ride in the same alert feed.
                ("CR-Providence", None),
                ("CR-Worcester", None),
                ("CR-Lowell", None),
            ]),
            name_patterns: vec![
                pattern(r"(?i)downtown\s+crossing", "downtown-crossing"),
                pattern(r"(?i)government\s+center", "government-center"),
                pattern(r"(?i)park\s+st(reet)?\b", "park-street"),
                pattern(r"(?i)\bharvard\b", "harvard"),
                pattern(r"(?i)\balewife\b", "alewife"),
            ],
        }
    }

    pub fn seoul() -> Self {
        AgencyTables {
            agency: "seoul",
            stop_id_map: HashMap::new(),
            aliases: alias_map(&[
                ("\u{C11C}\u{C6B8}", "\u{C11C}\u{C6B8}\u{C5ED}"),
                ("Seoul Stn", "Seoul Station"),
                ("Dongdaemun Hist. & Culture Park", "Dongdaemun History & Culture Park"),
            ]),
            route_aliases: HashMap::new(),
            route_to_line: HashMap::from([
                ("1", Some("line-1")),
                ("2", Some("line-2")),
                ("3", Some("line-3")),
                ("4", Some("line-4")),
                // AREX and suburban lines show up on scraped line maps but
                // are outside the canonical set.
                ("A", None),
                ("K", None),
            ]),
            name_patterns: vec![
                pattern(
                    r"(?i)dongdaemun\s+history\s*(&|and)\s*culture\s+park",
                    "seoul-dhcp",
                ),
                pattern(r"(?i)seoul\s+station|\u{C11C}\u{C6B8}\u{C5ED}", "seoul-station"),
                pattern(r"(?i)\bjamsil\b|\u{C7A0}\u{C2E4}", "seoul-jamsil"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_values_are_normalized() {
        let tables = AgencyTables::wmata();
        for (from, to) in &tables.aliases {
            assert_eq!(from, &normalize_name(from));
            assert_eq!(to, &normalize_name(to));
        }
    }

    #[test]
    fn test_multi_word_patterns_precede_single_word() {
        // "Gallery Place" prose must hit b01 before any one-word fallback.
        let tables = AgencyTables::wmata();
        let first_hit = tables
            .name_patterns
            .iter()
            .find(|p| p.pattern.is_match("Elevator outage at Gallery Place-Chinatown"))
            .map(|p| p.station_id);
        assert_eq!(first_hit, Some("b01"));
    }

    #[test]
    fn test_route_table_distinguishes_out_of_scope_from_unknown() {
        let tables = AgencyTables::mbta();
        assert_eq!(tables.route_to_line.get("Red"), Some(&Some("red")));
        assert_eq!(tables.route_to_line.get("CR-Providence"), Some(&None));
        assert_eq!(tables.route_to_line.get("Purple"), None);
    }
}
