/// Station registry for the AQHI snapshot service.
///
/// Defines the canonical list of EPD monitoring stations published in the
/// AQHI list view. The parser never rejects a station that is missing from
/// here; the registry only lets a run report roster drift (stations added,
/// renamed or dropped from the page).

// ---------------------------------------------------------------------------
// Station metadata
// ---------------------------------------------------------------------------

/// Siting class of a monitoring station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationKind {
    /// Ambient station measuring general background air quality.
    General,
    /// Kerbside station measuring street-level traffic exposure.
    Roadside,
}

/// Metadata for a single monitoring station.
pub struct Station {
    /// Name as printed in the list view, minus any "(Roadside)" annotation.
    pub name: &'static str,
    pub kind: StationKind,
    /// Marine or rural background station with sparse pollutant coverage.
    pub background: bool,
}

/// All stations in the list view: 15 general stations followed by the 3
/// roadside stations.
pub static STATION_REGISTRY: &[Station] = &[
    Station { name: "Central/Western", kind: StationKind::General, background: false },
    Station { name: "Southern", kind: StationKind::General, background: false },
    Station { name: "Eastern", kind: StationKind::General, background: false },
    Station { name: "Kwun Tong", kind: StationKind::General, background: false },
    Station { name: "Sham Shui Po", kind: StationKind::General, background: false },
    Station { name: "Kwai Chung", kind: StationKind::General, background: false },
    Station { name: "Tsuen Wan", kind: StationKind::General, background: false },
    Station { name: "Tseung Kwan O", kind: StationKind::General, background: false },
    Station { name: "Yuen Long", kind: StationKind::General, background: false },
    Station { name: "Tuen Mun", kind: StationKind::General, background: false },
    Station { name: "Tung Chung", kind: StationKind::General, background: false },
    Station { name: "Tai Po", kind: StationKind::General, background: false },
    Station { name: "Sha Tin", kind: StationKind::General, background: false },
    Station { name: "North", kind: StationKind::General, background: false },
    Station { name: "Tap Mun", kind: StationKind::General, background: true },
    Station { name: "Causeway Bay", kind: StationKind::Roadside, background: false },
    Station { name: "Central", kind: StationKind::Roadside, background: false },
    Station { name: "Mong Kok", kind: StationKind::Roadside, background: false },
];

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Case- and whitespace-insensitive comparison key, so "KwunTong" and
/// "Kwun Tong" resolve to the same station.
fn fold(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Look up a station by its list-view name.
pub fn find_station(name: &str) -> Option<&'static Station> {
    let key = fold(name);
    STATION_REGISTRY.iter().find(|s| fold(s.name) == key)
}

/// Compare the stations seen in one snapshot against the registry.
///
/// Returns `(unknown, missing)`: names on the page with no registry entry,
/// and registry names absent from the page, each in input/registry order.
pub fn roster_drift<'a, I>(seen: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = &'a str>,
{
    let seen: Vec<&str> = seen.into_iter().collect();

    let unknown = seen
        .iter()
        .filter(|name| find_station(name).is_none())
        .map(|name| name.to_string())
        .collect();

    let seen_keys: Vec<String> = seen.iter().map(|name| fold(name)).collect();
    let missing = STATION_REGISTRY
        .iter()
        .filter(|s| !seen_keys.contains(&fold(s.name)))
        .map(|s| s.name.to_string())
        .collect();

    (unknown, missing)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_fifteen_general_and_three_roadside() {
        let general = STATION_REGISTRY.iter().filter(|s| s.kind == StationKind::General).count();
        let roadside = STATION_REGISTRY.iter().filter(|s| s.kind == StationKind::Roadside).count();
        assert_eq!(general, 15);
        assert_eq!(roadside, 3);
    }

    #[test]
    fn test_no_duplicate_station_names() {
        let mut seen = std::collections::HashSet::new();
        for station in STATION_REGISTRY {
            assert!(seen.insert(fold(station.name)), "duplicate station: {}", station.name);
        }
    }

    #[test]
    fn test_lookup_ignores_case_and_spacing() {
        let station = find_station("KwunTong").expect("compact spelling should resolve");
        assert_eq!(station.name, "Kwun Tong");
        assert!(find_station("mong kok").is_some());
        assert!(find_station("Lantau Peak").is_none());
    }

    #[test]
    fn test_central_is_distinct_from_central_western() {
        assert_eq!(find_station("Central").unwrap().kind, StationKind::Roadside);
        assert_eq!(find_station("Central/Western").unwrap().kind, StationKind::General);
    }

    #[test]
    fn test_roster_drift_reports_unknown_and_missing() {
        let mut names: Vec<&str> = STATION_REGISTRY.iter().map(|s| s.name).collect();
        names.retain(|n| *n != "Tap Mun");
        names.push("Lantau");

        let (unknown, missing) = roster_drift(names);
        assert_eq!(unknown, vec!["Lantau".to_string()]);
        assert_eq!(missing, vec!["Tap Mun".to_string()]);
    }
}
