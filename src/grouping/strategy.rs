use serde::Serialize;

use crate::grouping::config::GroupingConfig;
use crate::records::BusOccupancyRecord;

/// How records are partitioned into groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupStrategy {
    ByPlant,
    ByZone,
    ByRoute,
}

impl GroupStrategy {
    /// Column header naming the group key in exports.
    pub fn label(&self) -> &'static str {
        match self {
            GroupStrategy::ByPlant => "Plant",
            GroupStrategy::ByZone => "Zone",
            GroupStrategy::ByRoute => "Route",
        }
    }

    pub fn key(&self, record: &BusOccupancyRecord, config: &GroupingConfig) -> String {
        match self {
            GroupStrategy::ByPlant => plant_key(record.organizational_code.as_deref(), config),
            GroupStrategy::ByZone => zone_key(&record.bus_id, record.route_name(), config),
            GroupStrategy::ByRoute => route_key(record, config),
        }
    }
}

/// Normalizes an organizational code into a plant label.
///
/// Missing, blank and unassigned codes map to the unknown bucket. Anything
/// else is uppercased, and codes starting with a collapse prefix become that
/// prefix (`"bka3"` → `"BK"`).
pub fn plant_key(code: Option<&str>, config: &GroupingConfig) -> String {
    let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
        return config.unknown_plant.clone();
    };

    let upper = code.to_uppercase();
    if config
        .unassigned_codes
        .iter()
        .any(|u| u.eq_ignore_ascii_case(&upper))
    {
        return config.unknown_plant.clone();
    }

    collapse(upper, &config.plant_collapse_prefixes)
}

/// Derives a zone from the leading letters of the bus ID, falling back to the
/// route's leading letters and then to `other_zone`.
///
/// `"A01"` → `"A"`, `"BKA0"` → `"BK"`, `"12"` with route `"East 4"` → `"EAST"`.
pub fn zone_key(bus_id: &str, route: Option<&str>, config: &GroupingConfig) -> String {
    leading_alpha(bus_id)
        .or_else(|| route.and_then(leading_alpha))
        .map(|prefix| collapse(prefix, &config.zone_collapse_prefixes))
        .unwrap_or_else(|| config.other_zone.clone())
}

pub fn route_key(record: &BusOccupancyRecord, config: &GroupingConfig) -> String {
    record
        .route_name()
        .map(str::to_string)
        .unwrap_or_else(|| config.unknown_route.clone())
}

fn leading_alpha(s: &str) -> Option<String> {
    let run: String = s
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();

    if run.is_empty() {
        None
    } else {
        Some(run.to_ascii_uppercase())
    }
}

fn collapse(code: String, prefixes: &[String]) -> String {
    prefixes
        .iter()
        .map(|p| p.to_uppercase())
        .find(|p| !p.is_empty() && code.starts_with(p.as_str()))
        .unwrap_or(code)
}
