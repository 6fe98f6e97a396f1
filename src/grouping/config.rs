use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Lookup tables for the grouping engine.
///
/// Stored as a JSON object on disk; any key left out keeps its default:
/// ```json
/// {
///   "plant_priority": ["P1", "P2", "BK"],
///   "plant_collapse_prefixes": ["BK"],
///   "zone_collapse_prefixes": ["BK"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    /// Label of the plant bucket for buses without a usable code.
    pub unknown_plant: String,
    /// Codes that mean "unassigned", compared case-insensitively.
    pub unassigned_codes: Vec<String>,
    /// Site prefixes; any plant code starting with one collapses to it.
    pub plant_collapse_prefixes: Vec<String>,
    /// Canonical order of known plants. Unlisted plants follow, `unknown_plant` is last.
    pub plant_priority: Vec<String>,
    /// Bus-ID prefixes that collapse into a single zone.
    pub zone_collapse_prefixes: Vec<String>,
    /// Zone for buses with neither an alphabetic ID prefix nor a route.
    pub other_zone: String,
    /// Group for buses with no route.
    pub unknown_route: String,
    /// Buses below this utilization (with seats) count as underutilized.
    pub underutilized_below_pct: f64,
    /// Buses below this utilization (with seats) count toward the low-utilization stat.
    pub low_utilization_below_pct: f64,
    /// Buses below this bus-only utilization are candidates for consolidation.
    pub consolidation_below_pct: f64,
    /// Seats on the bus that consolidated riders are packed into.
    pub bus_seat_cap: u64,
    /// Daily cost of one empty bus seat.
    pub cost_per_empty_seat: f64,
    pub working_days_per_month: u32,
    /// How many consolidation and route-efficiency entries to keep.
    pub max_suggestions: usize,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            unknown_plant: "Unknown".to_string(),
            unassigned_codes: vec!["UNKNOWN".to_string()],
            plant_collapse_prefixes: vec!["BK".to_string()],
            plant_priority: vec!["P1".to_string(), "P2".to_string(), "BK".to_string()],
            zone_collapse_prefixes: vec!["BK".to_string()],
            other_zone: "OTHER".to_string(),
            unknown_route: "Unknown Route".to_string(),
            underutilized_below_pct: 30.0,
            low_utilization_below_pct: 50.0,
            consolidation_below_pct: 70.0,
            bus_seat_cap: 42,
            cost_per_empty_seat: 0.5,
            working_days_per_month: 22,
            max_suggestions: 5,
        }
    }
}

impl GroupingConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading config {path}"))?;
        let config: GroupingConfig = serde_json::from_str(&content)?;
        if config.bus_seat_cap == 0 {
            bail!("bus_seat_cap in {path} must be at least 1");
        }
        Ok(config)
    }

    /// Sort key of a plant label: listed plants in `plant_priority` order,
    /// then every other plant, then the unknown bucket.
    pub fn plant_rank(&self, plant: &str) -> (u8, usize) {
        if plant == self.unknown_plant {
            return (2, 0);
        }
        match self.plant_priority.iter().position(|p| p == plant) {
            Some(idx) => (0, idx),
            None => (1, 0),
        }
    }
}
