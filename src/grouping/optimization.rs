//! Fleet optimization over plant groups: which buses could share a run,
//! which routes carry more buses than their riders need, and what the empty
//! seats cost.
//!
//! Consolidation and route sizing count bus riders only (`bus_present`); van
//! riders keep their vans. Cost and quick stats use the same all-rider
//! utilization as the grouping engine.

use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::grouping::config::GroupingConfig;
use crate::grouping::engine::{BusEntry, Group};
use crate::records::pct;

/// A bus picked to ride along in a consolidation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidatedBus {
    pub bus_id: String,
    pub passengers: u64,
    pub utilization_pct: f64,
}

/// Underused buses on one route whose riders fit on a single bus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Consolidation {
    pub route: String,
    /// Plant of the first bus seen on the route.
    pub plant: String,
    /// Heaviest first.
    pub buses: Vec<ConsolidatedBus>,
    pub combined_passengers: u64,
    /// Combined riders over `bus_seat_cap`.
    pub combined_utilization_pct: f64,
    pub removable: u64,
}

/// Bus count on a route against the count its riders need.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteEfficiency {
    pub route: String,
    pub plant: String,
    pub bus_count: u64,
    pub total_passengers: u64,
    pub total_capacity: u64,
    pub utilization_pct: f64,
    pub optimal_bus_count: u64,
    pub removable: u64,
}

/// Seated buses at one plant before and after right-sizing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetReduction {
    pub plant: String,
    pub current_buses: u64,
    pub optimal_buses: u64,
    pub removable: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantCost {
    pub plant: String,
    pub empty_seats: u64,
    pub daily_waste: f64,
    pub underutilized_count: u64,
}

/// Cost of empty bus seats, fleet-wide and per plant (most empty seats first).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostAnalysis {
    pub empty_seats: u64,
    pub underutilized_count: u64,
    pub daily_waste: f64,
    pub monthly_waste: f64,
    pub plants: Vec<PlantCost>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickStats {
    pub bus_count: u64,
    pub avg_passengers_per_bus: f64,
    /// Seated buses under `low_utilization_below_pct`.
    pub low_utilization_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationReport {
    pub consolidations: Vec<Consolidation>,
    pub route_efficiency: Vec<RouteEfficiency>,
    pub fleet_reduction: Vec<FleetReduction>,
    pub cost: CostAnalysis,
    pub quick_stats: QuickStats,
}

impl OptimizationReport {
    /// Builds every section from plant groups.
    pub fn from_groups(plants: &[Group], config: &GroupingConfig) -> Self {
        let report = Self {
            consolidations: consolidations(plants, config),
            route_efficiency: route_efficiency(plants, config),
            fleet_reduction: fleet_reduction(plants, config),
            cost: cost_analysis(plants, config),
            quick_stats: quick_stats(plants, config),
        };

        debug!(
            consolidations = report.consolidations.len(),
            removable = report.total_removable(),
            "Built optimization report"
        );
        report
    }

    /// Buses the fleet could drop across all plants.
    pub fn total_removable(&self) -> u64 {
        self.fleet_reduction.iter().map(|f| f.removable).sum()
    }

    pub fn total_current_buses(&self) -> u64 {
        self.fleet_reduction.iter().map(|f| f.current_buses).sum()
    }
}

/// Fewest buses of `seat_cap` seats that carry `passengers`.
pub fn optimal_bus_count(passengers: u64, seat_cap: u64) -> u64 {
    passengers.div_ceil(seat_cap.max(1))
}

/// Per route, packs buses under `consolidation_below_pct` into one
/// `bus_seat_cap` bus, heaviest first, skipping any that would overflow it.
///
/// Routes where at least two buses fit are kept, most removable first, up to
/// `max_suggestions`.
pub fn consolidations(plants: &[Group], config: &GroupingConfig) -> Vec<Consolidation> {
    let mut suggestions: Vec<Consolidation> = routes(plants, config)
        .into_iter()
        .filter_map(|route| consolidate_route(route, config))
        .collect();

    suggestions.sort_by(|a, b| b.removable.cmp(&a.removable));
    suggestions.truncate(config.max_suggestions);
    suggestions
}

fn consolidate_route(route: RouteBuses<'_>, config: &GroupingConfig) -> Option<Consolidation> {
    let mut candidates: Vec<&BusEntry> = route
        .buses
        .iter()
        .copied()
        .filter(|b| {
            b.record.bus_present > 0
                && bus_only_pct(b) < config.consolidation_below_pct
        })
        .collect();
    if candidates.len() < 2 {
        return None;
    }
    candidates.sort_by(|a, b| b.record.bus_present.cmp(&a.record.bus_present));

    let mut combined_passengers = 0;
    let mut buses = Vec::new();
    for bus in candidates {
        if combined_passengers + bus.record.bus_present <= config.bus_seat_cap {
            combined_passengers += bus.record.bus_present;
            buses.push(ConsolidatedBus {
                bus_id: bus.record.bus_id.clone(),
                passengers: bus.record.bus_present,
                utilization_pct: bus_only_pct(bus),
            });
        }
    }
    if buses.len() < 2 {
        return None;
    }

    Some(Consolidation {
        route: route.route,
        plant: route.plant.to_string(),
        removable: buses.len() as u64 - 1,
        buses,
        combined_passengers,
        combined_utilization_pct: pct(combined_passengers, config.bus_seat_cap),
    })
}

/// Routes that could run fewer buses, or run under `low_utilization_below_pct`,
/// most removable first, up to `max_suggestions`.
pub fn route_efficiency(plants: &[Group], config: &GroupingConfig) -> Vec<RouteEfficiency> {
    let mut results: Vec<RouteEfficiency> = routes(plants, config)
        .into_iter()
        .map(|route| {
            let bus_count = route.buses.len() as u64;
            let total_passengers = route.buses.iter().map(|b| b.record.bus_present).sum();
            let total_capacity = route.buses.iter().map(|b| b.record.bus_capacity).sum();
            let optimal_bus_count = optimal_bus_count(total_passengers, config.bus_seat_cap);
            RouteEfficiency {
                route: route.route,
                plant: route.plant.to_string(),
                bus_count,
                total_passengers,
                total_capacity,
                utilization_pct: pct(total_passengers, total_capacity),
                optimal_bus_count,
                removable: bus_count.saturating_sub(optimal_bus_count),
            }
        })
        .filter(|r| r.removable > 0 || r.utilization_pct < config.low_utilization_below_pct)
        .collect();

    results.sort_by(|a, b| b.removable.cmp(&a.removable));
    results.truncate(config.max_suggestions);
    results
}

/// Right-sizes each plant's seated buses to its bus riders, most removable first.
pub fn fleet_reduction(plants: &[Group], config: &GroupingConfig) -> Vec<FleetReduction> {
    let mut reductions: Vec<FleetReduction> = plants
        .iter()
        .map(|plant| {
            let seated = plant.buses.iter().filter(|b| b.record.bus_capacity > 0);
            let (current_buses, passengers) =
                seated.fold((0, 0), |(n, p), b| (n + 1, p + b.record.bus_present));
            let optimal = optimal_bus_count(passengers, config.bus_seat_cap);
            let removable = u64::saturating_sub(current_buses, optimal);
            FleetReduction {
                plant: plant.key.clone(),
                current_buses,
                optimal_buses: current_buses - removable,
                removable,
            }
        })
        .collect();

    reductions.sort_by(|a, b| b.removable.cmp(&a.removable));
    reductions
}

/// Empty bus seats priced at `cost_per_empty_seat` a day.
pub fn cost_analysis(plants: &[Group], config: &GroupingConfig) -> CostAnalysis {
    let mut per_plant: Vec<PlantCost> = plants
        .iter()
        .map(|plant| {
            let empty_seats = plant.total_bus_capacity.saturating_sub(plant.total_bus_present);
            PlantCost {
                plant: plant.key.clone(),
                empty_seats,
                daily_waste: empty_seats as f64 * config.cost_per_empty_seat,
                underutilized_count: count_below(plant, config.underutilized_below_pct),
            }
        })
        .collect();
    per_plant.sort_by(|a, b| b.empty_seats.cmp(&a.empty_seats));

    let empty_seats: u64 = per_plant.iter().map(|p| p.empty_seats).sum();
    let daily_waste = empty_seats as f64 * config.cost_per_empty_seat;
    CostAnalysis {
        empty_seats,
        underutilized_count: per_plant.iter().map(|p| p.underutilized_count).sum(),
        daily_waste,
        monthly_waste: daily_waste * f64::from(config.working_days_per_month),
        plants: per_plant,
    }
}

pub fn quick_stats(plants: &[Group], config: &GroupingConfig) -> QuickStats {
    let bus_count: u64 = plants.iter().map(|g| g.buses.len() as u64).sum();
    let total_present: u64 = plants.iter().map(|g| g.total_present).sum();
    QuickStats {
        bus_count,
        avg_passengers_per_bus: if bus_count == 0 {
            0.0
        } else {
            total_present as f64 / bus_count as f64
        },
        low_utilization_count: plants
            .iter()
            .map(|g| count_below(g, config.low_utilization_below_pct))
            .sum(),
    }
}

/// Seated buses in `group` under `threshold` utilization.
fn count_below(group: &Group, threshold: f64) -> u64 {
    group
        .buses
        .iter()
        .filter(|b| b.record.bus_capacity > 0 && b.utilization_pct < threshold)
        .count() as u64
}

fn bus_only_pct(bus: &BusEntry) -> f64 {
    pct(bus.record.bus_present, bus.record.bus_capacity)
}

struct RouteBuses<'a> {
    route: String,
    plant: &'a str,
    buses: Vec<&'a BusEntry>,
}

/// Buses bucketed by route across all plants, in first-seen order.
fn routes<'a>(plants: &'a [Group], config: &GroupingConfig) -> Vec<RouteBuses<'a>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut buckets: Vec<RouteBuses<'a>> = Vec::new();

    for plant in plants {
        for bus in &plant.buses {
            let route = bus
                .record
                .route_name()
                .map(str::to_string)
                .unwrap_or_else(|| config.unknown_route.clone());
            let i = *index.entry(route.clone()).or_insert_with(|| {
                buckets.push(RouteBuses {
                    route,
                    plant: &plant.key,
                    buses: Vec::new(),
                });
                buckets.len() - 1
            });
            buckets[i].buses.push(bus);
        }
    }

    buckets
}
