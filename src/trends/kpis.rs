use serde::Serialize;

use crate::grouping::{Group, GroupingConfig};
use crate::records::pct;
use crate::trends::compare::{Comparable, count_delta};

/// Headline fleet numbers for one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetKpis {
    pub bus_count: u64,
    pub total_present: u64,
    pub total_bus_capacity: u64,
    /// All riders over bus-only seats.
    pub utilization_pct: f64,
    pub attendance_rate_pct: f64,
    /// Buses with seats whose utilization is under the configured threshold.
    pub underutilized_count: u64,
    pub empty_seats: u64,
}

impl FleetKpis {
    pub fn from_groups(groups: &[Group], config: &GroupingConfig) -> Self {
        let total_present: u64 = groups.iter().map(|g| g.total_present).sum();
        let total_bus_capacity: u64 = groups.iter().map(|g| g.total_bus_capacity).sum();
        let total_roster: u64 = groups.iter().map(|g| g.total_roster).sum();

        let buses = groups.iter().flat_map(|g| g.buses.iter());
        let mut bus_count = 0;
        let mut underutilized_count = 0;
        for bus in buses {
            bus_count += 1;
            if bus.record.bus_capacity > 0 && bus.utilization_pct < config.underutilized_below_pct {
                underutilized_count += 1;
            }
        }

        Self {
            bus_count,
            total_present,
            total_bus_capacity,
            utilization_pct: pct(total_present, total_bus_capacity),
            attendance_rate_pct: pct(total_present, total_roster),
            underutilized_count,
            empty_seats: total_bus_capacity.saturating_sub(total_present),
        }
    }
}

/// Change in [`FleetKpis`] against a previous period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiDeltas {
    pub bus_count: i64,
    pub total_present: i64,
    /// Percentage points.
    pub utilization_pp: f64,
    /// Percentage points.
    pub attendance_rate_pp: f64,
    pub underutilized_count: i64,
    pub empty_seats: i64,
}

impl Comparable for FleetKpis {
    type Delta = KpiDeltas;

    fn delta(&self, previous: &Self) -> KpiDeltas {
        KpiDeltas {
            bus_count: count_delta(self.bus_count, previous.bus_count),
            total_present: count_delta(self.total_present, previous.total_present),
            utilization_pp: self.utilization_pct - previous.utilization_pct,
            attendance_rate_pp: self.attendance_rate_pct - previous.attendance_rate_pct,
            underutilized_count: count_delta(
                self.underutilized_count,
                previous.underutilized_count,
            ),
            empty_seats: count_delta(self.empty_seats, previous.empty_seats),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::{GroupStrategy, group_by};
    use crate::records::BusOccupancyRecord;
    use crate::trends::compare::compare;

    fn bus(id: &str, capacity: u64, present: u64, roster: u64) -> BusOccupancyRecord {
        BusOccupancyRecord {
            bus_id: id.to_string(),
            organizational_code: Some("P1".to_string()),
            bus_capacity: capacity,
            bus_present: present,
            bus_roster: roster,
            ..Default::default()
        }
    }

    fn kpis(records: &[BusOccupancyRecord]) -> FleetKpis {
        let config = GroupingConfig::default();
        FleetKpis::from_groups(&group_by(records, GroupStrategy::ByPlant, &config), &config)
    }

    #[test]
    fn test_fleet_kpis() {
        let current = kpis(&[
            bus("A1", 40, 30, 40),
            bus("A2", 40, 8, 10),
            bus("A3", 0, 5, 5),
        ]);

        assert_eq!(current.bus_count, 3);
        assert_eq!(current.total_present, 43);
        assert_eq!(current.total_bus_capacity, 80);
        // A3 has no seats and is not counted as underutilized.
        assert_eq!(current.underutilized_count, 1);
        assert_eq!(current.empty_seats, 37);
        assert!((current.utilization_pct - 53.75).abs() < 1e-9);
        assert!((current.attendance_rate_pct - 43.0 / 55.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_fleet() {
        let empty = kpis(&[]);
        assert_eq!(empty.bus_count, 0);
        assert_eq!(empty.utilization_pct, 0.0);
        assert_eq!(empty.empty_seats, 0);
    }

    #[test]
    fn test_kpi_deltas() {
        let current = kpis(&[bus("A1", 40, 30, 40), bus("A2", 40, 8, 10)]);
        let previous = kpis(&[bus("A1", 40, 20, 40), bus("A2", 40, 6, 10)]);

        let deltas = compare(&current, Some(&previous)).unwrap();
        assert_eq!(deltas.total_present, 12);
        assert_eq!(deltas.underutilized_count, 0);
        assert_eq!(deltas.empty_seats, -12);
        assert!((deltas.utilization_pp - 15.0).abs() < 1e-9);
        assert_eq!(deltas.bus_count, 0);
    }

    #[test]
    fn test_kpi_deltas_absent() {
        let current = kpis(&[bus("A1", 40, 30, 40)]);
        assert_eq!(compare(&current, None), None);
    }
}
