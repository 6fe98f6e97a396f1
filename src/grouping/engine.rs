use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

use crate::grouping::config::GroupingConfig;
use crate::grouping::strategy::GroupStrategy;
use crate::records::{BusOccupancyRecord, pct};
use crate::severity::{Severity, classify};

/// A member bus with its own utilization and severity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusEntry {
    #[serde(flatten)]
    pub record: BusOccupancyRecord,
    pub utilization_pct: f64,
    pub severity: Severity,
}

impl BusEntry {
    fn new(record: &BusOccupancyRecord) -> Self {
        let utilization_pct = record.utilization_pct();
        Self {
            record: record.clone(),
            utilization_pct,
            severity: classify(utilization_pct),
        }
    }
}

/// Aggregates for one plant, zone or route.
///
/// Group-level rates divide the combined bus and van riders by bus-only
/// capacity and by the combined roster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub key: String,
    pub strategy: GroupStrategy,
    /// Worst first: by severity, then by utilization descending.
    pub buses: Vec<BusEntry>,
    pub total_bus_capacity: u64,
    pub total_van_capacity: u64,
    pub total_bus_present: u64,
    pub total_van_present: u64,
    pub total_present: u64,
    pub total_roster: u64,
    pub avg_utilization_pct: f64,
    pub avg_attendance_rate_pct: f64,
    pub critical_count: usize,
    pub warning_count: usize,
    pub normal_count: usize,
}

impl Group {
    fn from_members(
        key: String,
        strategy: GroupStrategy,
        members: &[&BusOccupancyRecord],
    ) -> Self {
        let mut group = Group {
            key,
            strategy,
            buses: Vec::with_capacity(members.len()),
            total_bus_capacity: 0,
            total_van_capacity: 0,
            total_bus_present: 0,
            total_van_present: 0,
            total_present: 0,
            total_roster: 0,
            avg_utilization_pct: 0.0,
            avg_attendance_rate_pct: 0.0,
            critical_count: 0,
            warning_count: 0,
            normal_count: 0,
        };

        for record in members {
            let entry = BusEntry::new(record);
            match entry.severity {
                Severity::Critical => group.critical_count += 1,
                Severity::Warning => group.warning_count += 1,
                Severity::Normal => group.normal_count += 1,
            }

            group.total_bus_capacity += record.bus_capacity;
            group.total_van_capacity += record.van_capacity;
            group.total_bus_present += record.bus_present;
            group.total_van_present += record.van_present;
            group.total_present += record.total_present();
            group.total_roster += record.total_roster();

            group.buses.push(entry);
        }

        group.buses.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then_with(|| b.utilization_pct.total_cmp(&a.utilization_pct))
        });

        group.avg_utilization_pct = pct(group.total_present, group.total_bus_capacity);
        group.avg_attendance_rate_pct = pct(group.total_present, group.total_roster);
        group
    }

    pub fn bus_count(&self) -> usize {
        self.buses.len()
    }

    /// Unused bus seats, never negative.
    pub fn empty_seats(&self) -> u64 {
        self.total_bus_capacity.saturating_sub(self.total_present)
    }
}

/// Partitions records into groups under `strategy` and orders the result.
///
/// Plant groups follow `config.plant_priority`, then any other plant, with the
/// unknown bucket last; ties go to the group with more critical buses, then
/// alphabetically. Zone and route groups are ordered by critical count, then
/// warning count (both descending), then alphabetically.
///
/// Empty input gives an empty list.
pub fn group_by(
    records: &[BusOccupancyRecord],
    strategy: GroupStrategy,
    config: &GroupingConfig,
) -> Vec<Group> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut buckets: Vec<(String, Vec<&BusOccupancyRecord>)> = Vec::new();

    for record in records {
        let key = strategy.key(record, config);
        match index.get(&key) {
            Some(&i) => buckets[i].1.push(record),
            None => {
                index.insert(key.clone(), buckets.len());
                buckets.push((key, vec![record]));
            }
        }
    }

    let mut groups: Vec<Group> = buckets
        .into_iter()
        .map(|(key, members)| Group::from_members(key, strategy, &members))
        .collect();

    groups.sort_by(|a, b| compare_groups(a, b, strategy, config));

    debug!(
        ?strategy,
        records = records.len(),
        groups = groups.len(),
        "Grouped occupancy records"
    );

    groups
}

fn compare_groups(
    a: &Group,
    b: &Group,
    strategy: GroupStrategy,
    config: &GroupingConfig,
) -> Ordering {
    match strategy {
        GroupStrategy::ByPlant => config
            .plant_rank(&a.key)
            .cmp(&config.plant_rank(&b.key))
            .then_with(|| b.critical_count.cmp(&a.critical_count))
            .then_with(|| a.key.cmp(&b.key)),
        GroupStrategy::ByZone | GroupStrategy::ByRoute => b
            .critical_count
            .cmp(&a.critical_count)
            .then_with(|| b.warning_count.cmp(&a.warning_count))
            .then_with(|| a.key.cmp(&b.key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus(id: &str, plant: Option<&str>, capacity: u64, present: u64) -> BusOccupancyRecord {
        BusOccupancyRecord {
            bus_id: id.to_string(),
            organizational_code: plant.map(str::to_string),
            bus_capacity: capacity,
            bus_present: present,
            bus_roster: capacity,
            ..Default::default()
        }
    }

    fn keys(groups: &[Group]) -> Vec<&str> {
        groups.iter().map(|g| g.key.as_str()).collect()
    }

    #[test]
    fn test_empty_input() {
        let groups = group_by(&[], GroupStrategy::ByPlant, &GroupingConfig::default());
        assert!(groups.is_empty());
    }

    #[test]
    fn test_plant_aggregates_and_severity() {
        let records = vec![
            bus("A1", Some("P1"), 40, 38),
            bus("A2", Some("P1"), 40, 10),
            bus("B1", None, 30, 29),
        ];

        let groups = group_by(&records, GroupStrategy::ByPlant, &GroupingConfig::default());
        assert_eq!(keys(&groups), vec!["P1", "Unknown"]);

        let p1 = &groups[0];
        assert_eq!(p1.total_bus_capacity, 80);
        assert_eq!(p1.total_present, 48);
        assert!((p1.avg_utilization_pct - 60.0).abs() < 1e-9);
        assert_eq!(p1.warning_count, 1);
        assert_eq!(p1.normal_count, 1);
        // Warning tier sorts ahead of normal even at lower utilization.
        assert_eq!(p1.buses[0].record.bus_id, "A2");
        assert_eq!(p1.buses[0].severity, Severity::Warning);
        assert_eq!(p1.buses[1].severity, Severity::Normal);

        let unknown = &groups[1];
        assert_eq!(unknown.buses[0].severity, Severity::Normal);
        assert_eq!(unknown.empty_seats(), 1);
    }

    #[test]
    fn test_van_riders_count_against_bus_capacity() {
        let record = BusOccupancyRecord {
            bus_id: "V1".to_string(),
            organizational_code: Some("P1".to_string()),
            bus_capacity: 40,
            van_capacity: 10,
            bus_present: 35,
            van_present: 10,
            bus_roster: 40,
            van_roster: 10,
            ..Default::default()
        };

        let groups = group_by(&[record], GroupStrategy::ByPlant, &GroupingConfig::default());
        let group = &groups[0];
        assert_eq!(group.total_van_present, 10);
        assert_eq!(group.total_present, 45);
        assert!((group.avg_utilization_pct - 112.5).abs() < 1e-9);
        assert!((group.avg_attendance_rate_pct - 90.0).abs() < 1e-9);
        assert_eq!(group.buses[0].severity, Severity::Warning);
        assert_eq!(group.empty_seats(), 0);
    }

    #[test]
    fn test_zero_capacity_bus_is_critical() {
        let records = vec![bus("Z1", Some("P2"), 0, 7)];
        let groups = group_by(&records, GroupStrategy::ByPlant, &GroupingConfig::default());

        assert_eq!(groups[0].avg_utilization_pct, 0.0);
        assert_eq!(groups[0].buses[0].utilization_pct, 0.0);
        assert_eq!(groups[0].critical_count, 1);
        assert_eq!(groups[0].total_present, 7);
    }

    #[test]
    fn test_member_order_within_tier() {
        let records = vec![
            bus("C1", Some("P1"), 100, 5),
            bus("C2", Some("P1"), 100, 150),
            bus("C3", Some("P1"), 100, 2),
            bus("N1", Some("P1"), 100, 50),
            bus("N2", Some("P1"), 100, 90),
        ];
        let groups = group_by(&records, GroupStrategy::ByPlant, &GroupingConfig::default());
        let ids: Vec<&str> = groups[0]
            .buses
            .iter()
            .map(|b| b.record.bus_id.as_str())
            .collect();

        assert_eq!(ids, vec!["C2", "C1", "C3", "N2", "N1"]);
    }

    #[test]
    fn test_plant_priority_order() {
        let records = vec![
            bus("U1", None, 40, 20),
            bus("X1", Some("ZZ"), 40, 20),
            bus("K1", Some("bkc"), 40, 20),
            bus("J1", Some("JBMW"), 40, 1),
            bus("P2A", Some("P2"), 40, 20),
            bus("P1A", Some("P1"), 40, 20),
            bus("M1", Some("MX"), 40, 20),
        ];
        let groups = group_by(&records, GroupStrategy::ByPlant, &GroupingConfig::default());

        // JBMW has a critical bus, so it leads the unlisted band.
        assert_eq!(
            keys(&groups),
            vec!["P1", "P2", "BK", "JBMW", "MX", "ZZ", "Unknown"]
        );
    }

    #[test]
    fn test_plant_priority_from_config() {
        let config = GroupingConfig {
            plant_priority: vec!["P2".to_string(), "P1".to_string()],
            ..GroupingConfig::default()
        };
        let records = vec![bus("A", Some("P1"), 10, 5), bus("B", Some("P2"), 10, 5)];
        let groups = group_by(&records, GroupStrategy::ByPlant, &config);

        assert_eq!(keys(&groups), vec!["P2", "P1"]);
    }

    #[test]
    fn test_long_priority_list_keeps_unknown_last() {
        let config = GroupingConfig {
            plant_priority: (0..150).map(|i| format!("P{i}")).collect(),
            ..GroupingConfig::default()
        };
        let records = vec![
            bus("U1", None, 40, 20),
            bus("X1", Some("ZZ"), 40, 20),
            bus("L1", Some("P140"), 40, 20),
            bus("L2", Some("P55"), 40, 20),
        ];
        let groups = group_by(&records, GroupStrategy::ByPlant, &config);

        assert_eq!(keys(&groups), vec!["P55", "P140", "ZZ", "Unknown"]);
    }

    #[test]
    fn test_zone_order() {
        let records = vec![
            bus("A01", None, 40, 20),
            bus("B01", None, 40, 1),
            bus("C01", None, 40, 11),
            bus("D01", None, 40, 11),
            bus("BKA1", None, 40, 0),
            bus("BKB2", None, 40, 20),
        ];
        let groups = group_by(&records, GroupStrategy::ByZone, &GroupingConfig::default());

        assert_eq!(keys(&groups), vec!["B", "BK", "C", "D", "A"]);
        assert_eq!(groups[1].bus_count(), 2);
    }

    #[test]
    fn test_route_grouping() {
        let mut r1 = bus("A1", None, 40, 20);
        r1.route = Some("North".to_string());
        let mut r2 = bus("A2", None, 40, 1);
        r2.route = Some("South".to_string());
        let r3 = bus("A3", None, 40, 20);

        let groups = group_by(&[r1, r2, r3], GroupStrategy::ByRoute, &GroupingConfig::default());
        assert_eq!(keys(&groups), vec!["South", "North", "Unknown Route"]);
        assert!(groups.iter().all(|g| g.strategy == GroupStrategy::ByRoute));
    }

    #[test]
    fn test_conservation_of_present() {
        let records = vec![
            bus("A1", Some("P1"), 40, 38),
            bus("BK2", Some("BK9"), 30, 12),
            bus("7", None, 0, 4),
            bus("E5", Some("p2"), 50, 49),
        ];
        let input: u64 = records.iter().map(|r| r.total_present()).sum();

        for strategy in [GroupStrategy::ByPlant, GroupStrategy::ByZone, GroupStrategy::ByRoute] {
            let groups = group_by(&records, strategy, &GroupingConfig::default());
            let grouped: u64 = groups.iter().map(|g| g.total_present).sum();
            let members: usize = groups.iter().map(|g| g.bus_count()).sum();
            assert_eq!(grouped, input);
            assert_eq!(members, records.len());
        }
    }

    #[test]
    fn test_deterministic() {
        let records = vec![
            bus("A1", Some("P1"), 40, 38),
            bus("A2", Some("Q"), 40, 10),
            bus("A3", Some("R"), 40, 10),
        ];
        let config = GroupingConfig::default();
        assert_eq!(
            group_by(&records, GroupStrategy::ByPlant, &config),
            group_by(&records, GroupStrategy::ByPlant, &config)
        );
    }
}
