use chrono::NaiveDate;
use serde::Serialize;

use crate::records::{BusOccupancyRecord, pct};

/// Fleet-wide roster and attendance for one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyMetric {
    pub date: NaiveDate,
    pub roster: u64,
    pub present: u64,
    pub attendance_rate_pct: f64,
}

impl DailyMetric {
    pub fn new(date: NaiveDate, roster: u64, present: u64) -> Self {
        Self {
            date,
            roster,
            present,
            attendance_rate_pct: pct(present, roster),
        }
    }

    /// Builds a day's point from that day's occupancy records.
    pub fn from_records(date: NaiveDate, records: &[BusOccupancyRecord]) -> Self {
        let roster = records.iter().map(|r| r.total_roster()).sum();
        let present = records.iter().map(|r| r.total_present()).sum();
        Self::new(date, roster, present)
    }
}

/// One Monday-to-Sunday week of daily points.
///
/// `roster` and `present` are daily averages; the rate comes from the summed
/// counts of the contributing days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyMetric {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    /// Number of daily points that fell in this week.
    pub days: usize,
    pub roster: u64,
    pub present: u64,
    pub attendance_rate_pct: f64,
}

/// Common view over daily and weekly points, used by exports and deltas.
pub trait TrendPoint {
    fn period_start(&self) -> NaiveDate;
    fn roster(&self) -> u64;
    fn present(&self) -> u64;
    fn attendance_rate_pct(&self) -> f64;
}

impl TrendPoint for DailyMetric {
    fn period_start(&self) -> NaiveDate {
        self.date
    }

    fn roster(&self) -> u64 {
        self.roster
    }

    fn present(&self) -> u64 {
        self.present
    }

    fn attendance_rate_pct(&self) -> f64 {
        self.attendance_rate_pct
    }
}

impl TrendPoint for WeeklyMetric {
    fn period_start(&self) -> NaiveDate {
        self.week_start
    }

    fn roster(&self) -> u64 {
        self.roster
    }

    fn present(&self) -> u64 {
        self.present
    }

    fn attendance_rate_pct(&self) -> f64 {
        self.attendance_rate_pct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_daily_rate() {
        let metric = DailyMetric::new(date(2024, 3, 4), 200, 150);
        assert_eq!(metric.attendance_rate_pct, 75.0);
    }

    #[test]
    fn test_daily_zero_roster() {
        let metric = DailyMetric::new(date(2024, 3, 4), 0, 12);
        assert_eq!(metric.attendance_rate_pct, 0.0);
    }

    #[test]
    fn test_daily_from_records() {
        let records = vec![
            BusOccupancyRecord {
                bus_id: "A1".into(),
                bus_present: 30,
                van_present: 5,
                bus_roster: 40,
                van_roster: 10,
                ..Default::default()
            },
            BusOccupancyRecord {
                bus_id: "A2".into(),
                bus_present: 15,
                bus_roster: 50,
                ..Default::default()
            },
        ];

        let metric = DailyMetric::from_records(date(2024, 3, 5), &records);
        assert_eq!(metric.roster, 100);
        assert_eq!(metric.present, 50);
        assert_eq!(metric.attendance_rate_pct, 50.0);
        assert_eq!(metric.period_start(), date(2024, 3, 5));
    }
}
