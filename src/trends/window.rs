use anyhow::{Context, Result, bail};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

use crate::trends::metrics::DailyMetric;

/// Longest trend range accepted, in days between the endpoints.
pub const MAX_SPAN_DAYS: i64 = 90;

/// An inclusive date range for trend analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrendWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl TrendWindow {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        let span = (to - from).num_days();
        if span < 0 {
            bail!("end date {to} is before start date {from}");
        }
        if span > MAX_SPAN_DAYS {
            bail!("trend range of {span} days exceeds the {MAX_SPAN_DAYS} day limit");
        }
        Ok(Self { from, to })
    }

    /// Number of days covered, both ends included.
    pub fn len_days(&self) -> u64 {
        (self.to - self.from).num_days() as u64 + 1
    }

    /// The window of equal length ending the day before this one starts.
    pub fn previous(&self) -> Result<Self> {
        let shift = Days::new(self.len_days());
        let from = self
            .from
            .checked_sub_days(shift)
            .context("previous window starts before the supported date range")?;
        let to = self
            .to
            .checked_sub_days(shift)
            .context("previous window ends before the supported date range")?;
        Ok(Self { from, to })
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.from.iter_days().take(self.len_days() as usize)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }

    /// Lays `series` onto this window: one point per day, in order.
    ///
    /// Days without a row get a zero point, repeated dates are summed, and
    /// rows outside the window are dropped.
    pub fn fill(&self, series: &[DailyMetric]) -> Vec<DailyMetric> {
        let mut by_date: HashMap<NaiveDate, (u64, u64)> = HashMap::new();
        let mut outside = 0;
        for point in series {
            if !self.contains(point.date) {
                outside += 1;
                continue;
            }
            let entry = by_date.entry(point.date).or_default();
            entry.0 += point.roster;
            entry.1 += point.present;
        }

        if outside > 0 {
            warn!(
                outside,
                from = %self.from,
                to = %self.to,
                "Dropped daily rows outside the trend window"
            );
        }

        self.days()
            .map(|date| {
                let (roster, present) = by_date.get(&date).copied().unwrap_or_default();
                DailyMetric::new(date, roster, present)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_rejects_reversed_range() {
        assert!(TrendWindow::new(date(2024, 1, 10), date(2024, 1, 9)).is_err());
    }

    #[test]
    fn test_span_limit() {
        assert!(TrendWindow::new(date(2024, 1, 1), date(2024, 3, 31)).is_ok());
        assert!(TrendWindow::new(date(2024, 1, 1), date(2024, 4, 1)).is_err());
    }

    #[test]
    fn test_single_day() {
        let window = TrendWindow::new(date(2024, 1, 10), date(2024, 1, 10)).unwrap();
        assert_eq!(window.len_days(), 1);
        assert_eq!(window.days().collect::<Vec<_>>(), vec![date(2024, 1, 10)]);
    }

    #[test]
    fn test_previous_window() {
        let window = TrendWindow::new(date(2024, 1, 15), date(2024, 1, 21)).unwrap();
        let previous = window.previous().unwrap();

        assert_eq!(previous.from, date(2024, 1, 8));
        assert_eq!(previous.to, date(2024, 1, 14));
        assert_eq!(previous.len_days(), window.len_days());
    }

    #[test]
    fn test_days_and_contains() {
        let window = TrendWindow::new(date(2024, 2, 27), date(2024, 3, 1)).unwrap();
        let days: Vec<_> = window.days().collect();

        assert_eq!(days.len(), 4);
        assert_eq!(days[2], date(2024, 2, 29));
        assert!(window.contains(date(2024, 3, 1)));
        assert!(!window.contains(date(2024, 3, 2)));
    }

    #[test]
    fn test_fill_zeroes_missing_days() {
        let window = TrendWindow::new(date(2024, 1, 15), date(2024, 1, 18)).unwrap();
        let series = vec![
            DailyMetric::new(date(2024, 1, 15), 100, 90),
            DailyMetric::new(date(2024, 1, 17), 100, 80),
            DailyMetric::new(date(2024, 1, 18), 100, 70),
        ];
        let filled = window.fill(&series);

        let dates: Vec<_> = filled.iter().map(|d| d.date).collect();
        assert_eq!(dates, window.days().collect::<Vec<_>>());
        assert_eq!(filled[1], DailyMetric::new(date(2024, 1, 16), 0, 0));
        assert_eq!(filled[2].present, 80);
    }

    #[test]
    fn test_fill_drops_outside_and_sums_repeats() {
        let window = TrendWindow::new(date(2024, 1, 12), date(2024, 1, 13)).unwrap();
        let series = vec![
            DailyMetric::new(date(2024, 1, 11), 500, 500),
            DailyMetric::new(date(2024, 1, 13), 40, 30),
            DailyMetric::new(date(2024, 1, 13), 60, 50),
        ];
        let filled = window.fill(&series);

        assert_eq!(filled.len(), 2);
        assert_eq!(filled[0].roster, 0);
        assert_eq!(filled[1], DailyMetric::new(date(2024, 1, 13), 100, 80));
    }

    #[test]
    fn test_fill_aligns_previous_window_by_offset() {
        let window = TrendWindow::new(date(2024, 1, 15), date(2024, 1, 18)).unwrap();
        let previous = window.previous().unwrap();
        let current = window.fill(&[
            DailyMetric::new(date(2024, 1, 15), 100, 90),
            DailyMetric::new(date(2024, 1, 17), 100, 80),
        ]);
        let baseline = previous.fill(&[
            DailyMetric::new(date(2024, 1, 12), 100, 60),
            DailyMetric::new(date(2024, 1, 13), 100, 70),
            DailyMetric::new(date(2024, 1, 14), 100, 75),
        ]);

        assert_eq!(baseline[0].date, date(2024, 1, 11));
        for (cur, prev) in current.iter().zip(&baseline) {
            assert_eq!((cur.date - prev.date).num_days(), 4);
        }
        assert_eq!(baseline[3].present, 75);
    }
}
