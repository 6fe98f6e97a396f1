use chrono::{NaiveDate, Weekday};
use std::collections::BTreeMap;
use tracing::debug;

use crate::records::pct;
use crate::trends::metrics::{DailyMetric, WeeklyMetric};

#[derive(Default)]
struct WeekTotals {
    days: usize,
    roster: u64,
    present: u64,
}

/// Collapses daily points into Monday-start weeks, ascending by week.
///
/// Each week's roster and present are the daily averages rounded half away
/// from zero (`2.5` → `3`). The attendance rate is
/// `sum(present) / sum(roster) * 100` over the week's days, so a small-roster
/// day weighs only as much as its headcount. Partial weeks keep their real
/// day count; nothing is padded.
///
/// Input order does not matter.
pub fn aggregate_to_weekly(daily: &[DailyMetric]) -> Vec<WeeklyMetric> {
    let mut weeks: BTreeMap<NaiveDate, WeekTotals> = BTreeMap::new();

    for point in daily {
        let week_start = point.date.week(Weekday::Mon).first_day();
        let totals = weeks.entry(week_start).or_default();
        totals.days += 1;
        totals.roster += point.roster;
        totals.present += point.present;
    }

    let weekly: Vec<WeeklyMetric> = weeks
        .into_iter()
        .map(|(week_start, totals)| WeeklyMetric {
            week_start,
            week_end: week_start.week(Weekday::Mon).last_day(),
            days: totals.days,
            roster: daily_average(totals.roster, totals.days),
            present: daily_average(totals.present, totals.days),
            attendance_rate_pct: pct(totals.present, totals.roster),
        })
        .collect();

    debug!(
        days = daily.len(),
        weeks = weekly.len(),
        "Aggregated daily metrics to weeks"
    );

    weekly
}

fn daily_average(total: u64, days: usize) -> u64 {
    if days == 0 {
        return 0;
    }
    (total as f64 / days as f64).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32, roster: u64, present: u64) -> DailyMetric {
        DailyMetric::new(NaiveDate::from_ymd_opt(y, m, d).unwrap(), roster, present)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_empty() {
        assert!(aggregate_to_weekly(&[]).is_empty());
    }

    #[test]
    fn test_rate_from_sums_not_average_of_rates() {
        // Monday and Tuesday of the same week.
        let daily = vec![day(2024, 1, 15, 100, 90), day(2024, 1, 16, 50, 10)];
        let weekly = aggregate_to_weekly(&daily);

        assert_eq!(weekly.len(), 1);
        let expected = 100.0 * 100.0 / 150.0;
        assert!((weekly[0].attendance_rate_pct - expected).abs() < 1e-9);
        assert!((weekly[0].attendance_rate_pct - 55.0).abs() > 1.0);
        assert_eq!(weekly[0].roster, 75);
        assert_eq!(weekly[0].present, 50);
        assert_eq!(weekly[0].days, 2);
    }

    #[test]
    fn test_rounds_half_away_from_zero() {
        let daily = vec![day(2024, 1, 15, 1, 2), day(2024, 1, 16, 2, 3)];
        let weekly = aggregate_to_weekly(&daily);

        // 3 / 2 = 1.5 -> 2, 5 / 2 = 2.5 -> 3
        assert_eq!(weekly[0].roster, 2);
        assert_eq!(weekly[0].present, 3);
    }

    #[test]
    fn test_monday_start_and_sunday_end() {
        // Sunday 2024-01-21 belongs to the week of Monday 2024-01-15.
        let daily = vec![
            day(2024, 1, 21, 10, 10),
            day(2024, 1, 22, 10, 5),
            day(2024, 1, 15, 10, 0),
        ];
        let weekly = aggregate_to_weekly(&daily);

        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly[0].week_start, date(2024, 1, 15));
        assert_eq!(weekly[0].week_end, date(2024, 1, 21));
        assert_eq!(weekly[0].days, 2);
        assert_eq!(weekly[0].attendance_rate_pct, 50.0);
        assert_eq!(weekly[1].week_start, date(2024, 1, 22));
        assert_eq!(weekly[1].days, 1);
    }

    #[test]
    fn test_order_independent() {
        let mut daily = vec![
            day(2024, 2, 1, 40, 30),
            day(2024, 1, 29, 40, 35),
            day(2024, 2, 6, 40, 20),
            day(2024, 2, 5, 40, 25),
        ];
        let forward = aggregate_to_weekly(&daily);
        daily.reverse();
        let backward = aggregate_to_weekly(&daily);

        assert_eq!(forward, backward);
        assert!(forward.windows(2).all(|w| w[0].week_start < w[1].week_start));
    }

    #[test]
    fn test_zero_roster_week() {
        let weekly = aggregate_to_weekly(&[day(2024, 1, 17, 0, 0)]);
        assert_eq!(weekly[0].attendance_rate_pct, 0.0);
        assert_eq!(weekly[0].week_start, date(2024, 1, 15));
    }
}
