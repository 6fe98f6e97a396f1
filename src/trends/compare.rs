//! Period-over-period deltas.
//!
//! Counts are compared as plain differences and rates as percentage-point
//! differences. Relative percent change is never used.

use chrono::NaiveDate;
use serde::Serialize;

use crate::trends::metrics::{DailyMetric, TrendPoint, WeeklyMetric};

/// A value that can be diffed against the same kind of value from a
/// previous period.
pub trait Comparable {
    type Delta;

    fn delta(&self, previous: &Self) -> Self::Delta;
}

/// Diffs `current` against `previous`.
///
/// Returns `None` when there is no baseline; that is "no comparison
/// available", not zero change.
pub fn compare<T: Comparable>(current: &T, previous: Option<&T>) -> Option<T::Delta> {
    previous.map(|previous| current.delta(previous))
}

/// Diffs two series position by position.
///
/// Buckets are matched by index, not by date: position `i` of `previous` is
/// taken to be the same relative day or week as position `i` of `current`.
/// The caller supplies series of the same granularity; the output stops at
/// the shorter of the two. Sparse daily rows should go through
/// [`TrendWindow::fill`](crate::trends::TrendWindow::fill) first.
pub fn compare_series<T: Comparable>(
    current: &[T],
    previous: Option<&[T]>,
) -> Option<Vec<T::Delta>> {
    previous.map(|previous| {
        current
            .iter()
            .zip(previous)
            .map(|(current, previous)| current.delta(previous))
            .collect()
    })
}

/// Difference between two unsigned counts.
pub fn count_delta(current: u64, previous: u64) -> i64 {
    current as i64 - previous as i64
}

/// Delta between two aligned trend points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesDelta {
    pub period_start: NaiveDate,
    pub previous_period_start: NaiveDate,
    pub roster: i64,
    pub present: i64,
    /// Percentage points.
    pub attendance_rate_pp: f64,
}

fn series_delta<P: TrendPoint>(current: &P, previous: &P) -> SeriesDelta {
    SeriesDelta {
        period_start: current.period_start(),
        previous_period_start: previous.period_start(),
        roster: count_delta(current.roster(), previous.roster()),
        present: count_delta(current.present(), previous.present()),
        attendance_rate_pp: current.attendance_rate_pct() - previous.attendance_rate_pct(),
    }
}

impl Comparable for DailyMetric {
    type Delta = SeriesDelta;

    fn delta(&self, previous: &Self) -> SeriesDelta {
        series_delta(self, previous)
    }
}

impl Comparable for WeeklyMetric {
    type Delta = SeriesDelta;

    fn delta(&self, previous: &Self) -> SeriesDelta {
        series_delta(self, previous)
    }
}
