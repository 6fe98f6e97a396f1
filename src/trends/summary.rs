use chrono::NaiveDate;
use serde::Serialize;

use crate::records::pct;
use crate::trends::metrics::DailyMetric;
use crate::trends::window::TrendWindow;

/// Changes smaller than this many points read as stable.
const STABLE_BAND_PP: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

/// Totals over a trend window, with the change against the previous window
/// when one was supplied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSummary {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub total_roster: u64,
    pub total_present: u64,
    pub avg_attendance_rate_pct: f64,
    pub prev_avg_attendance_rate_pct: Option<f64>,
    /// Percentage points.
    pub attendance_rate_change_pp: Option<f64>,
}

impl TrendSummary {
    /// An empty `previous` series counts as no baseline.
    pub fn new(
        window: &TrendWindow,
        current: &[DailyMetric],
        previous: Option<&[DailyMetric]>,
    ) -> Self {
        let (total_roster, total_present) = totals(current);
        let avg_attendance_rate_pct = pct(total_present, total_roster);

        let prev_avg_attendance_rate_pct = previous
            .filter(|p| !p.is_empty())
            .map(|p| {
                let (roster, present) = totals(p);
                pct(present, roster)
            });

        Self {
            date_from: window.from,
            date_to: window.to,
            total_roster,
            total_present,
            avg_attendance_rate_pct,
            prev_avg_attendance_rate_pct,
            attendance_rate_change_pp: prev_avg_attendance_rate_pct
                .map(|prev| avg_attendance_rate_pct - prev),
        }
    }

    pub fn direction(&self) -> Option<TrendDirection> {
        self.attendance_rate_change_pp.map(|change| {
            if change.abs() < STABLE_BAND_PP {
                TrendDirection::Stable
            } else if change > 0.0 {
                TrendDirection::Up
            } else {
                TrendDirection::Down
            }
        })
    }
}

fn totals(series: &[DailyMetric]) -> (u64, u64) {
    series
        .iter()
        .fold((0, 0), |(roster, present), d| (roster + d.roster, present + d.present))
}
