//! Attendance trends over time.
//!
//! Daily points roll up into Monday-start weeks, and any period can be
//! diffed against a previous one of the same shape.

pub mod compare;
pub mod kpis;
pub mod metrics;
pub mod summary;
pub mod weekly;
pub mod window;

pub use compare::{Comparable, SeriesDelta, compare, compare_series};
pub use kpis::{FleetKpis, KpiDeltas};
pub use metrics::{DailyMetric, TrendPoint, WeeklyMetric};
pub use summary::{TrendDirection, TrendSummary};
pub use weekly::aggregate_to_weekly;
pub use window::TrendWindow;
