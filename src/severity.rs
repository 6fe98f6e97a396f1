//! Severity tiers for bus utilization.

use serde::Serialize;
use std::fmt;

/// Severity of a single bus's utilization.
///
/// Variants are declared worst-first so the derived `Ord` sorts critical
/// buses ahead of warning and normal ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Normal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Normal => "normal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Utilization bands, in percent of bus-only capacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityThresholds {
    pub critical_above: f64,
    pub critical_below: f64,
    pub warning_above: f64,
    pub warning_below: f64,
}

impl SeverityThresholds {
    /// The fleet-wide bands. Not configurable per call.
    pub const FIXED: SeverityThresholds = SeverityThresholds {
        critical_above: 120.0,
        critical_below: 10.0,
        warning_above: 100.0,
        warning_below: 30.0,
    };

    /// Maps a utilization percentage into a tier.
    ///
    /// | Utilization          | Severity |
    /// |----------------------|----------|
    /// | > 120 or < 10        | critical |
    /// | > 100 or < 30        | warning  |
    /// | 30 ..= 100           | normal   |
    ///
    /// Bounds are exclusive, so exactly 100 is a warning and exactly 30 is normal.
    pub fn classify(&self, utilization_pct: f64) -> Severity {
        match utilization_pct {
            u if u > self.critical_above || u < self.critical_below => Severity::Critical,
            u if u > self.warning_above || u < self.warning_below => Severity::Warning,
            _ => Severity::Normal,
        }
    }
}

/// Classifies a utilization percentage against [`SeverityThresholds::FIXED`].
pub fn classify(utilization_pct: f64) -> Severity {
    SeverityThresholds::FIXED.classify(utilization_pct)
}
