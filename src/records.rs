//! Per-bus occupancy rows and the CSV loaders that read them.
//!
//! Records arrive already filtered by date range, shift, plant and route; this
//! module only derives the per-bus totals and rates used everywhere else.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use tracing::debug;

use crate::trends::DailyMetric;

/// One bus over one query window.
///
/// Van riders are assigned to a bus, so utilization is measured as
/// `total_present` against `bus_capacity` alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusOccupancyRecord {
    pub bus_id: String,
    #[serde(default)]
    pub route: Option<String>,
    /// Plant/building code. `None` means the bus is not in the master roster.
    #[serde(default, alias = "building_id", alias = "plant")]
    pub organizational_code: Option<String>,
    pub bus_capacity: u64,
    #[serde(default)]
    pub van_count: u64,
    #[serde(default)]
    pub van_capacity: u64,
    pub bus_present: u64,
    #[serde(default)]
    pub van_present: u64,
    #[serde(default)]
    pub bus_roster: u64,
    #[serde(default)]
    pub van_roster: u64,
}

impl BusOccupancyRecord {
    pub fn total_capacity(&self) -> u64 {
        self.bus_capacity + self.van_capacity
    }

    pub fn total_present(&self) -> u64 {
        self.bus_present + self.van_present
    }

    pub fn total_roster(&self) -> u64 {
        self.bus_roster + self.van_roster
    }

    /// `total_present / bus_capacity * 100`, or `0` for a bus with no seats.
    pub fn utilization_pct(&self) -> f64 {
        pct(self.total_present(), self.bus_capacity)
    }

    pub fn attendance_rate_pct(&self) -> f64 {
        pct(self.total_present(), self.total_roster())
    }

    /// Route name, treating an empty string as missing.
    pub fn route_name(&self) -> Option<&str> {
        self.route.as_deref().filter(|r| !r.trim().is_empty())
    }
}

/// Percentage of `part` in `total`, zero-guarded.
pub fn pct(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Loads occupancy records from a CSV file. Paths ending in `.gz` are
/// decompressed on the fly.
pub fn load_records(path: &str) -> Result<Vec<BusOccupancyRecord>> {
    let records = read_records(open(path)?).with_context(|| format!("reading {path}"))?;
    debug!(path, rows = records.len(), "Loaded occupancy records");
    Ok(records)
}

/// Parses occupancy records from any CSV source with a header row.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<BusOccupancyRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: BusOccupancyRecord = result?;
        rows.push(record);
    }

    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct DailyRow {
    date: NaiveDate,
    roster: u64,
    present: u64,
}

/// Loads a `date,roster,present` CSV into daily trend points.
pub fn load_daily_metrics(path: &str) -> Result<Vec<DailyMetric>> {
    let metrics = read_daily_metrics(open(path)?).with_context(|| format!("reading {path}"))?;
    debug!(path, days = metrics.len(), "Loaded daily metrics");
    Ok(metrics)
}

pub fn read_daily_metrics<R: Read>(reader: R) -> Result<Vec<DailyMetric>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut metrics = Vec::new();
    for result in rdr.deserialize() {
        let row: DailyRow = result?;
        metrics.push(DailyMetric::new(row.date, row.roster, row.present));
    }

    Ok(metrics)
}

fn open(path: &str) -> Result<Box<dyn Read>> {
    let file = File::open(path).with_context(|| format!("opening {path}"))?;
    if path.ends_with(".gz") {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}
