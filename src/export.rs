//! CSV export of grouped occupancy and trend series.
//!
//! Rates are written with one decimal place (two for trend series), counts as
//! plain integers. Cells are quoted only when they contain a delimiter, quote
//! or line break, with `"` doubled inside quotes.

use anyhow::Result;
use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

use crate::grouping::Group;
use crate::grouping::OptimizationReport;
use crate::records::pct;
use crate::trends::TrendPoint;

/// Footer totals for an occupancy export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportSummary {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub total_bus_present: u64,
    pub total_bus_capacity: u64,
    pub total_present: u64,
    pub total_roster: u64,
}

impl ExportSummary {
    pub fn from_groups(groups: &[Group], date_from: NaiveDate, date_to: NaiveDate) -> Self {
        Self {
            date_from,
            date_to,
            total_bus_present: groups.iter().map(|g| g.total_bus_present).sum(),
            total_bus_capacity: groups.iter().map(|g| g.total_bus_capacity).sum(),
            total_present: groups.iter().map(|g| g.total_present).sum(),
            total_roster: groups.iter().map(|g| g.total_roster).sum(),
        }
    }

    /// All riders over bus-only seats.
    pub fn utilization_pct(&self) -> f64 {
        pct(self.total_present, self.total_bus_capacity)
    }

    pub fn attendance_rate_pct(&self) -> f64 {
        pct(self.total_present, self.total_roster)
    }
}

const BUS_COLUMNS: [&str; 10] = [
    "Bus ID",
    "Route",
    "Bus Present",
    "Van Present",
    "Total Present",
    "Bus Capacity",
    "Utilization %",
    "Total Roster",
    "Attendance Rate %",
    "Status",
];

/// Renders one row per bus across all groups, a blank line, then a
/// `SUMMARY` block.
///
/// The first column holds the group key and is headed by the grouping
/// strategy (`Plant`, `Zone` or `Route`).
pub fn to_csv(groups: &[Group], summary: &ExportSummary) -> Result<String> {
    let mut writer = csv_writer(Vec::new());

    let group_column = groups.first().map_or("Group", |g| g.strategy.label());
    let mut header = vec![group_column];
    header.extend(BUS_COLUMNS);
    writer.write_record(&header)?;

    let mut rows = 0;
    for group in groups {
        for bus in &group.buses {
            let record = &bus.record;
            writer.write_record([
                group.key.clone(),
                record.bus_id.clone(),
                record.route.clone().unwrap_or_default(),
                record.bus_present.to_string(),
                record.van_present.to_string(),
                record.total_present().to_string(),
                record.bus_capacity.to_string(),
                one_decimal(bus.utilization_pct),
                record.total_roster().to_string(),
                one_decimal(record.attendance_rate_pct()),
                bus.severity.to_string(),
            ])?;
            rows += 1;
        }
    }

    let mut writer = blank_line(writer)?;
    writer.write_record(["SUMMARY"])?;
    writer.write_record([
        "Date Range".to_string(),
        format!("{} to {}", summary.date_from, summary.date_to),
    ])?;
    let footer = [
        ("Total Bus Present", summary.total_bus_present.to_string()),
        ("Total Bus Capacity", summary.total_bus_capacity.to_string()),
        ("Overall Utilization %", one_decimal(summary.utilization_pct())),
        ("Total Present", summary.total_present.to_string()),
        ("Total Roster", summary.total_roster.to_string()),
    ];
    for (label, value) in footer {
        writer.write_record([label.to_string(), value])?;
    }
    writer.write_record([
        "Overall Attendance Rate %".to_string(),
        one_decimal(summary.attendance_rate_pct()),
    ])?;

    let bytes = writer.into_inner()?;
    debug!(groups = groups.len(), rows, bytes = bytes.len(), "Rendered occupancy CSV");
    Ok(String::from_utf8(bytes)?)
}

/// Renders the consolidation suggestions, a blank line, then the per-plant
/// fleet reduction with a `TOTAL` row.
pub fn optimization_to_csv(report: &OptimizationReport) -> Result<String> {
    let mut writer = csv_writer(Vec::new());

    writer.write_record(["CONSOLIDATION OPPORTUNITIES"])?;
    writer.write_record(["Route", "Plant", "Buses to Combine", "Buses Removable"])?;
    for c in &report.consolidations {
        let buses: Vec<&str> = c.buses.iter().map(|b| b.bus_id.as_str()).collect();
        writer.write_record([
            c.route.clone(),
            c.plant.clone(),
            buses.join(" + "),
            c.removable.to_string(),
        ])?;
    }

    let mut writer = blank_line(writer)?;
    writer.write_record(["FLEET REDUCTION SUMMARY"])?;
    writer.write_record(["Plant", "Current Buses", "Optimal Buses", "Can Remove"])?;
    for f in &report.fleet_reduction {
        writer.write_record([
            f.plant.clone(),
            f.current_buses.to_string(),
            f.optimal_buses.to_string(),
            f.removable.to_string(),
        ])?;
    }
    writer.write_record([
        "TOTAL".to_string(),
        String::new(),
        String::new(),
        report.total_removable().to_string(),
    ])?;

    Ok(String::from_utf8(writer.into_inner()?)?)
}

/// Renders a daily or weekly series as `Date,Roster,Present,Attendance Rate %`.
pub fn trend_to_csv<P: TrendPoint>(points: &[P]) -> Result<String> {
    let mut writer = csv_writer(Vec::new());

    writer.write_record(["Date", "Roster", "Present", "Attendance Rate %"])?;
    for point in points {
        writer.write_record([
            point.period_start().to_string(),
            point.roster().to_string(),
            point.present().to_string(),
            format!("{:.2}", point.attendance_rate_pct()),
        ])?;
    }

    Ok(String::from_utf8(writer.into_inner()?)?)
}

/// Writes rendered CSV text to `path`, creating parent directories.
pub fn write_csv(path: &str, contents: &str) -> Result<()> {
    if let Some(dir) = Path::new(path).parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, contents)?;
    info!(path, bytes = contents.len(), "Wrote CSV export");
    Ok(())
}

/// Rows differ in width between the bus table and the summary block.
fn csv_writer(buf: Vec<u8>) -> Writer<Vec<u8>> {
    WriterBuilder::new()
        .flexible(true)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(buf)
}

/// Ends the current block with an empty line and continues on the same buffer.
fn blank_line(writer: Writer<Vec<u8>>) -> Result<Writer<Vec<u8>>> {
    let mut bytes = writer.into_inner()?;
    bytes.push(b'\n');
    Ok(csv_writer(bytes))
}

fn one_decimal(value: f64) -> String {
    format!("{:.1}", value)
}
