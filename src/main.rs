//! CLI entry point for the fleet occupancy engine.
//!
//! Provides subcommands for grouping a snapshot of bus records, rolling daily
//! attendance into trends, comparing two periods, finding buses to
//! consolidate, and exporting CSV reports.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use fleet_occupancy::export::{
    ExportSummary, optimization_to_csv, to_csv, trend_to_csv, write_csv,
};
use fleet_occupancy::grouping::{GroupStrategy, GroupingConfig, OptimizationReport, group_by};
use fleet_occupancy::records::{load_daily_metrics, load_records};
use fleet_occupancy::trends::{
    FleetKpis, TrendSummary, TrendWindow, aggregate_to_weekly, compare, compare_series,
};
use serde_json::json;
use std::ffi::OsStr;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "fleet_occupancy")]
#[command(about = "Bus occupancy grouping, trends and exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum GroupBy {
    Plant,
    Zone,
    Route,
}

impl From<GroupBy> for GroupStrategy {
    fn from(by: GroupBy) -> Self {
        match by {
            GroupBy::Plant => GroupStrategy::ByPlant,
            GroupBy::Zone => GroupStrategy::ByZone,
            GroupBy::Route => GroupStrategy::ByRoute,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Group occupancy records and print the groups as JSON
    Group {
        /// CSV of per-bus occupancy records (.csv or .csv.gz)
        #[arg(short, long)]
        input: String,

        #[arg(short, long, value_enum, default_value_t = GroupBy::Plant)]
        by: GroupBy,

        /// JSON grouping config (defaults to $FLEET_GROUPING_CONFIG)
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Summarize a daily attendance series, optionally by week and against a previous period
    Trend {
        /// CSV of date,roster,present rows
        #[arg(short, long)]
        input: String,

        /// Series for the window of equal length just before this one
        #[arg(short, long)]
        previous: Option<String>,

        /// First day of the window (YYYY-MM-DD); defaults to the earliest row
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day of the window (YYYY-MM-DD); defaults to the latest row
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Roll the series up into Monday-start weeks
        #[arg(short, long, default_value_t = false)]
        weekly: bool,

        /// Optional: write the (weekly) series to this CSV file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Compare fleet KPIs of two record snapshots
    Compare {
        /// Current-period records
        #[arg(short, long)]
        input: String,

        /// Previous-period records
        #[arg(short, long)]
        previous: String,

        #[arg(short, long)]
        config: Option<String>,
    },
    /// Suggest bus consolidations and fleet reductions per plant
    Optimize {
        #[arg(short, long)]
        input: String,

        #[arg(short, long)]
        config: Option<String>,

        /// Optional: write consolidation and fleet reduction tables to this CSV file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Write grouped records and a summary block to CSV
    Export {
        #[arg(short, long)]
        input: String,

        /// First day of the reported range (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Last day of the reported range (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,

        #[arg(short, long, value_enum, default_value_t = GroupBy::Plant)]
        by: GroupBy,

        #[arg(short, long)]
        config: Option<String>,

        /// Output file; defaults to bus-analytics-<from>-to-<to>.csv
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/fleet_occupancy.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("fleet_occupancy.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Group { input, by, config } => {
            group_command(&input, by.into(), config)?;
        }
        Commands::Trend {
            input,
            previous,
            from,
            to,
            weekly,
            output,
        } => {
            trend_command(
                &input,
                previous.as_deref(),
                from,
                to,
                weekly,
                output.as_deref(),
            )?;
        }
        Commands::Compare {
            input,
            previous,
            config,
        } => {
            compare_command(&input, &previous, config)?;
        }
        Commands::Optimize {
            input,
            config,
            output,
        } => {
            optimize_command(&input, config, output.as_deref())?;
        }
        Commands::Export {
            input,
            from,
            to,
            by,
            config,
            output,
        } => {
            let output = output.unwrap_or_else(|| format!("bus-analytics-{from}-to-{to}.csv"));
            export_command(&input, from, to, by.into(), config, &output)?;
        }
    }

    Ok(())
}

/// Resolves the grouping config from `--config`, then `$FLEET_GROUPING_CONFIG`,
/// falling back to the built-in tables.
fn load_config(path: Option<String>) -> Result<GroupingConfig> {
    match path.or_else(|| std::env::var("FLEET_GROUPING_CONFIG").ok()) {
        Some(path) => {
            info!(path = %path, "Loading grouping config");
            GroupingConfig::load(&path)
        }
        None => Ok(GroupingConfig::default()),
    }
}

#[tracing::instrument(skip(config))]
fn group_command(input: &str, strategy: GroupStrategy, config: Option<String>) -> Result<()> {
    let config = load_config(config)?;
    let records = load_records(input)?;
    let groups = group_by(&records, strategy, &config);

    for group in &groups {
        info!(
            group = %group.key,
            buses = group.bus_count(),
            utilization_pct = group.avg_utilization_pct,
            critical = group.critical_count,
            warning = group.warning_count,
            "Group"
        );
    }

    println!("{}", serde_json::to_string_pretty(&groups)?);
    Ok(())
}

#[tracing::instrument]
fn trend_command(
    input: &str,
    previous: Option<&str>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    weekly: bool,
    output: Option<&str>,
) -> Result<()> {
    let rows = load_daily_metrics(input)?;
    let from = match from {
        Some(from) => from,
        None => rows.iter().map(|d| d.date).min().context("no daily rows in input")?,
    };
    let to = match to {
        Some(to) => to,
        None => rows.iter().map(|d| d.date).max().context("no daily rows in input")?,
    };
    let window = TrendWindow::new(from, to)?;

    // Both series cover every day of their window, so deltas pair equal offsets.
    let daily = window.fill(&rows);
    let previous_daily = match previous {
        Some(path) => Some(window.previous()?.fill(&load_daily_metrics(path)?)),
        None => None,
    };

    let summary = TrendSummary::new(&window, &daily, previous_daily.as_deref());
    info!(
        from = %window.from,
        to = %window.to,
        avg_attendance_rate_pct = summary.avg_attendance_rate_pct,
        change_pp = ?summary.attendance_rate_change_pp,
        "Trend summary"
    );

    let report = if weekly {
        let current = aggregate_to_weekly(&daily);
        let previous = previous_daily.as_deref().map(aggregate_to_weekly);
        let deltas = compare_series(&current, previous.as_deref());
        if let Some(path) = output {
            write_csv(path, &trend_to_csv(&current)?)?;
        }
        json!({
            "granularity": "weekly",
            "series": current,
            "deltas": deltas,
            "summary": summary,
            "direction": summary.direction(),
        })
    } else {
        let deltas = compare_series(&daily, previous_daily.as_deref());
        if let Some(path) = output {
            write_csv(path, &trend_to_csv(&daily)?)?;
        }
        json!({
            "granularity": "daily",
            "series": daily,
            "deltas": deltas,
            "summary": summary,
            "direction": summary.direction(),
        })
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tracing::instrument(skip(config))]
fn compare_command(input: &str, previous: &str, config: Option<String>) -> Result<()> {
    let config = load_config(config)?;

    let current = FleetKpis::from_groups(
        &group_by(&load_records(input)?, GroupStrategy::ByPlant, &config),
        &config,
    );
    let baseline = FleetKpis::from_groups(
        &group_by(&load_records(previous)?, GroupStrategy::ByPlant, &config),
        &config,
    );
    let deltas = compare(&current, Some(&baseline));

    let report = json!({
        "current": current,
        "previous": baseline,
        "deltas": deltas,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tracing::instrument(skip(config))]
fn optimize_command(input: &str, config: Option<String>, output: Option<&str>) -> Result<()> {
    let config = load_config(config)?;
    let groups = group_by(&load_records(input)?, GroupStrategy::ByPlant, &config);
    let report = OptimizationReport::from_groups(&groups, &config);

    info!(
        current_buses = report.total_current_buses(),
        removable = report.total_removable(),
        monthly_waste = report.cost.monthly_waste,
        "Optimization report"
    );

    if let Some(path) = output {
        write_csv(path, &optimization_to_csv(&report)?)?;
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tracing::instrument(skip(config))]
fn export_command(
    input: &str,
    from: NaiveDate,
    to: NaiveDate,
    strategy: GroupStrategy,
    config: Option<String>,
    output: &str,
) -> Result<()> {
    let config = load_config(config)?;
    let records = load_records(input)?;
    let groups = group_by(&records, strategy, &config);

    let summary = ExportSummary::from_groups(&groups, from, to);
    write_csv(output, &to_csv(&groups, &summary)?)?;

    info!(
        output,
        groups = groups.len(),
        buses = records.len(),
        "Export complete"
    );
    Ok(())
}
