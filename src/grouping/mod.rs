//! Grouping of bus records into plants, zones and routes.
//!
//! [`GroupStrategy`] picks the key, [`GroupingConfig`] supplies the lookup
//! tables behind it, and [`group_by`] builds ordered [`Group`]s with their
//! aggregates and per-bus severities. [`OptimizationReport`] reads plant
//! groups back for consolidation, right-sizing and seat-cost figures.

pub mod config;
pub mod engine;
pub mod optimization;
pub mod strategy;

pub use config::GroupingConfig;
pub use engine::{BusEntry, Group, group_by};
pub use optimization::OptimizationReport;
pub use strategy::GroupStrategy;
