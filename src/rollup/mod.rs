//! Hierarchical aggregation of city readings into region and country records.
//!
//! Each ingestion cycle runs three strictly ordered stages: raw readings are
//! resolved into city records, cities are aggregated per (region, country),
//! and regions are aggregated per country. Groups within a stage are
//! independent and aggregated in parallel.

pub mod aggregate;
pub mod pipeline;
pub mod types;
pub mod utility;

pub use aggregate::aggregate;
pub use pipeline::{run_cycles, run_rollup};
pub use types::{
    Coordinates, CycleReport, GroupBy, Level, LocationRecord, ParentKey, ParentMetadata,
    RawReading, RollupResult, StageReport,
};
