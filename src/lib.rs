pub mod aqi;
pub mod config;
pub mod error;
pub mod leaderboard;
pub mod metadata;
pub mod output;
pub mod parser;
pub mod rollup;

pub use aqi::compute_index;
pub use config::AqiConfig;
pub use error::{Error, Result};
pub use metadata::HierarchyMetadata;
pub use rollup::{aggregate, run_cycles, run_rollup};
