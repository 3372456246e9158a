//! Air-quality index computation.
//!
//! Breakpoint tables map each pollutant's concentration to a 0–500
//! sub-index, the worst sub-index becomes the overall index, and a
//! [`ScaleScheme`] turns that into a severity scale.

pub mod breakpoints;
pub mod resolver;
pub mod scale;
pub mod subindex;
pub mod types;

pub use breakpoints::{Band, BreakpointTable};
pub use resolver::resolve;
pub use scale::ScaleScheme;
pub use subindex::sub_index;
pub use types::{AqiResult, Pollutant, PollutantReading, SubIndexResult};

use crate::config::AqiConfig;

/// Computes the index for one reading, or `None` when nothing could be scored.
pub fn compute_index(reading: &PollutantReading, config: &AqiConfig) -> Option<AqiResult> {
    resolve(reading, config)
}
