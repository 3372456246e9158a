//! Runtime configuration for index computation.
//!
//! [`AqiConfig`] is built once at startup and passed by reference into every
//! computation. Nothing in the core reads global state.

use std::path::Path;
use tracing::info;

use crate::aqi::{BreakpointTable, ScaleScheme};
use crate::error::Result;

/// Breakpoints plus the severity scheme used at every hierarchy level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AqiConfig {
    pub breakpoints: BreakpointTable,
    pub scheme: ScaleScheme,
}

impl AqiConfig {
    pub fn new(breakpoints: BreakpointTable, scheme: ScaleScheme) -> Self {
        Self { breakpoints, scheme }
    }

    /// CPCB breakpoints, optionally overridden from a JSON file.
    pub fn load(scheme: ScaleScheme, breakpoints_path: Option<&Path>) -> Result<Self> {
        let breakpoints = match breakpoints_path {
            Some(path) => {
                info!(path = %path.display(), "Loading breakpoint overrides");
                BreakpointTable::cpcb().with_overrides_from(path)?
            }
            None => BreakpointTable::cpcb(),
        };

        info!(
            scheme = %scheme,
            pollutants = breakpoints.pollutants().count(),
            "AQI configuration ready"
        );

        Ok(Self { breakpoints, scheme })
    }
}
