//! Traits for the collaborators that feed the rollup core.

use anyhow::Result;
use aqi_rollup::HierarchyMetadata;
use aqi_rollup::rollup::RawReading;

/// Supplies raw pollutant readings for one or more ingestion cycles.
#[async_trait::async_trait]
pub trait ReadingSource: Send + Sync {
    async fn load_readings(&self) -> Result<Vec<RawReading>>;
}

/// Supplies the static city → region → country reference data.
#[async_trait::async_trait]
pub trait MetadataSource: Send + Sync {
    async fn load_metadata(&self) -> Result<HierarchyMetadata>;
}
