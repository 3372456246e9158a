use anyhow::{Context, Result};
use aqi_rollup::HierarchyMetadata;
use std::path::PathBuf;

use crate::services::sources::MetadataSource;

/// Reads `cities.csv`, `states.csv` and `countries.csv` from one directory.
pub struct CsvMetadataSource {
    dir: PathBuf,
}

impl CsvMetadataSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait::async_trait]
impl MetadataSource for CsvMetadataSource {
    async fn load_metadata(&self) -> Result<HierarchyMetadata> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || HierarchyMetadata::load_dir(&dir))
            .await?
            .with_context(|| format!("failed to load metadata from {}", self.dir.display()))
    }
}
