use anyhow::{Context, Result};
use aqi_rollup::parser::parse_readings;
use aqi_rollup::rollup::RawReading;
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::PathBuf;
use tracing::info;

use crate::services::sources::ReadingSource;

pub struct FileReadingSource {
    path: PathBuf,
}

impl FileReadingSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn is_gzip(&self) -> bool {
        self.path.extension().and_then(|e| e.to_str()) == Some("gz")
    }
}

#[async_trait::async_trait]
impl ReadingSource for FileReadingSource {
    async fn load_readings(&self) -> Result<Vec<RawReading>> {
        let raw = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read {}", self.path.display()))?;

        let bytes = if self.is_gzip() {
            let mut decoded = Vec::new();
            GzDecoder::new(raw.as_slice())
                .read_to_end(&mut decoded)
                .with_context(|| format!("failed to gunzip {}", self.path.display()))?;
            decoded
        } else {
            raw
        };

        let readings = parse_readings(&bytes)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;

        info!(path = %self.path.display(), readings = readings.len(), "Readings loaded");
        Ok(readings)
    }
}
