//! File-backed source replaying a saved Open-Meteo response

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{Coord, Forecast, ForecastSource, IngestResult, OpenMeteoResponse};

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl ForecastSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    /// The saved response is returned whatever the coordinate
    async fn fetch(&self, coord: Coord) -> IngestResult<Forecast> {
        debug!(path = %self.path.display(), ?coord, "replaying saved forecast");
        let bytes = tokio::fs::read(&self.path).await?;
        let response: OpenMeteoResponse = serde_json::from_slice(&bytes)?;
        response.into_forecast()
    }
}
