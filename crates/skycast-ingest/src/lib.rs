//! Forecast sources
//!
//! A source turns a coordinate into an hourly forecast series. The live
//! source calls the Open-Meteo forecast API; the file source replays a
//! saved response. A geocoder turns place names into coordinates and
//! coordinates into display names. Retries are left to the caller.

pub mod file;
pub mod geocode;
pub mod open_meteo;

pub use file::*;
pub use geocode::*;
pub use open_meteo::*;

use serde::{Deserialize, Serialize};
use skycast_core::{CoreError, Sample};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned status {0}")]
    Upstream(u16),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid forecast payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid coordinate: {0}")]
    InvalidCoord(String),

    #[error("No place found for {0:?}")]
    NotFound(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type IngestResult<T> = Result<T, IngestError>;

/// Geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coord {
    pub fn new(latitude: f64, longitude: f64) -> IngestResult<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(IngestError::InvalidCoord(format!(
                "latitude {latitude} outside [-90, 90]"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(IngestError::InvalidCoord(format!(
                "longitude {longitude} outside [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// A validated hourly series for one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub coord: Coord,
    /// IANA timezone the timestamps are expressed in, when the source reports it
    pub timezone: Option<String>,
    pub samples: Vec<Sample>,
}

/// Trait for all forecast sources
#[async_trait::async_trait]
pub trait ForecastSource: Send + Sync {
    /// Source name/identifier
    fn name(&self) -> &str;

    /// Fetch the hourly series around `coord`
    async fn fetch(&self, coord: Coord) -> IngestResult<Forecast>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coord_validation() {
        assert!(Coord::new(-12.97, -38.51).is_ok());
        assert!(Coord::new(90.0, 180.0).is_ok());
        assert!(matches!(
            Coord::new(91.0, 0.0),
            Err(IngestError::InvalidCoord(_))
        ));
        assert!(Coord::new(0.0, -180.5).is_err());
        assert!(Coord::new(f64::NAN, 0.0).is_err());
    }
}
