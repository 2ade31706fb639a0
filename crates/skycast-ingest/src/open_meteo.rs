//! Open-Meteo hourly forecast decoding and HTTP source

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use skycast_core::{ingest, RawSample};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::{Coord, Forecast, ForecastSource, IngestError, IngestResult};

/// Hourly variables requested from the API, in column order
pub const HOURLY_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,precipitation,wind_gusts_10m,cloud_cover,weather_code";

/// Forecast API response (only the parts we read)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenMeteoResponse {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub timezone: Option<String>,
    pub hourly: HourlyColumns,
}

/// Column-oriented hourly block. Every column is indexed like `time`;
/// a short or absent column simply has no observation for those hours.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HourlyColumns {
    #[serde(default)]
    pub time: Vec<Option<String>>,
    #[serde(default)]
    pub temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_gusts_10m: Vec<Option<f64>>,
    #[serde(default)]
    pub cloud_cover: Vec<Option<f64>>,
    #[serde(default)]
    pub weather_code: Vec<Option<i64>>,
}

impl HourlyColumns {
    /// Transpose the columns into one raw row per timestamp
    pub fn rows(&self) -> Vec<RawSample> {
        self.time
            .iter()
            .enumerate()
            .map(|(i, time)| RawSample {
                time: time.clone(),
                temperature: cell(&self.temperature_2m, i),
                humidity: cell(&self.relative_humidity_2m, i),
                precipitation: cell(&self.precipitation, i),
                wind_gust: cell(&self.wind_gusts_10m, i),
                cloud_cover: cell(&self.cloud_cover, i),
                weather_code: cell(&self.weather_code, i),
            })
            .collect()
    }
}

fn cell<T: Copy>(column: &[Option<T>], i: usize) -> Option<T> {
    column.get(i).copied().flatten()
}

impl OpenMeteoResponse {
    /// Validate every row. A row without a usable timestamp fails the whole response.
    pub fn into_forecast(self) -> IngestResult<Forecast> {
        let samples = ingest(self.hourly.rows())?;
        Ok(Forecast {
            coord: Coord {
                latitude: self.latitude,
                longitude: self.longitude,
            },
            timezone: self.timezone,
            samples,
        })
    }
}

#[derive(Debug, Clone)]
pub struct OpenMeteoSettings {
    pub base_url: String,
    pub model: String,
    pub timezone: String,
    pub forecast_days: u8,
    pub timeout: Duration,
}

impl Default for OpenMeteoSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            model: "ecmwf_ifs".to_string(),
            timezone: "auto".to_string(),
            forecast_days: 15,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Live source backed by the Open-Meteo forecast API
#[derive(Debug, Clone)]
pub struct OpenMeteoSource {
    client: Client,
    settings: OpenMeteoSettings,
}

impl OpenMeteoSource {
    pub fn new(settings: OpenMeteoSettings) -> IngestResult<Self> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &OpenMeteoSettings {
        &self.settings
    }

    /// Build the forecast request URL for a coordinate
    pub fn request_url(&self, coord: Coord) -> IngestResult<Url> {
        let url = Url::parse_with_params(
            &self.settings.base_url,
            &[
                ("latitude", coord.latitude.to_string()),
                ("longitude", coord.longitude.to_string()),
                ("hourly", HOURLY_FIELDS.to_string()),
                ("models", self.settings.model.clone()),
                ("timezone", self.settings.timezone.clone()),
                ("forecast_days", self.settings.forecast_days.to_string()),
            ],
        )?;
        Ok(url)
    }
}

#[async_trait::async_trait]
impl ForecastSource for OpenMeteoSource {
    fn name(&self) -> &str {
        "open-meteo"
    }

    #[instrument(skip(self), fields(lat = coord.latitude, lon = coord.longitude))]
    async fn fetch(&self, coord: Coord) -> IngestResult<Forecast> {
        let url = self.request_url(coord)?;
        debug!(%url, "requesting forecast");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "forecast request rejected");
            return Err(IngestError::Upstream(status.as_u16()));
        }

        let body: OpenMeteoResponse = response.json().await?;
        let forecast = body.into_forecast()?;
        debug!(hours = forecast.samples.len(), "forecast received");
        Ok(forecast)
    }
}
