//! Core data types for hourly forecast samples

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Accepted local wall-clock layouts, tried in order before RFC 3339.
const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Highest WMO weather code that carries a meaning.
const MAX_WEATHER_CODE: i64 = 99;

/// One hourly forecast observation.
///
/// The timestamp is a local wall-clock time: day and hour are derived from
/// it directly, with no timezone conversion. Every other field is optional
/// and `None` means "no observation".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: NaiveDateTime,

    /// Air temperature at 2 m (°C)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Relative humidity at 2 m (%)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,

    /// Precipitation over the hour (mm)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precipitation: Option<f64>,

    /// Wind gust at 10 m (km/h)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_gust: Option<f64>,

    /// Total cloud cover (%)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_cover: Option<f64>,

    /// WMO weather interpretation code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_code: Option<u8>,
}

impl Sample {
    /// A sample at `time` with no observations.
    pub fn new(time: NaiveDateTime) -> Self {
        Self {
            time,
            temperature: None,
            humidity: None,
            precipitation: None,
            wind_gust: None,
            cloud_cover: None,
            weather_code: None,
        }
    }

    pub fn with_temperature(mut self, celsius: f64) -> Self {
        self.temperature = Some(celsius);
        self
    }

    pub fn with_humidity(mut self, percent: f64) -> Self {
        self.humidity = Some(percent);
        self
    }

    pub fn with_precipitation(mut self, mm: f64) -> Self {
        self.precipitation = Some(mm);
        self
    }

    pub fn with_wind_gust(mut self, kmh: f64) -> Self {
        self.wind_gust = Some(kmh);
        self
    }

    pub fn with_cloud_cover(mut self, percent: f64) -> Self {
        self.cloud_cover = Some(percent);
        self
    }

    pub fn with_weather_code(mut self, code: u8) -> Self {
        self.weather_code = Some(code);
        self
    }

    /// Local calendar date of the sample
    pub fn date(&self) -> NaiveDate {
        self.time.date()
    }

    /// Local hour of the sample (0-23)
    pub fn hour(&self) -> u32 {
        self.time.hour()
    }

    /// Convert a raw row into a validated sample.
    ///
    /// `index` is the row's position in the input and is only used for the
    /// error report.
    pub fn from_raw(index: usize, raw: RawSample) -> CoreResult<Self> {
        let text = raw.time.as_deref().map(str::trim).unwrap_or_default();
        if text.is_empty() {
            return Err(CoreError::InvalidSample {
                index,
                reason: "missing timestamp".to_string(),
            });
        }
        let time = parse_timestamp(text).ok_or_else(|| CoreError::InvalidSample {
            index,
            reason: format!("unparseable timestamp {text:?}"),
        })?;

        Ok(Self {
            time,
            temperature: finite(raw.temperature),
            humidity: finite(raw.humidity).map(clamp_percent),
            precipitation: finite(raw.precipitation).map(|v| v.max(0.0)),
            wind_gust: finite(raw.wind_gust).map(|v| v.max(0.0)),
            cloud_cover: finite(raw.cloud_cover).map(clamp_percent),
            weather_code: raw
                .weather_code
                .filter(|code| (0..=MAX_WEATHER_CODE).contains(code))
                .map(|code| code as u8),
        })
    }
}

/// An hourly row as delivered by a forecast source, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub precipitation: Option<f64>,
    #[serde(default)]
    pub wind_gust: Option<f64>,
    #[serde(default)]
    pub cloud_cover: Option<f64>,
    #[serde(default)]
    pub weather_code: Option<i64>,
}

/// Validate a whole series.
///
/// Fails on the first row without a usable timestamp; nothing is skipped.
pub fn ingest<I>(rows: I) -> CoreResult<Vec<Sample>>
where
    I: IntoIterator<Item = RawSample>,
{
    rows.into_iter()
        .enumerate()
        .map(|(index, raw)| Sample::from_raw(index, raw))
        .collect()
}

/// Parse a local timestamp.
///
/// Offset-carrying RFC 3339 input keeps its own wall clock; the offset is
/// not applied.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.naive_local())
        })
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn clamp_percent(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}
