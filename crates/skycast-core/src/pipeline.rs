//! Series-to-report pipeline
//!
//! Wires bucketing, rollups, classifiers and the composer together. Each
//! day is computed from its own samples only, so days can be processed in
//! any order or in parallel.

use chrono::NaiveDate;
use serde::Serialize;

use crate::bucketing::{day_periods, group_by_day, DayBucket, DayPart, DayParts};
use crate::cloud::CloudCategory;
use crate::config::PipelineConfig;
use crate::describe::compose;
use crate::error::CoreResult;
use crate::nebulosity::{infer_nebulosity, Nebulosity};
use crate::precip::{RainIntensity, StormFrequency};
use crate::rollups::{precipitation_total, summarize_day, DailySummary};
use crate::types::{ingest, RawSample, Sample};

/// Labels for one day part (or night period).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartReport {
    pub part: DayPart,
    pub sample_count: usize,
    pub sky: Option<CloudCategory>,
    pub rain: Option<RainIntensity>,
    pub storm: Option<StormFrequency>,
    /// Precipitation total (mm), `None` for a part without samples
    pub precipitation: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayReport {
    pub date: NaiveDate,
    pub summary: DailySummary,
    pub parts: DayParts<PartReport>,
    /// Dominant sky over the whole calendar day
    pub sky: Option<CloudCategory>,
    /// Score-based fallback, only filled when the day has no cloud cover data
    pub nebulosity: Option<Nebulosity>,
    /// Description of the whole day
    pub headline: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastReport {
    pub days: Vec<DayReport>,
    /// Precipitation over the reported days only (mm). Days past
    /// `max_days` are dropped before summing, so the total always matches
    /// `days`; with a source horizon of at most `max_days` days this is
    /// the whole series.
    pub total_precipitation: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ForecastPipeline {
    config: PipelineConfig,
}

impl ForecastPipeline {
    pub fn new(config: PipelineConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validate raw rows, then report on them.
    pub fn run_raw<I>(&self, rows: I) -> CoreResult<ForecastReport>
    where
        I: IntoIterator<Item = RawSample>,
    {
        let samples = ingest(rows)?;
        Ok(self.run(&samples))
    }

    /// Report on an ordered series of samples.
    pub fn run(&self, samples: &[Sample]) -> ForecastReport {
        let buckets = group_by_day(samples.iter().cloned());
        let periods = day_periods(
            &buckets,
            &self.config.parts,
            self.config.night_wraparound,
        );

        let days: Vec<DayReport> = buckets
            .iter()
            .zip(periods)
            .take(self.config.max_days)
            .map(|(bucket, periods)| self.describe_day(bucket, periods.parts))
            .collect();

        let total_precipitation = days
            .iter()
            .filter_map(|day| day.summary.precipitation)
            .sum();

        ForecastReport {
            days,
            total_precipitation,
        }
    }

    /// Report on one calendar day given its (possibly wrapped) periods.
    pub fn describe_day(&self, bucket: &DayBucket, periods: DayParts<Vec<Sample>>) -> DayReport {
        let summary = summarize_day(bucket.date, &bucket.samples);
        let sky = self.dominant_sky(&bucket.samples);
        let nebulosity = match sky {
            Some(_) => None,
            None => infer_nebulosity(&summary, self.config.nebulosity),
        };

        let sky_label = sky
            .map(CloudCategory::label)
            .or_else(|| nebulosity.map(|n| n.phrase));
        let rain = summary
            .precipitation
            .and_then(|mm| self.config.rain.label(mm));
        let storm = self.storm(&bucket.samples);

        DayReport {
            date: bucket.date,
            summary,
            parts: periods.map(|part, samples| self.describe_period(part, &samples)),
            sky,
            nebulosity,
            headline: compose(sky_label, rain, storm),
        }
    }

    /// Labels and description for one period.
    pub fn describe_period(&self, part: DayPart, samples: &[Sample]) -> PartReport {
        let precipitation = (!samples.is_empty()).then(|| precipitation_total(samples));
        let sky = self.dominant_sky(samples);
        let rain = precipitation.and_then(|mm| self.config.rain.label(mm));
        let storm = self.storm(samples);

        PartReport {
            part,
            sample_count: samples.len(),
            sky,
            rain,
            storm,
            precipitation,
            description: compose(sky.map(CloudCategory::label), rain, storm),
        }
    }

    fn dominant_sky(&self, samples: &[Sample]) -> Option<CloudCategory> {
        self.config.clouds.dominant(
            samples.iter().filter_map(|s| s.cloud_cover),
            self.config.tie_break,
        )
    }

    fn storm(&self, samples: &[Sample]) -> Option<StormFrequency> {
        self.config
            .storm
            .frequency(samples.iter().filter_map(|s| s.weather_code))
    }
}
