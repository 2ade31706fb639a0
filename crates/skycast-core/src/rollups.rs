//! Daily rollups of hourly samples

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::Sample;

/// Aggregation type for rollups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateType {
    Min,
    Max,
    Sum,
}

/// What an accumulator does with a missing observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissingPolicy {
    /// Leave it out entirely
    Skip,
    /// Count it as 0
    Zero,
}

/// Running aggregate over optional observations.
///
/// The running value starts from the aggregate's identity (`+inf` for min,
/// `-inf` for max, `0` for sum); `result` only reports it once at least one
/// value was taken in, so the identity never escapes.
#[derive(Debug, Clone)]
pub struct Accumulator {
    aggregate_type: AggregateType,
    missing: MissingPolicy,
    value: f64,
    count: usize,
}

impl Accumulator {
    pub fn new(aggregate_type: AggregateType, missing: MissingPolicy) -> Self {
        let value = match aggregate_type {
            AggregateType::Min => f64::INFINITY,
            AggregateType::Max => f64::NEG_INFINITY,
            AggregateType::Sum => 0.0,
        };
        Self {
            aggregate_type,
            missing,
            value,
            count: 0,
        }
    }

    pub fn add(&mut self, value: Option<f64>) {
        let value = match (value.filter(|v| v.is_finite()), self.missing) {
            (Some(v), _) => v,
            (None, MissingPolicy::Zero) => 0.0,
            (None, MissingPolicy::Skip) => return,
        };
        self.value = match self.aggregate_type {
            AggregateType::Min => self.value.min(value),
            AggregateType::Max => self.value.max(value),
            AggregateType::Sum => self.value + value,
        };
        self.count += 1;
    }

    pub fn result(&self) -> Option<f64> {
        (self.count > 0).then_some(self.value)
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// A closed range with `min <= max`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub min: f64,
    pub max: f64,
}

impl Span {
    fn from_accumulators(min: &Accumulator, max: &Accumulator) -> Option<Self> {
        Some(Self {
            min: min.result()?,
            max: max.result()?,
        })
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// Numeric summary of one calendar day.
///
/// `None` means no usable observation. A day with no samples at all has
/// every field `None` and `sample_count == 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub sample_count: usize,
    /// Temperature range (°C)
    pub temperature: Option<Span>,
    /// Relative humidity range (%)
    pub humidity: Option<Span>,
    /// Precipitation total (mm); missing hours count as dry
    pub precipitation: Option<f64>,
    /// Strongest gust (km/h); missing hours count as calm
    pub gust_max: Option<f64>,
}

impl DailySummary {
    pub fn is_insufficient(&self) -> bool {
        self.sample_count == 0
    }
}

/// Reduce one day's samples.
pub fn summarize_day(date: NaiveDate, samples: &[Sample]) -> DailySummary {
    let mut t_min = Accumulator::new(AggregateType::Min, MissingPolicy::Skip);
    let mut t_max = Accumulator::new(AggregateType::Max, MissingPolicy::Skip);
    let mut rh_min = Accumulator::new(AggregateType::Min, MissingPolicy::Skip);
    let mut rh_max = Accumulator::new(AggregateType::Max, MissingPolicy::Skip);
    let mut precip = Accumulator::new(AggregateType::Sum, MissingPolicy::Zero);
    let mut gust = Accumulator::new(AggregateType::Max, MissingPolicy::Zero);

    for sample in samples {
        t_min.add(sample.temperature);
        t_max.add(sample.temperature);
        rh_min.add(sample.humidity);
        rh_max.add(sample.humidity);
        // Negative amounts are clamped at ingestion; clamp again for hand-built samples
        precip.add(sample.precipitation.map(|v| v.max(0.0)));
        gust.add(sample.wind_gust.map(|v| v.max(0.0)));
    }

    DailySummary {
        date,
        sample_count: samples.len(),
        temperature: Span::from_accumulators(&t_min, &t_max),
        humidity: Span::from_accumulators(&rh_min, &rh_max),
        precipitation: precip.result(),
        gust_max: gust.result(),
    }
}

/// Precipitation total over a set of samples, missing hours counting as dry
pub fn precipitation_total(samples: &[Sample]) -> f64 {
    let mut acc = Accumulator::new(AggregateType::Sum, MissingPolicy::Zero);
    for sample in samples {
        acc.add(sample.precipitation.map(|v| v.max(0.0)));
    }
    acc.result().unwrap_or(0.0)
}
