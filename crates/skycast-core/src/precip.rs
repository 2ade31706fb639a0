//! Rain intensity and thunderstorm classification

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// WMO codes reserved for thunderstorms (with or without hail)
pub const STORM_CODES: RangeInclusive<u8> = 95..=99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RainIntensity {
    Light,
    Moderate,
    Heavy,
}

impl RainIntensity {
    pub fn label(self) -> &'static str {
        match self {
            RainIntensity::Light => "light rain",
            RainIntensity::Moderate => "moderate rain",
            RainIntensity::Heavy => "heavy rain",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StormFrequency {
    Isolated,
    Frequent,
}

impl StormFrequency {
    pub fn label(self) -> &'static str {
        match self {
            StormFrequency::Isolated => "isolated thunderstorms",
            StormFrequency::Frequent => "frequent thunderstorms",
        }
    }
}

/// Lower bounds (mm) of each intensity. Totals under `trace` are no rain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RainThresholds {
    pub trace: f64,
    pub moderate: f64,
    pub heavy: f64,
}

impl Default for RainThresholds {
    fn default() -> Self {
        Self {
            trace: 1.0,
            moderate: 5.0,
            heavy: 15.0,
        }
    }
}

impl RainThresholds {
    pub fn validate(&self) -> CoreResult<()> {
        let ok = self.trace.is_finite()
            && self.heavy.is_finite()
            && 0.0 < self.trace
            && self.trace < self.moderate
            && self.moderate < self.heavy;
        if !ok {
            return Err(CoreError::InvalidConfig(format!(
                "rain thresholds must satisfy 0 < {} < {} < {}",
                self.trace, self.moderate, self.heavy
            )));
        }
        Ok(())
    }

    /// Intensity of an accumulated total; negative totals count as dry.
    pub fn label(&self, total_mm: f64) -> Option<RainIntensity> {
        let total = if total_mm.is_finite() { total_mm.max(0.0) } else { 0.0 };
        if total < self.trace {
            None
        } else if total < self.moderate {
            Some(RainIntensity::Light)
        } else if total < self.heavy {
            Some(RainIntensity::Moderate)
        } else {
            Some(RainIntensity::Heavy)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StormPolicy {
    /// Storm-coded hours at which thunderstorms count as frequent
    pub frequent_at: usize,
}

impl Default for StormPolicy {
    fn default() -> Self {
        Self { frequent_at: 3 }
    }
}

impl StormPolicy {
    pub fn validate(&self) -> CoreResult<()> {
        if self.frequent_at < 2 {
            return Err(CoreError::InvalidConfig(
                "storm frequent_at must be at least 2".into(),
            ));
        }
        Ok(())
    }

    pub fn frequency<I>(&self, codes: I) -> Option<StormFrequency>
    where
        I: IntoIterator<Item = u8>,
    {
        match storm_count(codes) {
            0 => None,
            n if n < self.frequent_at => Some(StormFrequency::Isolated),
            _ => Some(StormFrequency::Frequent),
        }
    }
}

pub fn is_storm_code(code: u8) -> bool {
    STORM_CODES.contains(&code)
}

pub fn storm_present<I>(codes: I) -> bool
where
    I: IntoIterator<Item = u8>,
{
    codes.into_iter().any(is_storm_code)
}

fn storm_count<I>(codes: I) -> usize
where
    I: IntoIterator<Item = u8>,
{
    codes.into_iter().filter(|c| is_storm_code(*c)).count()
}
