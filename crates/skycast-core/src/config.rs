//! Pipeline configuration
//!
//! Every threshold the classifiers use lives here so a deployment can tune
//! them from its configuration file. Defaults are the canonical tables.

use serde::{Deserialize, Serialize};

use crate::cloud::{CloudThresholds, TieBreak};
use crate::error::{CoreError, CoreResult};
use crate::nebulosity::NebulosityMode;
use crate::precip::{RainThresholds, StormPolicy};

/// Default number of days a report covers.
pub const DEFAULT_MAX_DAYS: usize = 15;

/// Start hours of the day parts after dawn. Dawn always starts at 00:00 and
/// night always ends at 24:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartBoundaries {
    pub morning_start: u32,
    pub afternoon_start: u32,
    pub night_start: u32,
}

impl Default for PartBoundaries {
    fn default() -> Self {
        Self {
            morning_start: 6,
            afternoon_start: 12,
            night_start: 18,
        }
    }
}

impl PartBoundaries {
    pub fn validate(&self) -> CoreResult<()> {
        let ordered = 0 < self.morning_start
            && self.morning_start < self.afternoon_start
            && self.afternoon_start < self.night_start
            && self.night_start < 24;
        if !ordered {
            return Err(CoreError::InvalidConfig(format!(
                "day part boundaries must satisfy 0 < {} < {} < {} < 24",
                self.morning_start, self.afternoon_start, self.night_start
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub parts: PartBoundaries,
    pub clouds: CloudThresholds,
    pub tie_break: TieBreak,
    pub rain: RainThresholds,
    pub storm: StormPolicy,
    /// Fold each day's next-morning dawn hours into its night period
    pub night_wraparound: bool,
    pub nebulosity: NebulosityMode,
    pub max_days: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parts: PartBoundaries::default(),
            clouds: CloudThresholds::default(),
            tie_break: TieBreak::default(),
            rain: RainThresholds::default(),
            storm: StormPolicy::default(),
            night_wraparound: false,
            nebulosity: NebulosityMode::default(),
            max_days: DEFAULT_MAX_DAYS,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> CoreResult<()> {
        self.parts.validate()?;
        self.clouds.validate()?;
        self.rain.validate()?;
        self.storm.validate()?;
        if self.max_days == 0 {
            return Err(CoreError::InvalidConfig("max_days must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_unordered_boundaries() {
        let parts = PartBoundaries {
            morning_start: 6,
            afternoon_start: 6,
            night_start: 18,
        };
        assert!(matches!(
            parts.validate(),
            Err(CoreError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: PipelineConfig =
            serde_json::from_str(r#"{"night_wraparound":true,"clouds":{"few":30}}"#).unwrap();
        assert!(cfg.night_wraparound);
        assert_eq!(cfg.clouds.few, 30.0);
        assert_eq!(cfg.clouds.clear, 10.0);
        assert_eq!(cfg.parts, PartBoundaries::default());
        assert_eq!(cfg.max_days, DEFAULT_MAX_DAYS);
    }

    #[test]
    fn test_zero_days_rejected() {
        let cfg = PipelineConfig {
            max_days: 0,
            ..PipelineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
