//! Cloudiness inference for days without cloud-cover data
//!
//! Scores a daily summary on temperature amplitude, daytime humidity,
//! rain, night humidity and gusts. Small amplitude and persistent humidity
//! point to an overcast day. Weights differ per site profile; `Auto` picks
//! the profile from the summary itself.

use serde::{Deserialize, Serialize};

use crate::rollups::DailySummary;

/// Gust (km/h) from which `Auto` assumes a maritime influence
const COASTAL_GUST: f64 = 35.0;
/// Night humidity (%) and day/night humidity swing from which `Auto` assumes a maritime influence
const COASTAL_RH_MAX: f64 = 90.0;
const COASTAL_RH_SWING: f64 = 20.0;

const HIGH_SCORE: f64 = 4.0;
const MEDIUM_SCORE: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NebulosityMode {
    #[default]
    Auto,
    Coastal,
    Interior,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteProfile {
    General,
    Coastal,
    Interior,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NebulosityLevel {
    Low,
    Medium,
    High,
}

impl NebulosityLevel {
    pub fn phrase(self) -> &'static str {
        match self {
            NebulosityLevel::Low => "few clouds",
            NebulosityLevel::Medium => "variable cloudiness",
            NebulosityLevel::High => "mostly cloudy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Nebulosity {
    pub profile: SiteProfile,
    pub score: f64,
    pub level: NebulosityLevel,
    pub phrase: &'static str,
}

/// Two-step rule: `first_points` when the value passes `first`, else
/// `second_points` when it passes `second`.
#[derive(Debug, Clone, Copy)]
struct Tier {
    first: f64,
    second: f64,
    first_points: f64,
    second_points: f64,
}

impl Tier {
    const fn new(first: f64, second: f64, first_points: f64, second_points: f64) -> Self {
        Self {
            first,
            second,
            first_points,
            second_points,
        }
    }

    fn at_most(&self, value: f64) -> f64 {
        if value <= self.first {
            self.first_points
        } else if value <= self.second {
            self.second_points
        } else {
            0.0
        }
    }

    fn at_least(&self, value: f64) -> f64 {
        if value >= self.first {
            self.first_points
        } else if value >= self.second {
            self.second_points
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bonus {
    at: f64,
    points: f64,
}

impl Bonus {
    fn at_least(&self, value: f64) -> f64 {
        if value >= self.at {
            self.points
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Weights {
    amplitude: Tier,
    day_humidity: Tier,
    precipitation: Tier,
    night_humidity: Bonus,
    gust: Bonus,
}

impl SiteProfile {
    fn weights(self) -> Weights {
        match self {
            SiteProfile::General => Weights {
                amplitude: Tier::new(6.0, 9.0, 2.0, 1.0),
                day_humidity: Tier::new(75.0, 60.0, 2.0, 1.0),
                precipitation: Tier::new(3.0, 0.5, 2.0, 1.0),
                night_humidity: Bonus { at: 95.0, points: 0.5 },
                gust: Bonus { at: 35.0, points: 1.0 },
            },
            SiteProfile::Coastal => Weights {
                amplitude: Tier::new(6.0, 8.0, 2.0, 1.0),
                day_humidity: Tier::new(75.0, 60.0, 2.0, 1.0),
                precipitation: Tier::new(3.0, 0.5, 2.0, 1.0),
                night_humidity: Bonus { at: 90.0, points: 1.5 },
                gust: Bonus { at: 35.0, points: 1.0 },
            },
            SiteProfile::Interior => Weights {
                amplitude: Tier::new(6.0, 10.0, 2.0, 1.0),
                day_humidity: Tier::new(75.0, 60.0, 2.0, 1.0),
                precipitation: Tier::new(3.0, 1.0, 2.0, 1.0),
                night_humidity: Bonus { at: 85.0, points: 0.5 },
                gust: Bonus { at: 40.0, points: 0.2 },
            },
        }
    }
}

impl NebulosityMode {
    fn profile_for(self, summary: &DailySummary) -> SiteProfile {
        match self {
            NebulosityMode::Coastal => SiteProfile::Coastal,
            NebulosityMode::Interior => SiteProfile::Interior,
            NebulosityMode::General => SiteProfile::General,
            NebulosityMode::Auto => {
                let strong_gust = summary.gust_max.is_some_and(|g| g >= COASTAL_GUST);
                let humid_swing = summary
                    .humidity
                    .is_some_and(|rh| rh.max >= COASTAL_RH_MAX && rh.width() >= COASTAL_RH_SWING);
                if strong_gust || humid_swing {
                    SiteProfile::Coastal
                } else {
                    SiteProfile::Interior
                }
            }
        }
    }
}

/// Infer a cloudiness level from a day's numeric summary.
///
/// Returns `None` for a day without samples.
pub fn infer_nebulosity(summary: &DailySummary, mode: NebulosityMode) -> Option<Nebulosity> {
    if summary.is_insufficient() {
        return None;
    }

    let profile = mode.profile_for(summary);
    let w = profile.weights();
    let mut score = 0.0;

    if let Some(t) = summary.temperature {
        score += w.amplitude.at_most(t.width());
    }
    if let Some(rh) = summary.humidity {
        score += w.day_humidity.at_least(rh.min);
        score += w.night_humidity.at_least(rh.max);
    }
    score += w.precipitation.at_least(summary.precipitation.unwrap_or(0.0));
    if let Some(gust) = summary.gust_max {
        score += w.gust.at_least(gust);
    }

    let level = if score >= HIGH_SCORE {
        NebulosityLevel::High
    } else if score >= MEDIUM_SCORE {
        NebulosityLevel::Medium
    } else {
        NebulosityLevel::Low
    };

    Some(Nebulosity {
        profile,
        score: (score * 100.0).round() / 100.0,
        level,
        phrase: level.phrase(),
    })
}
