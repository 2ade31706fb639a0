//! Sentence composition from sky, rain and thunder signals

use crate::precip::{RainIntensity, StormFrequency};

/// Compose one description from the signals of a period.
///
/// Precedence, highest first:
/// 1. storm and rain: `"<rain> with thunderstorms"`
/// 2. storm alone: `"isolated thunderstorms"` / `"frequent thunderstorms"`
/// 3. rain alone: `"<sky> / <rain>"`, or just `"<rain>"` without a sky label
/// 4. the sky label
///
/// `None` when the period carries none of the three signals.
pub fn compose(
    sky: Option<&str>,
    rain: Option<RainIntensity>,
    storm: Option<StormFrequency>,
) -> Option<String> {
    match (storm, rain) {
        (Some(_), Some(rain)) => Some(format!("{} with thunderstorms", rain.label())),
        (Some(storm), None) => Some(storm.label().to_string()),
        (None, Some(rain)) => Some(match sky {
            Some(sky) => format!("{sky} / {}", rain.label()),
            None => rain.label().to_string(),
        }),
        (None, None) => sky.map(str::to_string),
    }
}
