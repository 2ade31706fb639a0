//! Calendar-day and day-part bucketing
//!
//! Samples are grouped by their local calendar date, in the order the dates
//! are first seen, and each day is split into four parts by local hour.
//! Input order is assumed chronological and is never changed.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::PartBoundaries;
use crate::types::Sample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPart {
    Dawn,
    Morning,
    Afternoon,
    Night,
}

impl DayPart {
    pub const ALL: [DayPart; 4] = [
        DayPart::Dawn,
        DayPart::Morning,
        DayPart::Afternoon,
        DayPart::Night,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DayPart::Dawn => "dawn",
            DayPart::Morning => "morning",
            DayPart::Afternoon => "afternoon",
            DayPart::Night => "night",
        }
    }

    /// Part containing a local hour (0-23)
    pub fn of_hour(hour: u32, bounds: &PartBoundaries) -> DayPart {
        if hour < bounds.morning_start {
            DayPart::Dawn
        } else if hour < bounds.afternoon_start {
            DayPart::Morning
        } else if hour < bounds.night_start {
            DayPart::Afternoon
        } else {
            DayPart::Night
        }
    }
}

/// One value per day part.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayParts<T> {
    pub dawn: T,
    pub morning: T,
    pub afternoon: T,
    pub night: T,
}

impl<T> DayParts<T> {
    pub fn get(&self, part: DayPart) -> &T {
        match part {
            DayPart::Dawn => &self.dawn,
            DayPart::Morning => &self.morning,
            DayPart::Afternoon => &self.afternoon,
            DayPart::Night => &self.night,
        }
    }

    pub fn get_mut(&mut self, part: DayPart) -> &mut T {
        match part {
            DayPart::Dawn => &mut self.dawn,
            DayPart::Morning => &mut self.morning,
            DayPart::Afternoon => &mut self.afternoon,
            DayPart::Night => &mut self.night,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (DayPart, &T)> {
        DayPart::ALL.into_iter().map(move |part| (part, self.get(part)))
    }

    pub fn map<U, F>(self, mut f: F) -> DayParts<U>
    where
        F: FnMut(DayPart, T) -> U,
    {
        DayParts {
            dawn: f(DayPart::Dawn, self.dawn),
            morning: f(DayPart::Morning, self.morning),
            afternoon: f(DayPart::Afternoon, self.afternoon),
            night: f(DayPart::Night, self.night),
        }
    }
}

/// Samples sharing one local calendar date, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub samples: Vec<Sample>,
}

impl DayBucket {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            samples: Vec::new(),
        }
    }

    /// Partition this day's samples by local hour.
    pub fn split(&self, bounds: &PartBoundaries) -> DayParts<Vec<Sample>> {
        let mut parts: DayParts<Vec<Sample>> = DayParts::default();
        for sample in &self.samples {
            parts
                .get_mut(DayPart::of_hour(sample.hour(), bounds))
                .push(sample.clone());
        }
        parts
    }
}

/// A day's samples arranged into the periods that get described.
///
/// Without night wraparound this is exactly [`DayBucket::split`]. With it,
/// the night period also holds the following day's dawn hours.
#[derive(Debug, Clone, PartialEq)]
pub struct DayPeriods {
    pub date: NaiveDate,
    pub parts: DayParts<Vec<Sample>>,
}

/// Group samples by local calendar date, in first-seen date order.
pub fn group_by_day<I>(samples: I) -> Vec<DayBucket>
where
    I: IntoIterator<Item = Sample>,
{
    let mut buckets: Vec<DayBucket> = Vec::new();
    let mut index: HashMap<NaiveDate, usize> = HashMap::new();

    for sample in samples {
        let date = sample.date();
        let slot = *index.entry(date).or_insert_with(|| {
            buckets.push(DayBucket::new(date));
            buckets.len() - 1
        });
        buckets[slot].samples.push(sample);
    }

    buckets
}

/// Split every bucket into day-part periods.
///
/// When `night_wraparound` is set, a day's dawn samples move into the night
/// period of the previous calendar day if that day is present. The first
/// day (and any day after a gap) keeps its own dawn, so every sample still
/// lands in exactly one period.
pub fn day_periods(
    buckets: &[DayBucket],
    bounds: &PartBoundaries,
    night_wraparound: bool,
) -> Vec<DayPeriods> {
    let mut periods: Vec<DayPeriods> = buckets
        .iter()
        .map(|bucket| DayPeriods {
            date: bucket.date,
            parts: bucket.split(bounds),
        })
        .collect();

    if night_wraparound {
        for i in 1..periods.len() {
            if periods[i - 1].date.succ_opt() != Some(periods[i].date) {
                continue;
            }
            let dawn = std::mem::take(&mut periods[i].parts.dawn);
            periods[i - 1].parts.night.extend(dawn);
        }
    }

    periods
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn hourly(days: u32) -> Vec<Sample> {
        (0..days)
            .flat_map(|d| (0..24).map(move |h| Sample::new(at(d + 1, h)).with_temperature(h as f64)))
            .collect()
    }

    #[test]
    fn test_group_by_day() {
        let samples = hourly(3);
        let buckets = group_by_day(samples.clone());

        assert_eq!(buckets.len(), 3);
        assert!(buckets.iter().all(|b| b.samples.len() == 24));
        assert_eq!(buckets[1].date, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());

        let rejoined: Vec<Sample> = buckets.into_iter().flat_map(|b| b.samples).collect();
        assert_eq!(rejoined, samples);
    }

    #[test]
    fn test_first_seen_date_order() {
        let samples = vec![
            Sample::new(at(2, 1)),
            Sample::new(at(1, 23)),
            Sample::new(at(2, 2)),
        ];
        let buckets = group_by_day(samples);
        assert_eq!(buckets[0].date, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        assert_eq!(buckets[0].samples.len(), 2);
        assert_eq!(buckets[0].samples[1].hour(), 2);
        assert_eq!(buckets[1].samples.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        assert!(group_by_day(Vec::new()).is_empty());
    }

    #[test]
    fn test_part_of_hour() {
        let b = PartBoundaries::default();
        assert_eq!(DayPart::of_hour(0, &b), DayPart::Dawn);
        assert_eq!(DayPart::of_hour(5, &b), DayPart::Dawn);
        assert_eq!(DayPart::of_hour(6, &b), DayPart::Morning);
        assert_eq!(DayPart::of_hour(11, &b), DayPart::Morning);
        assert_eq!(DayPart::of_hour(12, &b), DayPart::Afternoon);
        assert_eq!(DayPart::of_hour(18, &b), DayPart::Night);
        assert_eq!(DayPart::of_hour(23, &b), DayPart::Night);
    }

    #[test]
    fn test_split_covers_every_sample_once() {
        let buckets = group_by_day(hourly(1));
        let parts = buckets[0].split(&PartBoundaries::default());

        for (_, samples) in parts.iter() {
            assert_eq!(samples.len(), 6);
        }
        assert_eq!(parts.dawn[0].hour(), 0);
        assert_eq!(parts.night[5].hour(), 23);
    }

    #[test]
    fn test_split_custom_boundaries() {
        let bounds = PartBoundaries {
            morning_start: 5,
            afternoon_start: 13,
            night_start: 20,
        };
        let buckets = group_by_day(hourly(1));
        let parts = buckets[0].split(&bounds);
        assert_eq!(parts.dawn.len(), 5);
        assert_eq!(parts.morning.len(), 8);
        assert_eq!(parts.afternoon.len(), 7);
        assert_eq!(parts.night.len(), 4);
    }

    #[test]
    fn test_self_contained_periods() {
        let buckets = group_by_day(hourly(2));
        let periods = day_periods(&buckets, &PartBoundaries::default(), false);
        assert_eq!(periods[0].parts.night.len(), 6);
        assert_eq!(periods[1].parts.dawn.len(), 6);
    }

    #[test]
    fn test_night_wraparound() {
        let buckets = group_by_day(hourly(3));
        let periods = day_periods(&buckets, &PartBoundaries::default(), true);

        // first day keeps its own dawn
        assert_eq!(periods[0].parts.dawn.len(), 6);
        assert_eq!(periods[0].parts.night.len(), 12);
        assert_eq!(periods[0].parts.night[6].date(), periods[1].date);
        assert!(periods[1].parts.dawn.is_empty());
        assert!(periods[2].parts.dawn.is_empty());
        assert_eq!(periods[2].parts.night.len(), 6);

        let total: usize = periods
            .iter()
            .flat_map(|p| p.parts.iter().map(|(_, s)| s.len()))
            .sum();
        assert_eq!(total, 72);
    }

    #[test]
    fn test_wraparound_skips_gaps() {
        let samples = vec![Sample::new(at(1, 20)), Sample::new(at(3, 2))];
        let buckets = group_by_day(samples);
        let periods = day_periods(&buckets, &PartBoundaries::default(), true);
        assert_eq!(periods[0].parts.night.len(), 1);
        assert_eq!(periods[1].parts.dawn.len(), 1);
    }
}
