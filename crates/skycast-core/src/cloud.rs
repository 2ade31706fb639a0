//! Cloud cover classification
//!
//! Percentages map onto an ordered [`CloudCategory`] through a fixed
//! threshold table. Each threshold is an inclusive upper bound: with the
//! default table 10 % is still `Clear` and 10.5 % is `Few`.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Sky category, ordered from clearest to most overcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudCategory {
    Clear,
    Few,
    Partial,
    Mostly,
    Overcast,
}

impl CloudCategory {
    /// All categories in their total order
    pub const ALL: [CloudCategory; 5] = [
        CloudCategory::Clear,
        CloudCategory::Few,
        CloudCategory::Partial,
        CloudCategory::Mostly,
        CloudCategory::Overcast,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CloudCategory::Clear => "clear sky",
            CloudCategory::Few => "few clouds",
            CloudCategory::Partial => "partly cloudy",
            CloudCategory::Mostly => "mostly cloudy",
            CloudCategory::Overcast => "overcast",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// How `dominant` resolves a tie between equally frequent categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Pick the cloudiest of the tied categories
    #[default]
    MostCloudy,
    /// Pick the clearest of the tied categories
    LeastCloudy,
    /// Classify the mean of the values that fell in the tied categories
    Mean,
}

/// Inclusive upper bounds (in %) for every category but `Overcast`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudThresholds {
    pub clear: f64,
    pub few: f64,
    pub partial: f64,
    pub mostly: f64,
}

impl Default for CloudThresholds {
    fn default() -> Self {
        Self {
            clear: 10.0,
            few: 40.0,
            partial: 60.0,
            mostly: 80.0,
        }
    }
}

impl CloudThresholds {
    fn table(&self) -> [(f64, CloudCategory); 4] {
        [
            (self.clear, CloudCategory::Clear),
            (self.few, CloudCategory::Few),
            (self.partial, CloudCategory::Partial),
            (self.mostly, CloudCategory::Mostly),
        ]
    }

    pub fn validate(&self) -> CoreResult<()> {
        let bounds = [self.clear, self.few, self.partial, self.mostly];
        let finite = bounds.iter().all(|b| b.is_finite());
        let increasing = bounds.windows(2).all(|w| w[0] < w[1]);
        if !finite || !increasing || self.clear < 0.0 || self.mostly >= 100.0 {
            return Err(CoreError::InvalidConfig(format!(
                "cloud thresholds must increase strictly within [0, 100): {bounds:?}"
            )));
        }
        Ok(())
    }

    /// Classify a cover percentage. Values outside [0, 100] are clamped.
    pub fn classify(&self, percent: f64) -> CloudCategory {
        let value = percent.clamp(0.0, 100.0);
        self.table()
            .iter()
            .find(|(upper, _)| value <= *upper)
            .map(|(_, category)| *category)
            .unwrap_or(CloudCategory::Overcast)
    }

    /// Most frequent category among `values`.
    ///
    /// Non-finite values are ignored; `None` means there was nothing to
    /// classify. The result depends only on the multiset of inputs.
    pub fn dominant<I>(&self, values: I, tie_break: TieBreak) -> Option<CloudCategory>
    where
        I: IntoIterator<Item = f64>,
    {
        let values: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        if values.is_empty() {
            return None;
        }

        let mut counts = [0usize; CloudCategory::ALL.len()];
        for value in &values {
            counts[self.classify(*value).index()] += 1;
        }
        let top = counts.iter().copied().max().unwrap_or(0);
        let tied: Vec<CloudCategory> = CloudCategory::ALL
            .into_iter()
            .filter(|c| counts[c.index()] == top)
            .collect();

        if let [only] = tied.as_slice() {
            return Some(*only);
        }

        match tie_break {
            TieBreak::MostCloudy => tied.last().copied(),
            TieBreak::LeastCloudy => tied.first().copied(),
            TieBreak::Mean => {
                let mut members: Vec<f64> = values
                    .iter()
                    .copied()
                    .filter(|v| tied.contains(&self.classify(*v)))
                    .collect();
                // Summation order is fixed so the mean cannot drift with input order
                members.sort_by(f64::total_cmp);
                let mean = members.iter().sum::<f64>() / members.len() as f64;
                Some(self.classify(mean))
            }
        }
    }
}
