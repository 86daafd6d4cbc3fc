//! Ordinal labels derived from the risk score by fixed thresholds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoastError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Severity::Low, Severity::Medium, Severity::High, Severity::Critical];

    /// critical ≥ 0.75, high ≥ 0.5, medium ≥ 0.25, else low.
    pub fn from_score(score: f64) -> Severity {
        if score >= 0.75 {
            Severity::Critical
        } else if score >= 0.5 {
            Severity::High
        } else if score >= 0.25 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensityBin {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl IntensityBin {
    pub const ALL: [IntensityBin; 5] = [
        IntensityBin::VeryLow,
        IntensityBin::Low,
        IntensityBin::Moderate,
        IntensityBin::High,
        IntensityBin::VeryHigh,
    ];

    /// Upper bounds of the 0.2-wide buckets, written out so that
    /// boundaries like 0.6 are exact.
    const UPPER: [f64; 5] = [0.2, 0.4, 0.6, 0.8, 1.0];

    /// Five half-open 0.2-wide buckets checked in order. Negative and NaN
    /// scores land in `VeryLow`; anything at or past 1.0 lands in `VeryHigh`.
    pub fn from_score(score: f64) -> IntensityBin {
        if score.is_nan() || score < 0.0 {
            return IntensityBin::VeryLow;
        }
        Self::ALL
            .into_iter()
            .zip(Self::UPPER)
            .find(|&(_, hi)| score < hi)
            .map_or(IntensityBin::VeryHigh, |(bin, _)| bin)
    }

    pub fn label(self) -> &'static str {
        match self {
            IntensityBin::VeryLow => "very_low",
            IntensityBin::Low => "low",
            IntensityBin::Moderate => "moderate",
            IntensityBin::High => "high",
            IntensityBin::VeryHigh => "very_high",
        }
    }
}

macro_rules! label_impls {
    ($ty:ty, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $ty {
            type Err = CoastError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty>::ALL
                    .into_iter()
                    .find(|x| x.label() == s)
                    .ok_or_else(|| CoastError::Validation(format!(concat!("unknown ", $what, " '{}'"), s)))
            }
        }
    };
}

label_impls!(Severity, "severity");
label_impls!(IntensityBin, "intensity bin");
