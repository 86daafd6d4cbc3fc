//! Daily temporal windows with derived calendar and season tags.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoastError, Result};

/// Default enumeration start (first day of the synthetic history).
pub const DEFAULT_START: (i32, u32, u32) = (2023, 1, 1);
/// Two years of daily windows.
pub const DEFAULT_NUM_DAYS: u32 = 730;
/// Longest enumerable history, roughly a century of daily windows.
pub const MAX_NUM_DAYS: u32 = 36_600;

const MONSOON_MONTHS: [u32; 4] = [6, 7, 8, 9];
const CYCLONE_MONTHS: [u32; 5] = [4, 5, 10, 11, 12];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Winter,
    Summer,
    Monsoon,
    PostMonsoon,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Winter, Season::Summer, Season::Monsoon, Season::PostMonsoon];

    /// Fixed month → season table.
    pub fn from_month(month: u32) -> Season {
        match month {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Summer,
            6..=9 => Season::Monsoon,
            _ => Season::PostMonsoon,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Summer => "summer",
            Season::Monsoon => "monsoon",
            Season::PostMonsoon => "post_monsoon",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Season {
    type Err = CoastError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Season::ALL
            .into_iter()
            .find(|x| x.label() == s)
            .ok_or_else(|| CoastError::Validation(format!("unknown season '{s}'")))
    }
}

/// One dated window and its derived attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalWindow {
    pub date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub day_of_year: u32,
    pub season: Season,
    pub is_monsoon: bool,
    pub is_cyclone_season: bool,
}

impl TemporalWindow {
    pub fn from_date(date: NaiveDate) -> Self {
        let month = date.month();
        Self {
            date,
            year: date.year(),
            month,
            day: date.day(),
            day_of_year: date.ordinal(),
            season: Season::from_month(month),
            is_monsoon: MONSOON_MONTHS.contains(&month),
            is_cyclone_season: CYCLONE_MONTHS.contains(&month),
        }
    }
}

/// `num_days` consecutive daily windows.
#[derive(Debug, Clone)]
pub struct TemporalWindowSet {
    pub windows: Vec<TemporalWindow>,
}

impl TemporalWindowSet {
    /// Fails when `num_days` exceeds [`MAX_NUM_DAYS`] or the last window
    /// falls outside the representable calendar.
    pub fn build(start: NaiveDate, num_days: u32) -> Result<Self> {
        Self::last_date(start, num_days)?;
        let windows = (0..num_days)
            .map(|offset| {
                start
                    .checked_add_signed(Duration::days(i64::from(offset)))
                    .map(TemporalWindow::from_date)
                    .ok_or_else(|| span_error(start, num_days))
            })
            .collect::<Result<Vec<_>>>()?;
        tracing::info!(windows = windows.len(), %start, "built temporal windows");
        Ok(Self { windows })
    }

    /// Date of the final window of a `num_days` span starting at `start`.
    pub fn last_date(start: NaiveDate, num_days: u32) -> Result<NaiveDate> {
        if num_days == 0 || num_days > MAX_NUM_DAYS {
            return Err(CoastError::GenerationConfig(format!(
                "num_days must be in 1..={MAX_NUM_DAYS}, got {num_days}"
            )));
        }
        start
            .checked_add_signed(Duration::days(i64::from(num_days) - 1))
            .ok_or_else(|| span_error(start, num_days))
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

fn span_error(start: NaiveDate, num_days: u32) -> CoastError {
    CoastError::GenerationConfig(format!("{num_days} days from {start} leave the calendar"))
}

/// Source of "today" for estimate-mode featurization.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;

    /// Instant stamped on query results. Defaults to midnight UTC of `today`.
    fn now(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.today().and_time(NaiveTime::MIN))
    }
}

/// Wall-clock date in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Pinned date, for reproducible inference and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
