//! Mode classification and fetch-window resolution.
//!
//! The window decides what we ask the data source for; the baseline (see
//! `baseline`) decides what we normalize against. A start date in the future
//! still needs a trend to show, so preview mode looks back a fixed number of
//! days from today instead of starting at the nominal date.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lookback used to build the preview trend when the start date has not arrived.
pub const PREVIEW_LOOKBACK_DAYS: i64 = 60;

/// Baseline-resolution policy for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Start date is today or earlier: anchor to the first trading day on/after it.
    Historical,
    /// Start date is strictly in the future: anchor to the first fetched day.
    Preview,
}

impl Mode {
    pub fn resolve(start_date: NaiveDate, today: NaiveDate) -> Self {
        if start_date > today {
            Mode::Preview
        } else {
            Mode::Historical
        }
    }

    pub fn is_preview(self) -> bool {
        self == Mode::Preview
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Historical => "historical",
            Mode::Preview => "preview",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive date range requested from the price source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FetchWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Window for a nominal start date as seen from `today`.
    pub fn resolve(start_date: NaiveDate, today: NaiveDate) -> Self {
        let start = match Mode::resolve(start_date, today) {
            Mode::Preview => today - Duration::days(PREVIEW_LOOKBACK_DAYS),
            Mode::Historical => start_date,
        };
        Self { start, end: today }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for FetchWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}
