//! Baseline date and cost-basis resolution.
//!
//! - Preview: the earliest date in the cleaned frame. There is no real start
//!   to anchor to, so whatever history was fetched is used.
//! - Historical: the earliest date `>= start_date`. If every date precedes
//!   the start, resolution fails and the portfolio reports no data.

use super::frame::{ClosingFrame, SkipReason, SkippedInstrument};
use super::window::Mode;
use crate::domain::Symbol;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Why a portfolio could not be anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolveError {
    #[error("no instruments configured")]
    NoInstruments,

    #[error("no price data")]
    NoPriceData,

    #[error("no trading day on or after {start}")]
    NoDateOnOrAfter { start: NaiveDate },
}

/// The 1.0 reference point of a portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub date: NaiveDate,
    /// Close on `date` for every instrument that can be normalized.
    pub cost_basis: BTreeMap<Symbol, f64>,
}

/// Pick the baseline date from a sorted date axis.
pub fn select_baseline_date(
    dates: &[NaiveDate],
    mode: Mode,
    start_date: NaiveDate,
) -> Result<NaiveDate, ResolveError> {
    let first = *dates.first().ok_or(ResolveError::NoPriceData)?;
    match mode {
        Mode::Preview => Ok(first),
        Mode::Historical => {
            let idx = dates.partition_point(|d| *d < start_date);
            dates
                .get(idx)
                .copied()
                .ok_or(ResolveError::NoDateOnOrAfter { start: start_date })
        }
    }
}

/// Resolve the baseline of a frame and the cost basis of each column.
///
/// Columns without a positive close on the baseline date cannot be normalized
/// and come back as skipped. At least one column always survives: the
/// baseline row exists because some instrument traded that day.
pub fn resolve_baseline(
    frame: &ClosingFrame,
    mode: Mode,
    start_date: NaiveDate,
) -> Result<(Baseline, Vec<SkippedInstrument>), ResolveError> {
    let date = select_baseline_date(&frame.dates, mode, start_date)?;
    let row = frame.row_of(date).ok_or(ResolveError::NoPriceData)?;

    let mut cost_basis = BTreeMap::new();
    let mut skipped = Vec::new();
    for (i, column) in frame.columns.iter().enumerate() {
        match frame.close(i, row) {
            Some(close) if close > 0.0 => {
                cost_basis.insert(column.symbol.clone(), close);
            }
            _ => skipped.push(SkippedInstrument {
                symbol: column.symbol.clone(),
                reason: SkipReason::NoPriceAtBaseline,
            }),
        }
    }

    if cost_basis.is_empty() {
        return Err(ResolveError::NoPriceData);
    }

    Ok((Baseline { date, cost_basis }, skipped))
}
