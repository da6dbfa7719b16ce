//! Per-instrument normalization to the baseline.

use super::baseline::Baseline;
use super::frame::ClosingFrame;
use super::series::NavSeries;
use crate::domain::Symbol;
use serde::{Deserialize, Serialize};

/// One instrument's NAV within a portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentNav {
    pub symbol: Symbol,
    pub nav: NavSeries,
}

impl InstrumentNav {
    /// NAV at the last observation, the instrument's cumulative contribution.
    pub fn latest_nav(&self) -> Option<f64> {
        self.nav.latest().map(|(_, v)| v)
    }
}

/// Normalize every frame column that has a cost basis, in frame order.
///
/// Rows before the baseline are dropped. On the baseline row each value is
/// exactly 1.0, the cost basis divided by itself. Gaps stay gaps: a column
/// with no close on a post-baseline date simply has no point there.
pub fn normalize_frame(frame: &ClosingFrame, baseline: &Baseline) -> Vec<InstrumentNav> {
    let Some(start_row) = frame.row_of(baseline.date) else {
        return Vec::new();
    };

    frame
        .columns
        .iter()
        .filter_map(|column| {
            let cost = *baseline.cost_basis.get(&column.symbol)?;
            let nav = frame.dates[start_row..]
                .iter()
                .zip(&column.closes[start_row..])
                .filter_map(|(date, close)| close.map(|c| (*date, c / cost)))
                .collect();
            Some(InstrumentNav {
                symbol: column.symbol.clone(),
                nav,
            })
        })
        .collect()
}
