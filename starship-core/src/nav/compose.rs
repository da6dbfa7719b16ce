//! Equal-weight composition: instruments into portfolios, portfolios into the
//! aggregate ("total strategy").
//!
//! Both levels use the gap-aware mean, so a constituent missing on a date is
//! left out of that date's average. Effective weights therefore shift on days
//! with uneven availability.

use super::baseline::Baseline;
use super::frame::SkippedInstrument;
use super::normalize::InstrumentNav;
use super::series::{mean_across, NavSeries};
use serde::{Deserialize, Serialize};

/// A resolved portfolio and its constituents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioNav {
    pub name: String,
    pub baseline: Baseline,
    pub nav: NavSeries,
    pub instruments: Vec<InstrumentNav>,
    /// Configured symbols that contribute nothing.
    pub skipped: Vec<SkippedInstrument>,
}

impl PortfolioNav {
    pub fn instrument(&self, symbol: &str) -> Option<&InstrumentNav> {
        self.instruments.iter().find(|i| i.symbol == symbol)
    }

    pub fn latest_nav(&self) -> Option<f64> {
        self.nav.latest().map(|(_, v)| v)
    }
}

/// Portfolio NAV: per-date mean over instruments with a value.
pub fn portfolio_nav(instruments: &[InstrumentNav]) -> NavSeries {
    mean_across(instruments.iter().map(|i| &i.nav))
}

/// Aggregate NAV: per-date mean over resolved portfolios.
pub fn aggregate_nav(portfolios: &[PortfolioNav]) -> NavSeries {
    mean_across(portfolios.iter().map(|p| &p.nav))
}
