//! NAV engine: one computation pass over an immutable price table.
//!
//! Per portfolio: align → resolve baseline → normalize → mean. Failures are
//! local: a portfolio that cannot be anchored is reported as skipped and left
//! out of the aggregate; an instrument without data is skipped inside its
//! portfolio. Nothing here aborts the run.

use super::baseline::{resolve_baseline, ResolveError};
use super::compose::{aggregate_nav, portfolio_nav, PortfolioNav};
use super::frame::ClosingFrame;
use super::normalize::normalize_frame;
use super::series::NavSeries;
use super::snapshot::Snapshot;
use super::window::{FetchWindow, Mode};
use crate::domain::{Portfolio, PortfolioBook, PriceTable, Symbol};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A configured portfolio that produced no NAV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedPortfolio {
    pub name: String,
    pub reason: ResolveError,
}

/// Everything the presentation layer needs from one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavReport {
    pub mode: Mode,
    pub start_date: NaiveDate,
    pub today: NaiveDate,
    pub window: FetchWindow,
    /// Resolved portfolios in book order.
    pub portfolios: Vec<PortfolioNav>,
    pub skipped_portfolios: Vec<SkippedPortfolio>,
    /// Equal-weight mean of the resolved portfolios.
    pub aggregate: NavSeries,
    /// Last available close of every book symbol present in the table.
    pub latest_prices: BTreeMap<Symbol, f64>,
    pub snapshot: Option<Snapshot>,
}

impl NavReport {
    pub fn portfolio(&self, name: &str) -> Option<&PortfolioNav> {
        self.portfolios.iter().find(|p| p.name == name)
    }

    /// True when no portfolio could be resolved.
    pub fn is_empty(&self) -> bool {
        self.portfolios.is_empty()
    }
}

/// Baseline policy for a nominal start date as seen from `today`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavEngine {
    start_date: NaiveDate,
    today: NaiveDate,
    mode: Mode,
}

impl NavEngine {
    pub fn new(start_date: NaiveDate, today: NaiveDate) -> Self {
        Self {
            start_date,
            today,
            mode: Mode::resolve(start_date, today),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Window to request from the price source.
    pub fn fetch_window(&self) -> FetchWindow {
        FetchWindow::resolve(self.start_date, self.today)
    }

    /// NAV for a single portfolio.
    pub fn portfolio(
        &self,
        table: &PriceTable,
        portfolio: &Portfolio,
    ) -> Result<PortfolioNav, ResolveError> {
        if portfolio.symbols.is_empty() {
            return Err(ResolveError::NoInstruments);
        }

        let (frame, mut skipped) = ClosingFrame::align(table, &portfolio.symbols);
        if frame.is_empty() {
            return Err(ResolveError::NoPriceData);
        }

        let (baseline, unpriced) = resolve_baseline(&frame, self.mode, self.start_date)?;
        skipped.extend(unpriced);

        let instruments = normalize_frame(&frame, &baseline);
        let nav = portfolio_nav(&instruments);

        Ok(PortfolioNav {
            name: portfolio.name.clone(),
            baseline,
            nav,
            instruments,
            skipped,
        })
    }

    /// Full report for a book.
    pub fn compute(&self, table: &PriceTable, book: &PortfolioBook) -> NavReport {
        let mut portfolios = Vec::new();
        let mut skipped_portfolios = Vec::new();

        for portfolio in book.portfolios() {
            match self.portfolio(table, portfolio) {
                Ok(nav) => portfolios.push(nav),
                Err(reason) => skipped_portfolios.push(SkippedPortfolio {
                    name: portfolio.name.clone(),
                    reason,
                }),
            }
        }

        let aggregate = aggregate_nav(&portfolios);
        let snapshot = Snapshot::from_series(&aggregate);

        let latest_prices = table.latest_closes(&book.all_symbols());

        NavReport {
            mode: self.mode,
            start_date: self.start_date,
            today: self.today,
            window: self.fetch_window(),
            portfolios,
            skipped_portfolios,
            aggregate,
            latest_prices,
            snapshot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceSeries;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn series(points: &[(&str, f64)]) -> PriceSeries {
        PriceSeries::from_points(points.iter().map(|(dt, c)| (d(dt), *c)))
    }

    #[test]
    fn empty_portfolio_is_skipped() {
        let engine = NavEngine::new(d("2024-01-02"), d("2024-02-01"));
        let err = engine
            .portfolio(&PriceTable::new(), &Portfolio::new("Cash", &[]))
            .unwrap_err();
        assert_eq!(err, ResolveError::NoInstruments);
    }

    #[test]
    fn portfolio_without_any_data_is_skipped() {
        let engine = NavEngine::new(d("2024-01-02"), d("2024-02-01"));
        let err = engine
            .portfolio(&PriceTable::new(), &Portfolio::new("P", &["A", "B"]))
            .unwrap_err();
        assert_eq!(err, ResolveError::NoPriceData);
    }

    #[test]
    fn report_collects_skips_and_latest_prices() {
        let table: PriceTable = [
            ("A".to_string(), series(&[("2024-01-02", 10.0), ("2024-01-03", 11.0)])),
            ("OLD".to_string(), series(&[("2023-12-01", 3.0)])),
        ]
        .into_iter()
        .collect();
        let book = PortfolioBook::new(vec![
            Portfolio::new("Live", &["A"]),
            Portfolio::new("Stale", &["OLD"]),
        ])
        .unwrap();

        let report = NavEngine::new(d("2024-01-02"), d("2024-02-01")).compute(&table, &book);

        assert_eq!(report.mode, Mode::Historical);
        assert_eq!(report.portfolios.len(), 1);
        assert_eq!(report.skipped_portfolios[0].name, "Stale");
        assert_eq!(
            report.skipped_portfolios[0].reason,
            ResolveError::NoDateOnOrAfter { start: d("2024-01-02") }
        );
        assert_eq!(report.aggregate, report.portfolio("Live").unwrap().nav);
        assert_eq!(report.latest_prices["A"], 11.0);
        assert_eq!(report.latest_prices["OLD"], 3.0);
    }

    #[test]
    fn empty_table_gives_empty_report() {
        let report = NavEngine::new(d("2024-01-02"), d("2024-02-01"))
            .compute(&PriceTable::new(), &PortfolioBook::default_book());
        assert!(report.is_empty());
        assert!(report.aggregate.is_empty());
        assert!(report.snapshot.is_none());
        assert_eq!(report.skipped_portfolios.len(), 4);
    }
}
