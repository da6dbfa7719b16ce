//! Portfolio closing frame: a portfolio's instruments on a common timeline.
//!
//! Given the price table and a portfolio's symbols, align the symbols that are
//! present to the union of their dates. A symbol without a close on a date
//! gets `None` there (no forward-fill). Rows where every instrument is missing
//! cannot occur: the date axis is built only from observed closes.

use crate::domain::{PriceTable, Symbol};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Why an instrument contributes nothing to its portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Symbol absent from the fetched table (delisted, typo, fetch failure).
    NotInPriceTable,
    /// No usable close on the baseline date, so there is no cost basis.
    NoPriceAtBaseline,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotInPriceTable => f.write_str("no data fetched"),
            SkipReason::NoPriceAtBaseline => f.write_str("no price at baseline"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedInstrument {
    pub symbol: Symbol,
    pub reason: SkipReason,
}

/// One instrument's closes aligned to the frame's date axis.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameColumn {
    pub symbol: Symbol,
    /// Same length as `ClosingFrame::dates`.
    pub closes: Vec<Option<f64>>,
}

/// Aligned closes for the resolvable instruments of one portfolio.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosingFrame {
    /// Common date axis, sorted ascending.
    pub dates: Vec<NaiveDate>,
    /// Columns in portfolio order.
    pub columns: Vec<FrameColumn>,
}

impl ClosingFrame {
    /// Align `symbols` from `table`. Symbols missing from the table are
    /// returned as skipped and get no column.
    pub fn align(table: &PriceTable, symbols: &[Symbol]) -> (Self, Vec<SkippedInstrument>) {
        let mut skipped = Vec::new();
        let mut present = Vec::new();
        for symbol in symbols {
            match table.get(symbol) {
                Some(series) => present.push((symbol, series)),
                None => skipped.push(SkippedInstrument {
                    symbol: symbol.clone(),
                    reason: SkipReason::NotInPriceTable,
                }),
            }
        }

        let dates: Vec<NaiveDate> = present
            .iter()
            .flat_map(|(_, series)| series.dates())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let columns = present
            .into_iter()
            .map(|(symbol, series)| FrameColumn {
                symbol: symbol.clone(),
                closes: dates.iter().map(|d| series.get(*d)).collect(),
            })
            .collect();

        (Self { dates, columns }, skipped)
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Row index of `date`, if it is on the axis.
    pub fn row_of(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Close of `column` at row `row`.
    pub fn close(&self, column: usize, row: usize) -> Option<f64> {
        self.columns.get(column)?.closes.get(row).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceSeries;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn table() -> PriceTable {
        [
            (
                "SPY".to_string(),
                PriceSeries::from_points([
                    (d("2024-01-02"), 100.0),
                    (d("2024-01-03"), 101.0),
                    (d("2024-01-04"), 102.0),
                ]),
            ),
            (
                "QQQ".to_string(),
                PriceSeries::from_points([(d("2024-01-02"), 200.0), (d("2024-01-04"), 202.0)]),
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn align_leaves_gaps_empty() {
        let (frame, skipped) = ClosingFrame::align(&table(), &["SPY".into(), "QQQ".into()]);

        assert!(skipped.is_empty());
        assert_eq!(frame.dates.len(), 3);
        assert_eq!(frame.columns[0].symbol, "SPY");
        assert_eq!(frame.close(0, 1), Some(101.0));
        // QQQ has no bar on 2024-01-03
        assert_eq!(frame.close(1, 1), None);
    }

    #[test]
    fn missing_symbol_is_skipped() {
        let (frame, skipped) = ClosingFrame::align(&table(), &["GONE".into(), "QQQ".into()]);

        assert_eq!(
            skipped,
            vec![SkippedInstrument {
                symbol: "GONE".into(),
                reason: SkipReason::NotInPriceTable,
            }]
        );
        assert_eq!(frame.columns.len(), 1);
        // Axis comes only from QQQ
        assert_eq!(frame.dates, vec![d("2024-01-02"), d("2024-01-04")]);
    }

    #[test]
    fn no_present_symbols_gives_empty_frame() {
        let (frame, skipped) = ClosingFrame::align(&PriceTable::new(), &["A".into()]);
        assert!(frame.is_empty());
        assert_eq!(skipped.len(), 1);
    }

    #[test]
    fn row_lookup() {
        let (frame, _) = ClosingFrame::align(&table(), &["SPY".into()]);
        assert_eq!(frame.row_of(d("2024-01-03")), Some(1));
        assert_eq!(frame.row_of(d("2024-01-05")), None);
    }
}
