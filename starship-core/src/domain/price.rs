//! Closing-price series and the multi-symbol price table.
//!
//! A `PriceTable` is always a symbol → series map, even when it holds a single
//! symbol. Non-trading days are absent rather than zero-filled, and
//! non-finite closes (provider nulls) are never stored.

use super::Symbol;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Daily closing prices for one instrument, ordered by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceSeries {
    closes: BTreeMap<NaiveDate, f64>,
}

impl PriceSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from `(date, close)` points. Non-finite closes are dropped;
    /// a repeated date keeps the last value.
    pub fn from_points(points: impl IntoIterator<Item = (NaiveDate, f64)>) -> Self {
        let mut series = Self::new();
        for (date, close) in points {
            series.insert(date, close);
        }
        series
    }

    /// Insert a close. Returns `false` if the value was rejected as non-finite.
    pub fn insert(&mut self, date: NaiveDate, close: f64) -> bool {
        if !close.is_finite() {
            return false;
        }
        self.closes.insert(date, close);
        true
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.closes.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    /// Most recent `(date, close)` observation.
    pub fn latest(&self) -> Option<(NaiveDate, f64)> {
        self.closes.iter().next_back().map(|(d, c)| (*d, *c))
    }

    /// Iterate `(date, close)` in ascending date order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.closes.iter().map(|(d, c)| (*d, *c))
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.closes.keys().copied()
    }
}

/// Closing prices for a set of instruments over a shared fetch window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceTable {
    series: BTreeMap<Symbol, PriceSeries>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the series for a symbol. Empty series are not stored, so
    /// a symbol without observations is indistinguishable from a missing one.
    pub fn insert(&mut self, symbol: impl Into<Symbol>, series: PriceSeries) {
        let symbol = symbol.into();
        if series.is_empty() {
            self.series.remove(&symbol);
        } else {
            self.series.insert(symbol, series);
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&PriceSeries> {
        self.series.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.series.contains_key(symbol)
    }

    /// Symbols present in the table, sorted.
    pub fn symbols(&self) -> impl Iterator<Item = &str> + '_ {
        self.series.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PriceSeries)> + '_ {
        self.series.iter().map(|(s, p)| (s.as_str(), p))
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Total number of `(symbol, date)` observations.
    pub fn observation_count(&self) -> usize {
        self.series.values().map(PriceSeries::len).sum()
    }

    /// Last available close of each of `symbols` that is in the table.
    pub fn latest_closes<'a>(
        &self,
        symbols: impl IntoIterator<Item = &'a Symbol>,
    ) -> BTreeMap<Symbol, f64> {
        symbols
            .into_iter()
            .filter_map(|sym| {
                let (_, close) = self.get(sym)?.latest()?;
                Some((sym.clone(), close))
            })
            .collect()
    }
}

impl FromIterator<(Symbol, PriceSeries)> for PriceTable {
    fn from_iter<I: IntoIterator<Item = (Symbol, PriceSeries)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (symbol, series) in iter {
            table.insert(symbol, series);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn non_finite_closes_are_dropped() {
        let s = PriceSeries::from_points([
            (d("2024-01-02"), 10.0),
            (d("2024-01-03"), f64::NAN),
            (d("2024-01-04"), f64::INFINITY),
        ]);
        assert_eq!(s.len(), 1);
        assert_eq!(s.get(d("2024-01-03")), None);
    }

    #[test]
    fn latest_is_last_by_date_not_insertion() {
        let mut s = PriceSeries::new();
        s.insert(d("2024-01-04"), 12.0);
        s.insert(d("2024-01-02"), 10.0);
        assert_eq!(s.latest(), Some((d("2024-01-04"), 12.0)));
        assert_eq!(s.dates().collect::<Vec<_>>(), vec![d("2024-01-02"), d("2024-01-04")]);
    }

    #[test]
    fn empty_series_is_not_stored() {
        let mut t = PriceTable::new();
        t.insert("SPY", PriceSeries::new());
        assert!(t.is_empty());
        assert!(!t.contains("SPY"));
    }

    #[test]
    fn latest_closes_use_last_available_value() {
        let t: PriceTable = [
            (
                "A".to_string(),
                PriceSeries::from_points([(d("2024-01-02"), 1.0), (d("2024-01-05"), 2.0)]),
            ),
            ("B".to_string(), PriceSeries::from_points([(d("2024-01-03"), 7.0)])),
        ]
        .into_iter()
        .collect();

        let latest = t.latest_closes(&["A".to_string(), "B".to_string(), "C".to_string()]);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest["A"], 2.0);
        assert_eq!(latest["B"], 7.0);
        assert_eq!(t.observation_count(), 3);
    }

    #[test]
    fn json_shape_is_symbol_to_date_map() {
        let t: PriceTable = [(
            "X".to_string(),
            PriceSeries::from_points([(d("2024-01-02"), 10.5)]),
        )]
        .into_iter()
        .collect();
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#"{"X":{"2024-01-02":10.5}}"#);
        let back: PriceTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
