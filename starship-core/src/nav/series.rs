//! NAV series and the gap-aware per-date mean.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Baseline-relative value per trading day (1.0 = baseline).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavSeries {
    points: BTreeMap<NaiveDate, f64>,
}

impl NavSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(points: impl IntoIterator<Item = (NaiveDate, f64)>) -> Self {
        Self {
            points: points.into_iter().collect(),
        }
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<(NaiveDate, f64)> {
        self.points.iter().next().map(|(d, v)| (*d, *v))
    }

    /// Last observation.
    pub fn latest(&self) -> Option<(NaiveDate, f64)> {
        self.points.iter().next_back().map(|(d, v)| (*d, *v))
    }

    /// Second-to-last observation, or the last one when only one exists.
    pub fn prior(&self) -> Option<(NaiveDate, f64)> {
        let mut rev = self.points.iter().rev();
        let last = rev.next()?;
        let prior = rev.next().unwrap_or(last);
        Some((*prior.0, *prior.1))
    }

    /// Cumulative return at the last observation (`latest - 1.0`).
    pub fn total_return(&self) -> Option<f64> {
        self.latest().map(|(_, v)| v - 1.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.points.iter().map(|(d, v)| (*d, *v))
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.keys().copied()
    }
}

impl FromIterator<(NaiveDate, f64)> for NavSeries {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, f64)>>(iter: I) -> Self {
        Self::from_points(iter)
    }
}

/// Equal-weight mean across series, date by date.
///
/// The result covers the union of all input dates. On each date only the
/// series that have a value contribute; a missing value is excluded from
/// that date's mean rather than counted as zero. Inputs are summed in the
/// order given, so identical inputs give bit-identical output.
pub fn mean_across<'a>(series: impl IntoIterator<Item = &'a NavSeries>) -> NavSeries {
    let mut acc: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for s in series {
        for (date, value) in s.iter() {
            let slot = acc.entry(date).or_insert((0.0, 0));
            slot.0 += value;
            slot.1 += 1;
        }
    }

    acc.into_iter()
        .map(|(date, (sum, n))| (date, sum / n as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn prior_falls_back_to_latest_for_single_point() {
        let s = NavSeries::from_points([(d("2024-01-02"), 1.0)]);
        assert_eq!(s.prior(), s.latest());
    }

    #[test]
    fn prior_is_second_to_last() {
        let s = NavSeries::from_points([
            (d("2024-01-02"), 1.0),
            (d("2024-01-03"), 1.1),
            (d("2024-01-04"), 1.2),
        ]);
        assert_eq!(s.prior(), Some((d("2024-01-03"), 1.1)));
        assert!((s.total_return().unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn empty_series_has_no_prior() {
        assert_eq!(NavSeries::new().prior(), None);
        assert_eq!(NavSeries::new().total_return(), None);
    }

    #[test]
    fn mean_excludes_missing_values() {
        let a = NavSeries::from_points([(d("2024-01-02"), 1.0), (d("2024-01-03"), 1.2)]);
        let b = NavSeries::from_points([(d("2024-01-02"), 1.0)]);

        let m = mean_across([&a, &b]);
        assert_eq!(m.get(d("2024-01-02")), Some(1.0));
        // Only A on 01-03
        assert_eq!(m.get(d("2024-01-03")), Some(1.2));
    }

    #[test]
    fn mean_covers_union_of_dates() {
        let a = NavSeries::from_points([(d("2024-01-02"), 1.0)]);
        let b = NavSeries::from_points([(d("2024-01-05"), 0.9)]);
        let m = mean_across([&a, &b]);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn mean_of_nothing_is_empty() {
        assert!(mean_across(std::iter::empty()).is_empty());
    }
}
