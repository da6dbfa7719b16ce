//! Latest-state projection over an already computed NAV series.

use super::series::NavSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Headline numbers for the account overview.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Date of the latest observation.
    pub as_of: NaiveDate,
    pub latest: f64,
    /// Second-to-last observation, or `latest` when there is only one.
    pub prior: f64,
    /// `(latest - prior) / prior`
    pub daily_change: f64,
    /// `latest - 1.0`
    pub total_return: f64,
}

impl Snapshot {
    /// `None` for an empty series.
    pub fn from_series(series: &NavSeries) -> Option<Self> {
        let (as_of, latest) = series.latest()?;
        let (_, prior) = series.prior()?;
        Some(Self {
            as_of,
            latest,
            prior,
            daily_change: (latest - prior) / prior,
            total_return: latest - 1.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn snapshot_of_two_points() {
        let s: NavSeries = [(d("2024-01-02"), 1.0), (d("2024-01-03"), 1.1)].into_iter().collect();
        let snap = Snapshot::from_series(&s).unwrap();

        assert_eq!(snap.as_of, d("2024-01-03"));
        assert_eq!(snap.prior, 1.0);
        assert!((snap.daily_change - 0.1).abs() < 1e-12);
        assert!((snap.total_return - 0.1).abs() < 1e-12);
    }

    #[test]
    fn single_point_has_zero_daily_change() {
        let s: NavSeries = [(d("2024-01-02"), 1.0)].into_iter().collect();
        let snap = Snapshot::from_series(&s).unwrap();
        assert_eq!(snap.prior, snap.latest);
        assert_eq!(snap.daily_change, 0.0);
        assert_eq!(snap.total_return, 0.0);
    }

    #[test]
    fn empty_series_has_no_snapshot() {
        assert!(Snapshot::from_series(&NavSeries::new()).is_none());
    }
}
