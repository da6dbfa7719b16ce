//! Property tests for synthetic price generation.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use proptest::prelude::*;
use starship_core::nav::FetchWindow;
use starship_runner::generate_synthetic_closes;

fn arb_window() -> impl Strategy<Value = FetchWindow> {
    (0i64..2000, 0i64..120).prop_map(|(offset, len)| {
        let start = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap() + Duration::days(offset);
        FetchWindow::new(start, start + Duration::days(len))
    })
}

proptest! {
    #[test]
    fn synthetic_closes_stay_inside_window_on_weekdays(
        symbol in "[A-Z]{1,5}",
        window in arb_window(),
    ) {
        let series = generate_synthetic_closes(&symbol, window);
        for (date, close) in series.iter() {
            prop_assert!(window.contains(date));
            prop_assert!(!matches!(date.weekday(), Weekday::Sat | Weekday::Sun));
            prop_assert!(close.is_finite() && close > 0.0);
        }
    }

    #[test]
    fn synthetic_closes_are_reproducible(symbol in "[A-Z]{1,5}", window in arb_window()) {
        prop_assert_eq!(
            generate_synthetic_closes(&symbol, window),
            generate_synthetic_closes(&symbol, window)
        );
    }
}
