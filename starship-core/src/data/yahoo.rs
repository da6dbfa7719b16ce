//! Yahoo Finance price source.
//!
//! Fetches daily closes from Yahoo's v8 chart API. Handles rate limiting,
//! retries with exponential backoff, response parsing, and the circuit breaker.
//!
//! Timestamps are converted once, here, to calendar dates in the exchange's
//! local time (`meta.gmtoffset`). Everything past this module works on naive
//! dates and never sees a timezone.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, PriceSource};
use crate::domain::PriceSeries;
use crate::nav::FetchWindow;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Yahoo Finance price source.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
    max_retry_after: Duration,
}

impl YahooProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_retry_after: Duration::from_secs(30),
        })
    }

    /// Build the chart API URL for a symbol and window.
    fn chart_url(symbol: &str, window: FetchWindow) -> String {
        let start_ts = midnight_utc(window.start);
        // period2 is exclusive; extend to the end of the last day
        let end_ts = midnight_utc(window.end + chrono::Duration::days(1));
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval=1d"
        )
    }

    /// Exchange-local calendar date of a bar timestamp.
    fn local_date(ts: i64, gmtoffset: i64) -> Result<NaiveDate, DataError> {
        DateTime::from_timestamp(ts + gmtoffset, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))
    }

    /// Parse the chart API response into a close series.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<PriceSeries, DataError> {
        let result = resp.chart.result.ok_or_else(|| {
            if let Some(err) = resp.chart.error {
                if err.code == "Not Found" {
                    DataError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    }
                } else {
                    DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
                }
            } else {
                DataError::ResponseFormatChanged("empty result with no error".into())
            }
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        let gmtoffset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);

        // A valid symbol with no trading days in range has no timestamp array.
        let Some(timestamps) = data.timestamp else {
            return Ok(PriceSeries::new());
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let mut series = PriceSeries::new();
        for (i, &ts) in timestamps.iter().enumerate() {
            // Null closes are holidays or halted sessions
            let Some(close) = quote.close.get(i).copied().flatten() else {
                continue;
            };
            series.insert(Self::local_date(ts, gmtoffset)?, close);
        }

        Ok(series)
    }

    /// Wait before retry `attempt` (1-based): exponential backoff, or the
    /// server's `retry-after` when longer, capped at `max_retry_after`.
    fn retry_delay(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        let backoff = self.base_delay * 2u32.pow(attempt.saturating_sub(1));
        match retry_after_secs {
            Some(secs) => backoff.max(Duration::from_secs(secs).min(self.max_retry_after)),
            None => backoff,
        }
    }

    /// Execute a single HTTP request with retry and circuit breaker logic.
    fn fetch_with_retry(&self, symbol: &str, window: FetchWindow) -> Result<PriceSeries, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let url = Self::chart_url(symbol, window);
        let mut last_error = None;
        let mut retry_after = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.retry_delay(attempt, retry_after.take());
                debug!(symbol, attempt, ?delay, "retrying");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::FORBIDDEN {
                        // IP ban: trip immediately
                        self.circuit_breaker.trip();
                        return Err(DataError::CircuitBreakerTripped);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        self.circuit_breaker.record_failure();
                        let secs = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        warn!(symbol, retry_after = secs, "rate limited");
                        retry_after = Some(secs);
                        last_error = Some(DataError::RateLimited {
                            retry_after_secs: secs,
                        });
                        continue;
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        return Err(DataError::AuthenticationRequired(
                            "Yahoo Finance requires authentication".into(),
                        ));
                    }

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(DataError::SymbolNotFound {
                            symbol: symbol.to_string(),
                        });
                    }

                    if !status.is_success() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(DataError::Other(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    let chart: ChartResponse = resp.json().map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "failed to parse response for {symbol}: {e}"
                        ))
                    })?;

                    let series = Self::parse_response(symbol, chart)?;
                    self.circuit_breaker.record_success();
                    return Ok(series);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

fn midnight_utc(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

impl PriceSource for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch_closes(&self, symbol: &str, window: FetchWindow) -> Result<PriceSeries, DataError> {
        // period bounds are UTC midnights; local dates can land one day outside
        let series = self.fetch_with_retry(symbol, window)?;
        Ok(PriceSeries::from_points(
            series.iter().filter(|(date, _)| window.contains(*date)),
        ))
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn parse(json: &str) -> Result<PriceSeries, DataError> {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        YahooProvider::parse_response("TSLA", resp)
    }

    #[test]
    fn retry_after_is_honoured_up_to_the_cap() {
        let provider = YahooProvider::new(Arc::new(CircuitBreaker::default_provider())).unwrap();

        assert_eq!(provider.retry_delay(1, None), Duration::from_millis(500));
        assert_eq!(provider.retry_delay(3, None), Duration::from_secs(2));
        assert_eq!(provider.retry_delay(1, Some(5)), Duration::from_secs(5));
        assert_eq!(provider.retry_delay(1, Some(600)), Duration::from_secs(30));
        // backoff wins when it is already longer
        assert_eq!(provider.retry_delay(3, Some(1)), Duration::from_secs(2));
    }

    #[test]
    fn url_covers_whole_window() {
        let url = YahooProvider::chart_url("TSLA", FetchWindow::new(d("2024-01-02"), d("2024-01-03")));
        assert!(url.contains("/chart/TSLA?"));
        assert!(url.contains("period1=1704153600"));
        assert!(url.contains("period2=1704326400"));
        assert!(url.contains("interval=1d"));
    }

    #[test]
    fn parses_closes_in_exchange_local_dates() {
        // 2024-01-02 14:30 UTC and 2024-01-03 14:30 UTC, New York offset -5h
        let json = r#"{"chart":{"result":[{
            "meta":{"gmtoffset":-18000},
            "timestamp":[1704205800,1704292200],
            "indicators":{"quote":[{"close":[248.42,238.45]}]}
        }],"error":null}}"#;

        let series = parse(json).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.get(d("2024-01-02")), Some(248.42));
        assert_eq!(series.get(d("2024-01-03")), Some(238.45));
    }

    #[test]
    fn offset_moves_late_utc_bar_to_previous_day() {
        // 2024-01-03 02:00 UTC is still 2024-01-02 in New York
        let json = r#"{"chart":{"result":[{
            "meta":{"gmtoffset":-18000},
            "timestamp":[1704247200],
            "indicators":{"quote":[{"close":[10.0]}]}
        }],"error":null}}"#;

        let series = parse(json).unwrap();
        assert_eq!(series.dates().next(), Some(d("2024-01-02")));
    }

    #[test]
    fn null_closes_are_skipped() {
        let json = r#"{"chart":{"result":[{
            "timestamp":[1704205800,1704292200],
            "indicators":{"quote":[{"close":[null,238.45]}]}
        }],"error":null}}"#;

        let series = parse(json).unwrap();
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn no_timestamps_is_empty_series() {
        let json = r#"{"chart":{"result":[{
            "meta":{"gmtoffset":-18000},
            "indicators":{"quote":[{}]}
        }],"error":null}}"#;
        assert!(parse(json).unwrap().is_empty());
    }

    #[test]
    fn not_found_maps_to_symbol_not_found() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(matches!(parse(json), Err(DataError::SymbolNotFound { .. })));
    }

    #[test]
    fn other_api_error_is_format_change() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input"}}}"#;
        assert!(matches!(parse(json), Err(DataError::ResponseFormatChanged(_))));
    }
}
