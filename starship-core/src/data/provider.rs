//! Price source trait and structured error types.
//!
//! The `PriceSource` trait abstracts over where closes come from (Yahoo
//! Finance, a fixture, a mock) so the loader can swap implementations and
//! tests can run without the network. Caching sits beside this trait, not
//! inside it; sources don't know about the cache.

use crate::domain::{PriceSeries, PriceTable, Symbol};
use crate::nav::FetchWindow;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Structured error types for data operations.
///
/// Displayable in both CLI output and collected run diagnostics.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Where a price table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    YahooFinance,
    Cache,
    Synthetic,
}

/// Outcome of a batch fetch.
#[derive(Debug, Default)]
pub struct TableFetch {
    pub table: PriceTable,
    /// Symbols that failed for a reason other than "not found", in request
    /// order. Their absence from `table` says nothing about the symbol.
    pub failures: Vec<(Symbol, DataError)>,
}

impl TableFetch {
    /// True when every requested symbol was either fetched or reported unknown.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A supplier of daily closing prices.
pub trait PriceSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch daily closes for one symbol over a window.
    fn fetch_closes(&self, symbol: &str, window: FetchWindow) -> Result<PriceSeries, DataError>;

    /// Check if the source is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool;

    /// Fetch closes for a set of symbols into one table.
    ///
    /// Unknown symbols are simply absent from the result. Any other per-symbol
    /// failure is kept in `failures`, including symbols never tried because
    /// the source became unavailable mid-batch. If nothing at all could be
    /// fetched, the first failure is returned instead so the caller can
    /// report why.
    fn fetch_table(&self, symbols: &[Symbol], window: FetchWindow) -> Result<TableFetch, DataError> {
        let mut fetched = TableFetch::default();

        for symbol in symbols {
            if !self.is_available() {
                warn!(source = self.name(), symbol = %symbol, "price source unavailable, skipping");
                fetched
                    .failures
                    .push((symbol.clone(), DataError::CircuitBreakerTripped));
                continue;
            }

            match self.fetch_closes(symbol, window) {
                Ok(series) => {
                    debug!(symbol = %symbol, points = series.len(), "fetched closes");
                    fetched.table.insert(symbol.clone(), series);
                }
                Err(DataError::SymbolNotFound { .. }) => {
                    warn!(symbol = %symbol, "symbol not found, skipping");
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "fetch failed");
                    fetched.failures.push((symbol.clone(), e));
                }
            }
        }

        if fetched.table.is_empty() && !fetched.failures.is_empty() {
            let (_, first) = fetched.failures.swap_remove(0);
            return Err(first);
        }
        Ok(fetched)
    }
}
