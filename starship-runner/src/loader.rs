//! Price loading for a run.
//!
//! Resolves one price table for the whole book. Fallback policy:
//! 1. Fresh cache entry for (symbol set, window) → use it
//! 2. Otherwise, unless offline → fetch from the price source and cache it,
//!    unless some symbol failed transiently (an incomplete table is not cached)
//! 3. Symbols still missing and `--synthetic` → generate synthetic closes (tagged)
//! 4. Otherwise → whatever was found, possibly nothing, plus diagnostics
//!
//! Loading never fails. An unreachable source yields an empty table and a
//! diagnostic, and every portfolio downstream degrades to "no data".

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use starship_core::data::{CacheKey, DataError, DataSource, PriceCache, PriceSource};
use starship_core::domain::{PriceSeries, PriceTable, Symbol};
use starship_core::nav::FetchWindow;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Non-fatal conditions met while loading prices.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cache unavailable: {0}")]
    Cache(DataError),

    #[error("price source '{source_name}' failed: {error}")]
    Source { source_name: String, error: DataError },

    #[error("fetching {symbol} failed: {error}")]
    FetchFailed { symbol: Symbol, error: DataError },

    #[error("no prices returned for: {}", .0.join(", "))]
    MissingSymbols(Vec<Symbol>),

    #[error("no cached prices and offline mode is on (use --synthetic for synthetic data)")]
    OfflineWithoutCache,

    #[error("no price source configured")]
    NoSource,
}

/// Options controlling how prices are loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Never make network requests.
    pub offline: bool,
    /// Generate synthetic closes for symbols with no real data.
    pub synthetic: bool,
    /// Read from and write to the cache.
    pub use_cache: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            offline: false,
            synthetic: false,
            use_cache: true,
        }
    }
}

/// A loaded price table with provenance.
#[derive(Debug, Default)]
pub struct LoadedPrices {
    pub table: PriceTable,
    /// Where each symbol's closes came from.
    pub sources: BTreeMap<Symbol, DataSource>,
    pub diagnostics: Vec<LoadError>,
    pub has_synthetic: bool,
}

impl LoadedPrices {
    /// BLAKE3 over every (symbol, date, close), in symbol then date order.
    pub fn dataset_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for (symbol, series) in self.table.iter() {
            hasher.update(symbol.as_bytes());
            for (date, close) in series.iter() {
                hasher.update(date.to_string().as_bytes());
                hasher.update(&close.to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }

    fn tag(&mut self, table: &PriceTable, source: DataSource) {
        for symbol in table.symbols() {
            self.sources.insert(symbol.to_string(), source);
        }
    }
}

/// Load closes for `symbols` over `window`.
pub fn load_prices(
    symbols: &[Symbol],
    window: FetchWindow,
    cache: Option<&dyn PriceCache>,
    source: Option<&dyn PriceSource>,
    opts: &LoadOptions,
    now: DateTime<Utc>,
) -> LoadedPrices {
    let mut loaded = LoadedPrices::default();
    let key = CacheKey::new(symbols, window);
    let cache = cache.filter(|_| opts.use_cache);

    // Step 1: cache
    if let Some(cache) = cache {
        match cache.get(&key, now) {
            Ok(Some(table)) => {
                info!(symbols = table.len(), window = %window, "prices served from cache");
                loaded.tag(&table, DataSource::Cache);
                loaded.table = table;
            }
            Ok(None) => debug!(window = %window, "cache miss"),
            Err(e) => {
                warn!(error = %e, "cache read failed");
                loaded.diagnostics.push(LoadError::Cache(e));
            }
        }
    }

    // Step 2: price source
    let mut failed: Vec<Symbol> = Vec::new();
    if loaded.table.is_empty() {
        match (opts.offline, source) {
            (true, _) => {
                if !opts.synthetic {
                    warn!("offline with no cached prices");
                    loaded.diagnostics.push(LoadError::OfflineWithoutCache);
                }
            }
            (false, None) => loaded.diagnostics.push(LoadError::NoSource),
            (false, Some(source)) => match source.fetch_table(symbols, window) {
                Ok(fetched) => {
                    info!(
                        source = source.name(),
                        symbols = fetched.table.len(),
                        failed = fetched.failures.len(),
                        "prices fetched"
                    );
                    match cache {
                        Some(_) if !fetched.is_complete() => {
                            warn!(failed = fetched.failures.len(), "incomplete fetch, not caching");
                        }
                        Some(cache) => {
                            if let Err(e) = cache.put(&key, &fetched.table, now) {
                                warn!(error = %e, "cache write failed");
                                loaded.diagnostics.push(LoadError::Cache(e));
                            }
                        }
                        None => {}
                    }
                    loaded.tag(&fetched.table, DataSource::YahooFinance);
                    loaded.table = fetched.table;
                    for (symbol, error) in fetched.failures {
                        failed.push(symbol.clone());
                        loaded.diagnostics.push(LoadError::FetchFailed { symbol, error });
                    }
                }
                Err(error) => {
                    warn!(source = source.name(), error = %error, "price fetch failed");
                    loaded.diagnostics.push(LoadError::Source {
                        source_name: source.name().to_string(),
                        error,
                    });
                }
            },
        }
    }

    // Step 3: synthetic fallback
    let missing: Vec<Symbol> = symbols
        .iter()
        .filter(|s| !loaded.table.contains(s))
        .cloned()
        .collect();
    if opts.synthetic {
        for symbol in &missing {
            warn!(symbol = %symbol, "generating synthetic prices, results will be tagged as synthetic");
            loaded
                .table
                .insert(symbol.clone(), generate_synthetic_closes(symbol, window));
            loaded.sources.insert(symbol.clone(), DataSource::Synthetic);
            loaded.has_synthetic = true;
        }
    } else if !loaded.table.is_empty() {
        let unknown: Vec<Symbol> = missing.into_iter().filter(|s| !failed.contains(s)).collect();
        if !unknown.is_empty() {
            loaded.diagnostics.push(LoadError::MissingSymbols(unknown));
        }
    }

    loaded
}

/// Generate a synthetic close series for development.
///
/// Random walk from 100.0 on weekdays only, seeded from the symbol, so the
/// same symbol and window always give the same series.
pub fn generate_synthetic_closes(symbol: &str, window: FetchWindow) -> PriceSeries {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut series = PriceSeries::new();
    let mut price = 100.0_f64;
    let mut current: NaiveDate = window.start;

    while current <= window.end {
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            let daily_return: f64 = rng.gen_range(-0.03..0.03);
            price *= 1.0 + daily_return;
            series.insert(current, price);
        }
        current += chrono::Duration::days(1);
    }

    series
}
