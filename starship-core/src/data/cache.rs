//! Price-table cache keyed by symbol set and window.
//!
//! A key is the sorted, de-duplicated symbol set plus the fetch window, so two
//! requests for the same instruments in a different order share one entry.
//! Entries carry their write time and read as a miss once older than the TTL.

use super::provider::DataError;
use crate::domain::{PriceTable, Symbol};
use crate::nav::FetchWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

/// Default time-to-live for cached tables: one hour.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Identity of a cached price table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    symbols: Vec<Symbol>,
    window: FetchWindow,
}

impl CacheKey {
    pub fn new(symbols: &[Symbol], window: FetchWindow) -> Self {
        let mut symbols = symbols.to_vec();
        symbols.sort();
        symbols.dedup();
        Self { symbols, window }
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn window(&self) -> FetchWindow {
        self.window
    }

    /// BLAKE3 digest of the key, hex encoded.
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for symbol in &self.symbols {
            hasher.update(symbol.as_bytes());
            hasher.update(b"\x1f");
        }
        hasher.update(self.window.start.to_string().as_bytes());
        hasher.update(b"..");
        hasher.update(self.window.end.to_string().as_bytes());
        hasher.finalize().to_hex().to_string()
    }
}

/// Sidecar describing one cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntryMeta {
    pub digest: String,
    pub symbols: Vec<Symbol>,
    pub window: FetchWindow,
    /// Number of (date, symbol) observations stored.
    pub rows: usize,
    pub cached_at: DateTime<Utc>,
}

impl CacheEntryMeta {
    pub fn new(key: &CacheKey, table: &PriceTable, cached_at: DateTime<Utc>) -> Self {
        Self {
            digest: key.digest(),
            symbols: key.symbols().to_vec(),
            window: key.window(),
            rows: table.observation_count(),
            cached_at,
        }
    }

    /// Fresh while `now - cached_at < ttl`.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match (now - self.cached_at).to_std() {
            Ok(age) => age < ttl,
            // written "in the future" (clock skew)
            Err(_) => true,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.cached_at).to_std().unwrap_or_default()
    }
}

/// One line of `cache status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntryStatus {
    pub meta: CacheEntryMeta,
    pub fresh: bool,
}

/// A store of price tables with a time-to-live.
///
/// Empty tables are never stored, so a failed fetch is retried next time.
pub trait PriceCache: Send + Sync {
    fn ttl(&self) -> Duration;

    /// Table for `key`, or `None` on a miss or a stale entry.
    fn get(&self, key: &CacheKey, now: DateTime<Utc>) -> Result<Option<PriceTable>, DataError>;

    fn put(&self, key: &CacheKey, table: &PriceTable, now: DateTime<Utc>) -> Result<(), DataError>;

    /// Metadata for every stored entry, fresh or not.
    fn entries(&self) -> Result<Vec<CacheEntryMeta>, DataError>;

    /// Remove every entry, returning how many were removed.
    fn clear(&self) -> Result<usize, DataError>;

    fn status(&self, now: DateTime<Utc>) -> Result<Vec<CacheEntryStatus>, DataError> {
        let ttl = self.ttl();
        let mut entries = self.entries()?;
        entries.sort_by(|a, b| b.cached_at.cmp(&a.cached_at));
        Ok(entries
            .into_iter()
            .map(|meta| CacheEntryStatus {
                fresh: meta.is_fresh(now, ttl),
                meta,
            })
            .collect())
    }
}

/// In-process cache, lost when the process exits.
#[derive(Debug)]
pub struct MemoryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (CacheEntryMeta, PriceTable)>>,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl PriceCache for MemoryCache {
    fn ttl(&self) -> Duration {
        self.ttl
    }

    fn get(&self, key: &CacheKey, now: DateTime<Utc>) -> Result<Option<PriceTable>, DataError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(match entries.get(&key.digest()) {
            Some((meta, table)) if meta.is_fresh(now, self.ttl) => Some(table.clone()),
            Some(_) => {
                debug!(digest = %key.digest(), "memory cache entry stale");
                None
            }
            None => None,
        })
    }

    fn put(&self, key: &CacheKey, table: &PriceTable, now: DateTime<Utc>) -> Result<(), DataError> {
        if table.is_empty() {
            return Ok(());
        }
        let meta = CacheEntryMeta::new(key, table, now);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(meta.digest.clone(), (meta, table.clone()));
        Ok(())
    }

    fn entries(&self) -> Result<Vec<CacheEntryMeta>, DataError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.values().map(|(meta, _)| meta.clone()).collect())
    }

    fn clear(&self) -> Result<usize, DataError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let n = entries.len();
        entries.clear();
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceSeries;
    use chrono::{NaiveDate, TimeZone};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn window() -> FetchWindow {
        FetchWindow::new(d("2024-01-01"), d("2024-01-31"))
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap()
    }

    fn table() -> PriceTable {
        [(
            "SPY".to_string(),
            PriceSeries::from_points([(d("2024-01-02"), 470.0), (d("2024-01-03"), 468.0)]),
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn key_ignores_symbol_order_and_duplicates() {
        let a = CacheKey::new(&["QQQ".into(), "SPY".into()], window());
        let b = CacheKey::new(&["SPY".into(), "QQQ".into(), "SPY".into()], window());
        assert_eq!(a, b);
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn key_depends_on_window() {
        let a = CacheKey::new(&["SPY".into()], window());
        let b = CacheKey::new(&["SPY".into()], FetchWindow::new(d("2024-01-01"), d("2024-02-01")));
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn key_separates_symbol_boundaries() {
        let a = CacheKey::new(&["AB".into(), "C".into()], window());
        let b = CacheKey::new(&["A".into(), "BC".into()], window());
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn freshness_is_strict_at_ttl() {
        let key = CacheKey::new(&["SPY".into()], window());
        let meta = CacheEntryMeta::new(&key, &table(), t0());
        let ttl = Duration::from_secs(3600);

        assert!(meta.is_fresh(t0(), ttl));
        assert!(meta.is_fresh(t0() + chrono::Duration::seconds(3599), ttl));
        assert!(!meta.is_fresh(t0() + chrono::Duration::seconds(3600), ttl));
        assert_eq!(meta.rows, 2);
    }

    #[test]
    fn memory_cache_hit_then_stale() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        let key = CacheKey::new(&["SPY".into()], window());
        cache.put(&key, &table(), t0()).unwrap();

        assert_eq!(cache.get(&key, t0()).unwrap(), Some(table()));
        assert_eq!(cache.get(&key, t0() + chrono::Duration::seconds(61)).unwrap(), None);
    }

    #[test]
    fn empty_tables_are_not_stored() {
        let cache = MemoryCache::default();
        let key = CacheKey::new(&["SPY".into()], window());
        cache.put(&key, &PriceTable::new(), t0()).unwrap();
        assert!(cache.entries().unwrap().is_empty());
    }

    #[test]
    fn status_reports_freshness_and_clear_empties() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache
            .put(&CacheKey::new(&["SPY".into()], window()), &table(), t0())
            .unwrap();
        cache
            .put(
                &CacheKey::new(&["QQQ".into()], window()),
                &table(),
                t0() + chrono::Duration::seconds(100),
            )
            .unwrap();

        let status = cache.status(t0() + chrono::Duration::seconds(120)).unwrap();
        assert_eq!(status.len(), 2);
        // newest first
        assert_eq!(status[0].meta.symbols, vec!["QQQ".to_string()]);
        assert!(status[0].fresh);
        assert!(!status[1].fresh);

        assert_eq!(cache.clear().unwrap(), 2);
        assert!(cache.entries().unwrap().is_empty());
    }
}
