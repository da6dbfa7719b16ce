//! Price acquisition and caching

pub mod cache;
pub mod circuit_breaker;
pub mod parquet_cache;
pub mod provider;
pub mod yahoo;

pub use cache::{CacheEntryMeta, CacheEntryStatus, CacheKey, MemoryCache, PriceCache, DEFAULT_TTL};
pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use parquet_cache::ParquetCache;
pub use provider::{DataError, DataSource, PriceSource, TableFetch};
pub use yahoo::YahooProvider;
