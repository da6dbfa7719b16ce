//! On-disk price cache.
//!
//! Layout: `{cache_dir}/key={DIGEST}/prices.parquet` plus `meta.json`.
//!
//! - Long format: one row per (date, symbol, close)
//! - Atomic writes (write to .tmp, rename into place)
//! - Integrity validation on load (schema, row count matches the sidecar)
//! - Corrupt files are quarantined (`prices.parquet.quarantined`) and read as a miss

use super::cache::{CacheEntryMeta, CacheKey, PriceCache, DEFAULT_TTL};
use super::provider::DataError;
use crate::domain::{PriceSeries, PriceTable};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

const PRICES_FILE: &str = "prices.parquet";
const META_FILE: &str = "meta.json";
const KEY_PREFIX: &str = "key=";

/// Days from 0001-01-01 to 1970-01-01; Polars stores dates as days since the epoch.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub struct ParquetCache {
    cache_dir: PathBuf,
    ttl: Duration,
}

impl ParquetCache {
    pub fn new(cache_dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ttl,
        }
    }

    pub fn with_default_ttl(cache_dir: impl Into<PathBuf>) -> Self {
        Self::new(cache_dir, DEFAULT_TTL)
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// `{cache_dir}/key={DIGEST}/`
    fn entry_dir(&self, digest: &str) -> PathBuf {
        self.cache_dir.join(format!("{KEY_PREFIX}{digest}"))
    }

    fn read_meta(dir: &Path) -> Result<CacheEntryMeta, DataError> {
        let content = fs::read_to_string(dir.join(META_FILE))
            .map_err(|e| DataError::CacheError(format!("meta read: {e}")))?;
        serde_json::from_str(&content).map_err(|e| DataError::CacheError(format!("meta parse: {e}")))
    }

    fn entry_dirs(&self) -> Result<Vec<PathBuf>, DataError> {
        if !self.cache_dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.cache_dir)
            .map_err(|e| DataError::CacheError(format!("read dir: {e}")))?;

        let mut dirs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DataError::CacheError(format!("dir entry: {e}")))?;
            let path = entry.path();
            let is_entry = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(KEY_PREFIX));
            if is_entry && path.is_dir() {
                dirs.push(path);
            }
        }
        Ok(dirs)
    }
}

impl PriceCache for ParquetCache {
    fn ttl(&self) -> Duration {
        self.ttl
    }

    fn get(&self, key: &CacheKey, now: DateTime<Utc>) -> Result<Option<PriceTable>, DataError> {
        let dir = self.entry_dir(&key.digest());
        if !dir.join(META_FILE).exists() {
            return Ok(None);
        }

        let meta = match Self::read_meta(&dir) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "unreadable cache sidecar, treating as miss");
                return Ok(None);
            }
        };
        if !meta.is_fresh(now, self.ttl) {
            debug!(digest = %meta.digest, age_secs = meta.age(now).as_secs(), "cache entry stale");
            return Ok(None);
        }

        let path = dir.join(PRICES_FILE);
        match load_and_validate_parquet(&path, meta.rows) {
            Ok(table) => {
                debug!(digest = %meta.digest, rows = meta.rows, "cache hit");
                Ok(Some(table))
            }
            Err(e) => {
                let quarantine = path.with_extension("parquet.quarantined");
                warn!(path = %path.display(), error = %e, "quarantining corrupt cache file");
                if let Err(rename_err) = fs::rename(&path, &quarantine) {
                    warn!(
                        path = %path.display(),
                        error = %rename_err,
                        "failed to quarantine corrupt cache file, it will be re-read next run"
                    );
                }
                Ok(None)
            }
        }
    }

    fn put(&self, key: &CacheKey, table: &PriceTable, now: DateTime<Utc>) -> Result<(), DataError> {
        if table.is_empty() {
            return Ok(());
        }

        let meta = CacheEntryMeta::new(key, table, now);
        let dir = self.entry_dir(&meta.digest);
        fs::create_dir_all(&dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let mut df = table_to_dataframe(table)?;
        let path = dir.join(PRICES_FILE);
        let tmp_path = path.with_extension("parquet.tmp");
        write_parquet(&mut df, &tmp_path)?;
        rename_into_place(&tmp_path, &path)?;

        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        let meta_path = dir.join(META_FILE);
        let meta_tmp = meta_path.with_extension("json.tmp");
        fs::write(&meta_tmp, meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;
        rename_into_place(&meta_tmp, &meta_path)?;

        debug!(digest = %meta.digest, rows = meta.rows, "cached price table");
        Ok(())
    }

    fn entries(&self) -> Result<Vec<CacheEntryMeta>, DataError> {
        let mut metas = Vec::new();
        for dir in self.entry_dirs()? {
            match Self::read_meta(&dir) {
                Ok(meta) => metas.push(meta),
                Err(e) => warn!(dir = %dir.display(), error = %e, "skipping unreadable cache entry"),
            }
        }
        Ok(metas)
    }

    fn clear(&self) -> Result<usize, DataError> {
        let dirs = self.entry_dirs()?;
        for dir in &dirs {
            fs::remove_dir_all(dir)
                .map_err(|e| DataError::CacheError(format!("remove {}: {e}", dir.display())))?;
        }
        Ok(dirs.len())
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn rename_into_place(tmp: &Path, path: &Path) -> Result<(), DataError> {
    fs::rename(tmp, path).map_err(|e| {
        let _ = fs::remove_file(tmp);
        DataError::CacheError(format!("atomic rename failed: {e}"))
    })
}

/// Flatten a price table into long format.
fn table_to_dataframe(table: &PriceTable) -> Result<DataFrame, DataError> {
    let n = table.observation_count();
    let mut dates: Vec<i32> = Vec::with_capacity(n);
    let mut symbols: Vec<&str> = Vec::with_capacity(n);
    let mut closes: Vec<f64> = Vec::with_capacity(n);

    for (symbol, series) in table.iter() {
        for (date, close) in series.iter() {
            dates.push(date.num_days_from_ce() - EPOCH_DAYS_FROM_CE);
            symbols.push(symbol);
            closes.push(close);
        }
    }

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| DataError::ParquetError(format!("date cast: {e}")))?,
        Column::new("symbol".into(), symbols),
        Column::new("close".into(), closes),
    ])
    .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let file =
        fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

/// Load a Parquet file and check it against the row count in its sidecar.
fn load_and_validate_parquet(path: &Path, expected_rows: usize) -> Result<PriceTable, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;

    if df.height() != expected_rows {
        return Err(DataError::ValidationError(format!(
            "expected {expected_rows} rows, found {}",
            df.height()
        )));
    }
    for col_name in ["date", "symbol", "close"] {
        if df.column(col_name).is_err() {
            return Err(DataError::ValidationError(format!("missing column '{col_name}'")));
        }
    }

    dataframe_to_table(&df)
}

fn dataframe_to_table(df: &DataFrame) -> Result<PriceTable, DataError> {
    let map_err = |e: PolarsError| DataError::ParquetError(format!("column read: {e}"));

    let date_ca = df
        .column("date")
        .map_err(map_err)?
        .date()
        .map_err(|e| DataError::ParquetError(format!("date column type: {e}")))?;
    let symbol_ca = df
        .column("symbol")
        .map_err(map_err)?
        .str()
        .map_err(|e| DataError::ParquetError(format!("symbol column type: {e}")))?;
    let close_ca = df
        .column("close")
        .map_err(map_err)?
        .f64()
        .map_err(|e| DataError::ParquetError(format!("close column type: {e}")))?;

    let mut by_symbol: BTreeMap<String, PriceSeries> = BTreeMap::new();
    for i in 0..df.height() {
        let days = date_ca
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null date at row {i}")))?;
        let date = NaiveDate::from_num_days_from_ce_opt(days + EPOCH_DAYS_FROM_CE)
            .ok_or_else(|| DataError::ValidationError(format!("date out of range at row {i}")))?;
        let symbol = symbol_ca
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null symbol at row {i}")))?;
        let close = close_ca
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null close at row {i}")))?;

        by_symbol.entry(symbol.to_string()).or_default().insert(date, close);
    }

    Ok(by_symbol.into_iter().collect())
}
