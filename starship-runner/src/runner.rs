//! NAV runner: wires together config, price loading, and the engine.
//!
//! `run_nav()` is the single entry point used by the CLI. It only fails on a
//! bad configuration; data problems surface as diagnostics on the result.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use starship_core::data::{DataSource, PriceCache, PriceSource};
use starship_core::domain::Symbol;
use starship_core::nav::{NavEngine, NavReport};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{AppConfig, ConfigError};
use crate::loader::{load_prices, LoadOptions};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavRun {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub report: NavReport,
    pub config_id: String,
    pub dataset_hash: String,
    pub sources: BTreeMap<Symbol, DataSource>,
    pub has_synthetic: bool,
    /// Human-readable acquisition problems (empty on a clean run).
    pub diagnostics: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Load prices for the configured book and compute its NAV report.
pub fn run_nav(
    config: &AppConfig,
    today: NaiveDate,
    cache: Option<&dyn PriceCache>,
    source: Option<&dyn PriceSource>,
    opts: &LoadOptions,
    now: DateTime<Utc>,
) -> Result<NavRun, RunError> {
    let book = config.book()?;
    let engine = NavEngine::new(config.strategy.start_date, today);
    let window = engine.fetch_window();
    info!(
        mode = %engine.mode(),
        start_date = %config.strategy.start_date,
        window = %window,
        portfolios = book.len(),
        names = ?book.names(),
        "starting NAV run"
    );

    let loaded = load_prices(&book.all_symbols(), window, cache, source, opts, now);
    let report = engine.compute(&loaded.table, &book);

    for skipped in &report.skipped_portfolios {
        warn!(portfolio = %skipped.name, reason = %skipped.reason, "portfolio skipped");
    }
    for portfolio in &report.portfolios {
        for skipped in &portfolio.skipped {
            warn!(
                portfolio = %portfolio.name,
                symbol = %skipped.symbol,
                reason = %skipped.reason,
                "instrument skipped"
            );
        }
    }

    Ok(NavRun {
        schema_version: SCHEMA_VERSION,
        config_id: config.config_id(),
        dataset_hash: loaded.dataset_hash(),
        sources: loaded.sources,
        has_synthetic: loaded.has_synthetic,
        diagnostics: loaded.diagnostics.iter().map(|e| e.to_string()).collect(),
        generated_at: now,
        report,
    })
}
