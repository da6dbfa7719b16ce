//! Starship CLI: portfolio NAV dashboard and cache management.
//!
//! Commands:
//! - `show`: fetch prices, compute NAVs, print the dashboard (or JSON), optionally export
//! - `portfolios`: list the configured portfolio book
//! - `cache status`: list cached price tables and their freshness
//! - `cache clear`: remove cached price tables

mod render;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use starship_core::data::{CircuitBreaker, ParquetCache, PriceCache, PriceSource, YahooProvider};
use starship_core::nav::Mode;
use starship_runner::{run_nav, save_artifacts, AppConfig, LoadOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "starship", about = "Starship: NAV tracker for fixed-composition portfolios")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute and display portfolio NAVs.
    Show {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Nominal start date (YYYY-MM-DD). Overrides the config.
        #[arg(long)]
        start: Option<String>,

        /// Offline mode: no network access.
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Use synthetic data for symbols with no real prices.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Bypass the price cache.
        #[arg(long, default_value_t = false)]
        no_cache: bool,

        /// Print the full report as JSON instead of the dashboard.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Write report.json and CSV files to this directory.
        #[arg(long)]
        export: Option<PathBuf>,

        /// Cache directory. Overrides the config.
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// List the configured portfolios.
    Portfolios {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached price tables and whether they are still fresh.
    Status {
        /// Cache directory. Defaults to ./data/cache.
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// Remove every cached price table.
    Clear {
        /// Cache directory. Defaults to ./data/cache.
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Actually delete (without this flag, only previews what would be removed).
        #[arg(long, default_value_t = false)]
        confirm: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Show {
            config,
            start,
            offline,
            synthetic,
            no_cache,
            json,
            export,
            cache_dir,
        } => {
            let opts = LoadOptions {
                offline,
                synthetic,
                use_cache: !no_cache,
            };
            run_show(config, start, cache_dir, opts, json, export)
        }
        Commands::Portfolios { config } => run_portfolios(config.as_deref()),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&resolve_cache_dir(cache_dir)),
            CacheAction::Clear { cache_dir, confirm } => {
                run_cache_clear(&resolve_cache_dir(cache_dir), confirm)
            }
        },
    }
}

fn resolve_cache_dir(cache_dir: Option<PathBuf>) -> PathBuf {
    cache_dir.unwrap_or_else(|| AppConfig::default().cache.dir)
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
}

fn run_show(
    config_path: Option<PathBuf>,
    start: Option<String>,
    cache_dir: Option<PathBuf>,
    opts: LoadOptions,
    json: bool,
    export: Option<PathBuf>,
) -> Result<()> {
    let mut config = AppConfig::load(config_path.as_deref())?;
    if let Some(start) = start.as_deref() {
        config.strategy.start_date = parse_date(start)?;
    }
    if let Some(dir) = cache_dir {
        config.cache.dir = dir;
    }
    let book = config.book()?;
    debug!(config_id = %config.config_id(), cache_dir = %config.cache.dir.display(), "config resolved");

    let cache = ParquetCache::new(&config.cache.dir, config.cache.ttl());
    let provider = if opts.offline {
        None
    } else {
        Some(YahooProvider::new(Arc::new(CircuitBreaker::default_provider()))?)
    };
    let provider_ref = provider.as_ref().map(|p| p as &dyn PriceSource);

    let today = chrono::Local::now().date_naive();
    let run = run_nav(&config, today, Some(&cache), provider_ref, &opts, Utc::now())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        print!("{}", render::render_dashboard(&run, &book));
    }

    if let Some(dir) = export {
        let written = save_artifacts(&run, &dir)?;
        // stdout carries the JSON report in --json mode
        if json {
            eprintln!("Artifacts saved to: {} ({} files)", dir.display(), written.len());
        } else {
            println!("Artifacts saved to: {} ({} files)", dir.display(), written.len());
        }
    }

    Ok(())
}

fn run_portfolios(config_path: Option<&Path>) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let book = config.book()?;
    let today = chrono::Local::now().date_naive();
    let mode = Mode::resolve(config.strategy.start_date, today);

    println!("Start date: {} ({mode})", config.strategy.start_date);
    println!();
    println!("{:<20} {:>7}  Symbols", "Portfolio", "Members");
    println!("{}", "-".repeat(60));
    for p in book.portfolios() {
        println!("{:<20} {:>7}  {}", p.name, p.symbols.len(), p.symbols.join(", "));
    }
    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cache = ParquetCache::with_default_ttl(cache_dir);
    let now = Utc::now();
    let status = cache.status(now)?;
    if status.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    println!("Cache: {}", cache_dir.display());
    println!("Entries: {}  (TTL {}s)", status.len(), cache.ttl().as_secs());
    println!();
    println!(
        "{:<14} {:<26} {:>6} {:>8}  {:<6} Symbols",
        "Key", "Window", "Rows", "Age", "State"
    );
    println!("{}", "-".repeat(80));
    for entry in &status {
        let meta = &entry.meta;
        println!(
            "{:<14} {:<26} {:>6} {:>8}  {:<6} {}",
            &meta.digest[..meta.digest.len().min(12)],
            meta.window.to_string(),
            meta.rows,
            format_age(meta.age(now).as_secs()),
            if entry.fresh { "fresh" } else { "stale" },
            meta.symbols.join(",")
        );
    }
    Ok(())
}

fn run_cache_clear(cache_dir: &Path, confirm: bool) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cache = ParquetCache::with_default_ttl(cache_dir);
    let entries = cache.entries()?;
    if entries.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    if !confirm {
        println!("Found {} cached price table(s) in {}.", entries.len(), cache_dir.display());
        println!();
        println!("Dry run: pass --confirm to actually delete.");
        return Ok(());
    }

    let removed = cache.clear()?;
    println!("Done. Removed {removed} cached price table(s).");
    Ok(())
}

fn format_age(secs: u64) -> String {
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86_400 {
        format!("{:.1}h", secs as f64 / 3600.0)
    } else {
        format!("{:.1}d", secs as f64 / 86_400.0)
    }
}
