//! Starship Runner: run orchestration on top of `starship-core`.
//!
//! - Application config (TOML) with the portfolio book and cache settings
//! - Price loading with cache/provider/synthetic fallback and graceful degradation
//! - The NAV run entry point
//! - JSON/CSV export

pub mod config;
pub mod export;
pub mod loader;
pub mod runner;

pub use config::{AppConfig, CacheSection, ConfigError, StrategySection};
pub use export::{
    export_instruments_csv, export_json, export_nav_csv, file_stems, import_json, load_artifacts,
    save_artifacts,
};
pub use loader::{generate_synthetic_closes, load_prices, LoadError, LoadOptions, LoadedPrices};
pub use runner::{run_nav, NavRun, RunError, SCHEMA_VERSION};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<AppConfig>();
        assert_sync::<AppConfig>();
        assert_send::<LoadOptions>();
        assert_sync::<LoadOptions>();
    }

    #[test]
    fn nav_run_is_send_sync() {
        assert_send::<NavRun>();
        assert_sync::<NavRun>();
    }

    #[test]
    fn loaded_prices_is_send_sync() {
        assert_send::<LoadedPrices>();
        assert_sync::<LoadedPrices>();
    }
}
