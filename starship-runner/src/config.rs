//! Application configuration (TOML).
//!
//! ```toml
//! [strategy]
//! start_date = "2025-01-01"
//!
//! [cache]
//! dir = "data/cache"
//! ttl_secs = 3600
//!
//! [[portfolio]]
//! name = "Elon Concept"
//! symbols = ["TSLA", "XPEV"]
//! ```
//!
//! Every section is optional. With no `[[portfolio]]` entries the default
//! book is tracked.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use starship_core::domain::{BookError, Portfolio, PortfolioBook};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors from loading or validating a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {reason}", path.display())]
    Io { path: PathBuf, reason: String },

    #[error("invalid config: {0}")]
    Parse(String),

    #[error("invalid portfolio book: {0}")]
    Book(#[from] BookError),
}

/// Nominal start date used when none is configured.
pub fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySection {
    /// Nominal strategy start; a future date switches the run to preview mode.
    pub start_date: NaiveDate,
}

impl Default for StrategySection {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub dir: PathBuf,
    pub ttl_secs: u64,
}

impl CacheSection {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/cache"),
            ttl_secs: 3600,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub strategy: StrategySection,
    pub cache: CacheSection,
    #[serde(rename = "portfolio", skip_serializing_if = "Vec::is_empty")]
    pub portfolios: Vec<Portfolio>,
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate. The book is checked here so a bad config fails
    /// before any data is fetched.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.book()?;
        Ok(config)
    }

    /// `from_file` when a path is given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// The configured book, or the default book when none is configured.
    pub fn book(&self) -> Result<PortfolioBook, ConfigError> {
        if self.portfolios.is_empty() {
            return Ok(PortfolioBook::default_book());
        }
        Ok(PortfolioBook::new(self.portfolios.clone())?)
    }

    /// Deterministic BLAKE3 hash of the serialized config.
    ///
    /// Two configs that serialize identically share an id.
    pub fn config_id(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.strategy.start_date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(config.cache.dir, PathBuf::from("data/cache"));
        assert_eq!(config.cache.ttl(), Duration::from_secs(3600));
        assert_eq!(config.book().unwrap(), PortfolioBook::default_book());
    }

    #[test]
    fn parses_all_sections() {
        let config = AppConfig::from_toml(
            r#"
            [strategy]
            start_date = "2024-06-03"

            [cache]
            dir = "/tmp/starship"
            ttl_secs = 60

            [[portfolio]]
            name = "Elon Concept"
            symbols = ["tsla", "XPEV"]
            "#,
        )
        .unwrap();

        assert_eq!(config.strategy.start_date, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        assert_eq!(config.cache.ttl_secs, 60);
        let book = config.book().unwrap();
        assert_eq!(book.names(), vec!["Elon Concept"]);
        assert_eq!(book.portfolios()[0].symbols, vec!["TSLA", "XPEV"]);
    }

    #[test]
    fn partial_cache_section_keeps_other_defaults() {
        let config = AppConfig::from_toml("[cache]\nttl_secs = 5\n").unwrap();
        assert_eq!(config.cache.dir, PathBuf::from("data/cache"));
        assert_eq!(config.cache.ttl_secs, 5);
    }

    #[test]
    fn duplicate_portfolio_is_rejected() {
        let err = AppConfig::from_toml(
            r#"
            [[portfolio]]
            name = "A"
            symbols = ["X"]

            [[portfolio]]
            name = "A"
            symbols = ["Y"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Book(BookError::DuplicateName(_))));
    }

    #[test]
    fn bad_date_is_a_parse_error() {
        let err = AppConfig::from_toml("[strategy]\nstart_date = \"soon\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn config_id_is_deterministic_and_sensitive() {
        let a = AppConfig::default();
        let mut b = AppConfig::default();
        assert_eq!(a.config_id(), b.config_id());

        b.strategy.start_date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_ne!(a.config_id(), b.config_id());
    }

    #[test]
    fn toml_round_trip() {
        let mut config = AppConfig::default();
        config.portfolios = vec![Portfolio::new("Solo", &["SPY"])];
        let back = AppConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = AppConfig::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
