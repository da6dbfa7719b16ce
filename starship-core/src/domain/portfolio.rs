//! Portfolio book: named, fixed-composition instrument lists.
//!
//! Portfolios are declared as `[[portfolio]]` tables in the config file.
//! Configuration order is preserved and is the display order.

use super::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// A named, ordered set of instrument symbols.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    pub name: String,
    #[serde(default)]
    pub symbols: Vec<Symbol>,
}

impl Portfolio {
    pub fn new(name: impl Into<String>, symbols: &[&str]) -> Self {
        Self {
            name: name.into(),
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookError {
    #[error("portfolio book is empty")]
    Empty,

    #[error("portfolio name must not be blank")]
    BlankName,

    #[error("duplicate portfolio name '{0}'")]
    DuplicateName(String),

    #[error("portfolio '{portfolio}' contains a blank symbol")]
    BlankSymbol { portfolio: String },

    #[error("portfolio '{portfolio}' lists '{symbol}' more than once")]
    DuplicateSymbol { portfolio: String, symbol: String },
}

/// The configured, ordered list of portfolios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortfolioBook {
    portfolios: Vec<Portfolio>,
}

impl PortfolioBook {
    /// Build a validated book. Symbols are trimmed and upper-cased.
    pub fn new(portfolios: Vec<Portfolio>) -> Result<Self, BookError> {
        let portfolios = portfolios
            .into_iter()
            .map(|p| Portfolio {
                name: p.name.trim().to_string(),
                symbols: p.symbols.iter().map(|s| s.trim().to_uppercase()).collect(),
            })
            .collect();
        let book = Self { portfolios };
        book.validate()?;
        Ok(book)
    }

    fn validate(&self) -> Result<(), BookError> {
        if self.portfolios.is_empty() {
            return Err(BookError::Empty);
        }

        let mut names = HashSet::new();
        for p in &self.portfolios {
            if p.name.is_empty() {
                return Err(BookError::BlankName);
            }
            if !names.insert(p.name.as_str()) {
                return Err(BookError::DuplicateName(p.name.clone()));
            }

            let mut seen = HashSet::new();
            for sym in &p.symbols {
                if sym.is_empty() {
                    return Err(BookError::BlankSymbol {
                        portfolio: p.name.clone(),
                    });
                }
                if !seen.insert(sym.as_str()) {
                    return Err(BookError::DuplicateSymbol {
                        portfolio: p.name.clone(),
                        symbol: sym.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// The four strategy sleeves tracked by default.
    pub fn default_book() -> Self {
        Self {
            portfolios: vec![
                Portfolio::new(
                    "AI Full Stack",
                    &["MAGS", "VRT", "GRID", "SRVR", "URA", "SMH"],
                ),
                Portfolio::new("SpaceX Concept", &["RKLB", "ARKX", "STM"]),
                Portfolio::new("HI3 Cornerstone", &["VNQ", "PFF", "MOAT"]),
                Portfolio::new("Elon Concept", &["TSLA", "XPEV"]),
            ],
        }
    }

    pub fn portfolios(&self) -> &[Portfolio] {
        &self.portfolios
    }

    pub fn names(&self) -> Vec<&str> {
        self.portfolios.iter().map(|p| p.name.as_str()).collect()
    }

    /// Every symbol in the book, de-duplicated, in first-seen order.
    pub fn all_symbols(&self) -> Vec<Symbol> {
        let mut seen = HashSet::new();
        self.portfolios
            .iter()
            .flat_map(|p| p.symbols.iter())
            .filter(|s| seen.insert(s.as_str()))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.portfolios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.portfolios.is_empty()
    }
}

impl Default for PortfolioBook {
    fn default() -> Self {
        Self::default_book()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_book_is_valid() {
        let book = PortfolioBook::default_book();
        assert!(book.validate().is_ok());
        assert_eq!(book.len(), 4);
        assert_eq!(book.names()[0], "AI Full Stack");
        assert_eq!(book.portfolios()[3].symbols, vec!["TSLA", "XPEV"]);
    }

    #[test]
    fn all_symbols_dedupes_across_portfolios() {
        let book = PortfolioBook::new(vec![
            Portfolio::new("A", &["SPY", "QQQ"]),
            Portfolio::new("B", &["QQQ", "IWM"]),
        ])
        .unwrap();
        assert_eq!(book.all_symbols(), vec!["SPY", "QQQ", "IWM"]);
    }

    #[test]
    fn symbols_are_normalized_and_order_kept() {
        let book = PortfolioBook::new(vec![
            Portfolio::new(" Zeta ", &["tsla"]),
            Portfolio::new("Alpha", &[" spy ", "QQQ"]),
        ])
        .unwrap();
        assert_eq!(book.names(), vec!["Zeta", "Alpha"]);
        assert_eq!(book.portfolios()[0].symbols, vec!["TSLA"]);
        assert_eq!(book.portfolios()[1].symbols, vec!["SPY", "QQQ"]);
    }

    #[test]
    fn empty_portfolio_is_allowed() {
        let book = PortfolioBook::new(vec![Portfolio::new("Cash", &[])]).unwrap();
        assert!(book.all_symbols().is_empty());
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = PortfolioBook::new(vec![
            Portfolio::new("A", &["SPY"]),
            Portfolio::new("A", &["QQQ"]),
        ])
        .unwrap_err();
        assert_eq!(err, BookError::DuplicateName("A".into()));
    }

    #[test]
    fn rejects_duplicate_symbol_within_portfolio() {
        let err = PortfolioBook::new(vec![Portfolio::new("A", &["SPY", "spy"])]).unwrap_err();
        assert!(matches!(err, BookError::DuplicateSymbol { .. }));
    }

    #[test]
    fn rejects_empty_book_and_blank_names() {
        assert_eq!(PortfolioBook::new(vec![]).unwrap_err(), BookError::Empty);
        assert_eq!(
            PortfolioBook::new(vec![Portfolio::new("  ", &["SPY"])]).unwrap_err(),
            BookError::BlankName
        );
    }
}
