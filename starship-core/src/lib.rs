//! Starship Core: portfolio book, price data, and the NAV normalization engine.
//!
//! - Domain types (price series/tables, portfolios, the portfolio book)
//! - Baseline and fetch-window resolution (historical vs preview)
//! - Per-instrument normalization and equal-weight portfolio/aggregate NAV
//! - Price sources (Yahoo Finance) behind a circuit breaker, and a TTL cache

pub mod data;
pub mod domain;
pub mod nav;
