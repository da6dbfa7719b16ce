//! Domain types for Starship

pub mod portfolio;
pub mod price;

pub use portfolio::{BookError, Portfolio, PortfolioBook};
pub use price::{PriceSeries, PriceTable};

/// Symbol type alias
pub type Symbol = String;
