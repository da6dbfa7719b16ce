//! NAV normalization engine
//!
//! Baseline/window resolution, per-instrument normalization, and equal-weight
//! portfolio and aggregate composition.

pub mod baseline;
pub mod compose;
pub mod engine;
pub mod frame;
pub mod normalize;
pub mod series;
pub mod snapshot;
pub mod window;

pub use baseline::{resolve_baseline, select_baseline_date, Baseline, ResolveError};
pub use compose::{aggregate_nav, portfolio_nav, PortfolioNav};
pub use engine::{NavEngine, NavReport, SkippedPortfolio};
pub use frame::{ClosingFrame, SkipReason, SkippedInstrument};
pub use normalize::{normalize_frame, InstrumentNav};
pub use series::{mean_across, NavSeries};
pub use snapshot::Snapshot;
pub use window::{FetchWindow, Mode, PREVIEW_LOOKBACK_DAYS};
