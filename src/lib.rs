//! pharmatrack - pharmacy retail price tracker, scraping core.
//!
//! Periodically fetches a fixed worklist of retailer product pages,
//! extracts price and stock signals with per-retailer heuristics, and
//! records the outcomes as a time series behind a narrow store interface.

pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod format;
pub mod normalize;
pub mod runner;
pub mod store;

pub use config::Config;
pub use error::FetchError;
pub use extract::{ExtractionResult, Extractor, Retailer};
pub use runner::ScrapeRunner;
pub use store::{Observation, RunSummary, Target};
