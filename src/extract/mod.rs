//! Price and stock extraction from retailer product pages.

pub mod engine;
pub mod retailers;
pub mod selectors;

pub use engine::Extractor;
pub use retailers::Retailer;

use serde::{Deserialize, Serialize};

/// Structured output of one extraction pass over a product page.
///
/// Transient: consumed by the orchestrator immediately, never stored as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Current retail price, if any selector path yielded one.
    pub price: Option<f64>,
    /// Pre-discount price, only when greater than the current price.
    pub original_price: Option<f64>,
    /// Derived discount percentage, two decimals.
    pub discount_pct: Option<f64>,
    /// Availability; true unless a negative signal was found.
    pub in_stock: bool,
    /// Descriptive error when extraction could not proceed.
    pub error: Option<String>,
}

impl ExtractionResult {
    /// An extraction failure with all numeric fields empty.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            price: None,
            original_price: None,
            discount_pct: None,
            in_stock: false,
            error: Some(error.into()),
        }
    }

    /// Whether a usable (strictly positive) price was found.
    pub fn has_price(&self) -> bool {
        self.price.is_some_and(|p| p > 0.0)
    }
}
