//! The extraction engine: one policy, parameterized by retailer profile.
//!
//! Priority order on every page: out-of-stock markers and phrases, then
//! JSON-LD structured data, then the price meta tag, then the ranked
//! selector walk. Extraction never propagates an error past this module;
//! failures come back as an [`ExtractionResult`] with an error string.

use crate::extract::retailers::Retailer;
use crate::extract::selectors::{self, Profile, JSON_LD, META_PRICE};
use crate::extract::ExtractionResult;
use crate::normalize::{discount_percentage, parse_price};
use scraper::{ElementRef, Html};
use serde_json::Value;
use tracing::{debug, trace};

/// Attributes preferred over element text when reading a price candidate.
const PRICE_ATTRS: &[&str] = &["content", "data-price", "data-price-amount"];

/// Extraction strategy for one retailer.
pub struct Extractor {
    retailer: Retailer,
    profile: &'static Profile,
}

impl Extractor {
    /// Creates the extractor for a given retailer.
    pub fn new(retailer: Retailer) -> Self {
        Self { retailer, profile: selectors::profile(retailer) }
    }

    /// Resolves the extractor for a product URL by domain.
    pub fn for_url(url: &str) -> Self {
        Self::new(Retailer::for_url(url))
    }

    /// The retailer this extractor targets.
    pub fn retailer(&self) -> Retailer {
        self.retailer
    }

    /// Extracts price and stock signals from raw page markup.
    pub fn parse(&self, html: &str) -> ExtractionResult {
        if html.trim().is_empty() {
            return ExtractionResult::failed("empty document");
        }

        let document = Html::parse_document(html);

        let mut in_stock = self.detect_stock(&document);

        // Structured data wins over anything selector-based.
        let mut price = self.structured_price(&document, &mut in_stock);

        if price.is_none() {
            price = self.meta_price(&document);
        }

        if price.is_none() {
            price = self.selector_price(&document);
        }

        let original_price = self.original_price(&document, price);
        let discount_pct = discount_percentage(price, original_price);

        trace!(
            retailer = %self.retailer,
            ?price,
            ?original_price,
            in_stock,
            "extraction finished"
        );

        ExtractionResult { price, original_price, discount_pct, in_stock, error: None }
    }

    /// Stock detection: marker selectors first, then page-text phrases.
    /// Absence of a negative signal means in stock.
    fn detect_stock(&self, document: &Html) -> bool {
        for selector in &self.profile.out_of_stock {
            if document.select(selector).next().is_some() {
                debug!(retailer = %self.retailer, "out-of-stock marker matched");
                return false;
            }
        }

        let page_text: String = document.root_element().text().collect::<String>().to_lowercase();
        for phrase in self.profile.out_of_stock_phrases {
            if page_text.contains(phrase) {
                debug!(retailer = %self.retailer, phrase, "out-of-stock phrase found");
                return false;
            }
        }

        true
    }

    /// Scans every JSON-LD block for an offer price. Availability metadata
    /// in the same block overrides the text-based stock signal.
    fn structured_price(&self, document: &Html, in_stock: &mut bool) -> Option<f64> {
        for script in document.select(&JSON_LD) {
            let raw = script.text().collect::<String>();
            let Ok(json) = serde_json::from_str::<Value>(&raw) else {
                continue;
            };

            if let Some(price) = offer_price(&json, in_stock) {
                return Some(price);
            }

            if let Some(graph) = json.get("@graph").and_then(Value::as_array) {
                for item in graph {
                    if let Some(price) = offer_price(item, in_stock) {
                        return Some(price);
                    }
                }
            }
        }
        None
    }

    fn meta_price(&self, document: &Html) -> Option<f64> {
        document
            .select(&META_PRICE)
            .next()
            .and_then(|e| e.value().attr("content"))
            .and_then(parse_price)
            .filter(|p| *p > 0.0)
    }

    /// Walks the ranked selector list; the first strictly-positive parse wins.
    fn selector_price(&self, document: &Html) -> Option<f64> {
        for selector in &self.profile.price {
            for element in document.select(selector) {
                if let Some(price) = price_candidate(element).filter(|p| *p > 0.0) {
                    return Some(price);
                }
            }
        }
        None
    }

    /// Pre-discount price: accepted only when positive and greater than the
    /// current price, to avoid picking up an unrelated number.
    fn original_price(&self, document: &Html, current: Option<f64>) -> Option<f64> {
        for selector in &self.profile.original_price {
            if let Some(element) = document.select(selector).next() {
                let text = element.text().collect::<String>();
                if let Some(value) = parse_price(text.trim()) {
                    if value > 0.0 && current.is_none_or(|c| value > c) {
                        return Some(value);
                    }
                }
            }
        }
        None
    }
}

/// Reads a price from one element, preferring machine-readable attributes
/// over display text.
fn price_candidate(element: ElementRef) -> Option<f64> {
    for attr in PRICE_ATTRS {
        if let Some(value) = element.value().attr(attr) {
            if let Some(price) = parse_price(value) {
                return Some(price);
            }
        }
    }

    let text = element.text().collect::<String>();
    parse_price(text.trim())
}

/// Pulls `offers.price` out of one JSON-LD entity; flags out-of-stock
/// availability on the way.
fn offer_price(entity: &Value, in_stock: &mut bool) -> Option<f64> {
    let offers = entity.get("offers")?;

    let price = offers.get("price").and_then(json_number)?;

    if let Some(availability) = offers.get("availability").and_then(Value::as_str) {
        if availability.contains("OutOfStock") {
            *in_stock = false;
        }
    }

    Some(price)
}

/// JSON-LD prices appear both as numbers and as strings.
fn json_number(value: &Value) -> Option<f64> {
    value.as_f64().or_else(|| value.as_str().and_then(parse_price)).filter(|v| v.is_finite())
}
