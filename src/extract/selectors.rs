//! Selector profiles for retailer product pages.
//!
//! Each profile carries the ranked CSS selector lists and out-of-stock
//! phrases historically observed on that retailer's markup. Update the
//! relevant profile when a retailer redesigns; capture an HTML sample and
//! add a test fixture alongside.

use crate::extract::retailers::Retailer;
use scraper::Selector;
use std::sync::LazyLock;

/// Ranked selectors and phrases for one retailer's page layout.
pub struct Profile {
    /// Markers whose presence means the product is out of stock.
    pub out_of_stock: Vec<Selector>,
    /// Lower-cased phrases that force out-of-stock when found in page text.
    pub out_of_stock_phrases: &'static [&'static str],
    /// Current-price candidates, most specific first.
    pub price: Vec<Selector>,
    /// Pre-discount price candidates ("old price", strikethrough markup).
    pub original_price: Vec<Selector>,
}

/// Structured-data blocks, checked before any selector.
pub static JSON_LD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

/// Open Graph style price meta tag, checked after structured data.
pub static META_PRICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="product:price:amount"]"#).unwrap());

fn compile(sources: &[&str]) -> Vec<Selector> {
    sources.iter().map(|s| Selector::parse(s).unwrap()).collect()
}

/// Returns the selector profile for a retailer.
pub fn profile(retailer: Retailer) -> &'static Profile {
    match retailer {
        Retailer::Catena => &CATENA,
        Retailer::DrMax => &DRMAX,
        Retailer::FarmaciaTei => &FARMACIA_TEI,
        Retailer::HelpNet => &HELPNET,
        Retailer::RemediumFarm => &REMEDIUM_FARM,
        Retailer::Generic => &GENERIC,
    }
}

static CATENA: LazyLock<Profile> = LazyLock::new(|| Profile {
    out_of_stock: compile(&[
        ".out-of-stock",
        ".unavailable",
        ".stoc-epuizat",
        ".indisponibil",
        ".product-unavailable",
        ".no-stock",
    ]),
    out_of_stock_phrases: &["stoc epuizat", "indisponibil", "produs indisponibil"],
    price: compile(&[
        ".product-price",
        ".price-box .price",
        ".special-price",
        ".final-price",
        "span.price",
        "[itemprop=\"price\"]",
        ".current-price",
        ".pret-produs",
    ]),
    original_price: compile(&[
        ".old-price",
        ".regular-price",
        "del .price",
        ".was-price",
        ".price-old",
        ".pret-vechi",
    ]),
});

// Dr Max runs a Magento-style storefront; structured data is usually
// present and the data-price-amount attribute is the most stable hook.
static DRMAX: LazyLock<Profile> = LazyLock::new(|| Profile {
    out_of_stock: compile(&[".out-of-stock", ".unavailable", ".product-unavailable"]),
    out_of_stock_phrases: &[
        "stoc epuizat",
        "indisponibil",
        "out of stock",
        "nu este disponibil",
    ],
    price: compile(&[
        "[data-price-amount]",
        "[data-price-type=\"finalPrice\"] .price",
        ".product-info-price .price",
        ".price-box .price",
        ".special-price .price",
        "[itemprop=\"price\"]",
        ".product-price",
        ".price",
    ]),
    original_price: compile(&[
        ".old-price .price",
        ".regular-price .price",
        "del .price",
        ".was-price",
        "[data-price-type=\"oldPrice\"] .price",
    ]),
});

static FARMACIA_TEI: LazyLock<Profile> = LazyLock::new(|| Profile {
    out_of_stock: compile(&[
        ".out-of-stock",
        ".unavailable",
        "[data-stock=\"0\"]",
        ".stoc-epuizat",
        ".indisponibil",
    ]),
    out_of_stock_phrases: &["stoc epuizat", "indisponibil", "out of stock"],
    price: compile(&[
        ".product-price .price",
        ".price-box .price",
        "[data-price-amount]",
        ".special-price .price",
        ".final-price .price",
        "span.price",
        ".product-info-price .price",
    ]),
    original_price: compile(&[
        ".old-price .price",
        ".regular-price .price",
        ".price-box .old-price",
        "del .price",
        ".was-price",
    ]),
});

// HelpNet also signals availability through a disabled add-to-cart button.
static HELPNET: LazyLock<Profile> = LazyLock::new(|| Profile {
    out_of_stock: compile(&[
        ".out-of-stock",
        ".unavailable",
        ".stoc-epuizat",
        ".indisponibil",
        ".product-unavailable",
        "[data-action=\"add-to-cart\"][disabled]",
        ".add-to-cart[disabled]",
        ".btn-cart[disabled]",
    ]),
    out_of_stock_phrases: &["stoc epuizat", "indisponibil", "momentan indisponibil"],
    price: compile(&[
        ".product-price",
        ".price-box .price",
        ".special-price",
        ".final-price",
        "span.price",
        "[itemprop=\"price\"]",
        ".product-info-price .price",
    ]),
    original_price: compile(&[
        ".old-price",
        ".regular-price",
        "del .price",
        ".was-price",
        ".price-old",
    ]),
});

static REMEDIUM_FARM: LazyLock<Profile> = LazyLock::new(|| Profile {
    out_of_stock: compile(&[".out-of-stock", ".unavailable", ".product-unavailable"]),
    out_of_stock_phrases: &[
        "stoc epuizat",
        "indisponibil",
        "out of stock",
        "nu este disponibil",
    ],
    price: compile(&[
        ".product-summary__info--price-gross",
        ".product-summary__info--price-box",
        ".product-price",
        "[itemprop=\"price\"]",
        ".price",
    ]),
    original_price: compile(&[
        ".product-summary__info--price-old",
        ".old-price",
        ".regular-price",
        "del .price",
        ".was-price",
    ]),
});

// Fallback used for any domain without a dedicated profile; the lists are
// deliberately broad and keyed to common storefront conventions.
static GENERIC: LazyLock<Profile> = LazyLock::new(|| Profile {
    out_of_stock: compile(&[
        ".out-of-stock",
        ".unavailable",
        ".stoc-epuizat",
        ".indisponibil",
        ".product-unavailable",
        ".no-stock",
        "[data-availability=\"out-of-stock\"]",
        ".sold-out",
    ]),
    out_of_stock_phrases: &[
        "stoc epuizat",
        "indisponibil",
        "out of stock",
        "sold out",
        "momentan indisponibil",
        "produs indisponibil",
        "nu este in stoc",
        "nu este disponibil",
    ],
    price: compile(&[
        "[itemprop=\"price\"]",
        "[data-price]",
        "[data-price-amount]",
        ".product-price",
        ".price-box .price",
        ".special-price .price",
        ".special-price",
        ".final-price .price",
        ".current-price",
        ".sale-price",
        ".pret",
        ".pret-produs",
        "span.price",
        "div.price",
        ".price",
    ]),
    original_price: compile(&[
        ".old-price",
        ".regular-price",
        ".original-price",
        "del .price",
        "del.price",
        ".was-price",
        ".price-old",
        ".pret-vechi",
        ".crossed-price",
        "s.price",
        "strike",
    ]),
});
