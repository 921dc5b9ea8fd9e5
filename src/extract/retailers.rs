//! Retailer registry and URL-based strategy resolution.

use serde::{Deserialize, Serialize};
use url::Url;

/// The retailers with a dedicated extraction profile, plus the generic
/// fallback used for any unrecognized domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Retailer {
    Catena,
    DrMax,
    FarmaciaTei,
    HelpNet,
    RemediumFarm,
    Generic,
}

impl Retailer {
    /// Resolves the extraction strategy for a product URL by domain.
    ///
    /// The hostname is matched with the `www.` prefix stripped; anything
    /// outside the registry falls back to [`Retailer::Generic`]. Pure lookup.
    pub fn for_url(url: &str) -> Retailer {
        let Some(host) = host_of(url) else {
            return Retailer::Generic;
        };

        for retailer in Self::dedicated() {
            if let Some(domain) = retailer.domain() {
                if host == domain || host.ends_with(&format!(".{domain}")) {
                    return *retailer;
                }
            }
        }

        Retailer::Generic
    }

    /// Retailers with a dedicated profile, in registry order.
    pub fn dedicated() -> &'static [Retailer] {
        &[
            Retailer::Catena,
            Retailer::DrMax,
            Retailer::FarmaciaTei,
            Retailer::HelpNet,
            Retailer::RemediumFarm,
        ]
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Retailer::Catena => "Catena",
            Retailer::DrMax => "Dr Max",
            Retailer::FarmaciaTei => "Farmacia Tei",
            Retailer::HelpNet => "HelpNet",
            Retailer::RemediumFarm => "Remedium Farm",
            Retailer::Generic => "Generic",
        }
    }

    /// Registered domain, `None` for the generic fallback.
    pub fn domain(&self) -> Option<&'static str> {
        match self {
            Retailer::Catena => Some("catena.ro"),
            Retailer::DrMax => Some("drmax.ro"),
            Retailer::FarmaciaTei => Some("farmaciatei.ro"),
            Retailer::HelpNet => Some("helpnet.ro"),
            Retailer::RemediumFarm => Some("remediumfarm.ro"),
            Retailer::Generic => None,
        }
    }
}

impl std::fmt::Display for Retailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Extracts the hostname from a URL with the `www.` prefix stripped.
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_dedicated_retailers() {
        assert_eq!(Retailer::for_url("https://www.catena.ro/produs/nurofen"), Retailer::Catena);
        assert_eq!(Retailer::for_url("https://www.drmax.ro/vitamina-c"), Retailer::DrMax);
        assert_eq!(
            Retailer::for_url("https://www.farmaciatei.ro/supliment"),
            Retailer::FarmaciaTei
        );
        assert_eq!(Retailer::for_url("https://helpnet.ro/paracetamol"), Retailer::HelpNet);
        assert_eq!(
            Retailer::for_url("https://www.remediumfarm.ro/ibuprofen"),
            Retailer::RemediumFarm
        );
    }

    #[test]
    fn test_resolve_never_generic_for_registered_domain() {
        for retailer in Retailer::dedicated() {
            let url = format!("https://www.{}/some/product", retailer.domain().unwrap());
            assert_eq!(Retailer::for_url(&url), *retailer);
        }
    }

    #[test]
    fn test_resolve_unknown_domain_falls_back() {
        assert_eq!(Retailer::for_url("https://www.emag.ro/produs"), Retailer::Generic);
        assert_eq!(Retailer::for_url("https://example.com/x"), Retailer::Generic);
    }

    #[test]
    fn test_resolve_subdomain() {
        assert_eq!(Retailer::for_url("https://shop.catena.ro/produs"), Retailer::Catena);
    }

    #[test]
    fn test_resolve_invalid_url() {
        assert_eq!(Retailer::for_url("not a url"), Retailer::Generic);
        assert_eq!(Retailer::for_url(""), Retailer::Generic);
    }

    #[test]
    fn test_no_partial_domain_match() {
        // notcatena.ro must not resolve to Catena
        assert_eq!(Retailer::for_url("https://notcatena.ro/produs"), Retailer::Generic);
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("https://www.catena.ro/p/1"), Some("catena.ro".to_string()));
        assert_eq!(host_of("https://Catena.RO/p/1"), Some("catena.ro".to_string()));
        assert_eq!(host_of("https://helpnet.ro"), Some("helpnet.ro".to_string()));
        assert_eq!(host_of("garbage"), None);
    }

    #[test]
    fn test_retailer_names() {
        assert_eq!(Retailer::Catena.name(), "Catena");
        assert_eq!(Retailer::DrMax.to_string(), "Dr Max");
        assert!(Retailer::Generic.domain().is_none());
    }
}
