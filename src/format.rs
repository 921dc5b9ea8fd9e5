//! Output rendering for one-off scrape results and run summaries.

use crate::config::OutputFormat;
use crate::extract::{ExtractionResult, Retailer};
use crate::store::RunSummary;

/// Renders results in the configured output format.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a formatter for the given format.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a single extraction result.
    pub fn format_result(&self, url: &str, retailer: Retailer, result: &ExtractionResult) -> String {
        match self.format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "url": url,
                    "retailer": retailer.name(),
                    "result": result,
                });
                serde_json::to_string_pretty(&value).unwrap_or_default()
            }
            OutputFormat::Table => {
                let mut out = String::new();
                out.push_str(&format!("URL:       {}\n", url));
                out.push_str(&format!("Retailer:  {}\n", retailer.name()));
                out.push_str(&format!("Price:     {}\n", fmt_price(result.price)));
                out.push_str(&format!("Original:  {}\n", fmt_price(result.original_price)));
                out.push_str(&format!(
                    "Discount:  {}\n",
                    result.discount_pct.map_or("-".to_string(), |d| format!("{:.2}%", d))
                ));
                out.push_str(&format!(
                    "In stock:  {}\n",
                    if result.in_stock { "yes" } else { "no" }
                ));
                if let Some(error) = &result.error {
                    out.push_str(&format!("Error:     {}\n", error));
                }
                out
            }
        }
    }

    /// Formats a completed run summary.
    pub fn format_summary(&self, summary: &RunSummary) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(summary).unwrap_or_default(),
            OutputFormat::Table => {
                let mut out = String::new();
                out.push_str(&format!(
                    "Run finished: {}/{} successful, {} failed\n",
                    summary.successful, summary.total, summary.failed
                ));
                if !summary.errors.is_empty() {
                    out.push_str("\nErrors:\n");
                    for e in &summary.errors {
                        out.push_str(&format!("  {} - {}\n", e.url, e.error));
                    }
                }
                out
            }
        }
    }
}

fn fmt_price(price: Option<f64>) -> String {
    price.map_or("-".to_string(), |p| format!("{:.2} Lei", p))
}
