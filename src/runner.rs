//! Run orchestration: walk the active worklist, one target at a time.
//!
//! Targets are visited strictly sequentially with a randomized pause after
//! every attempt. The throttling is a functional requirement for staying
//! under the retailers' bot-detection thresholds, not a bottleneck to
//! parallelize away. A failure is always local to its target; the run
//! continues regardless.

use crate::config::Config;
use crate::extract::{ExtractionResult, Extractor};
use crate::fetch::{with_retry, PageFetcher};
use crate::store::{Observation, PriceStore, RunError, RunSummary, Target, TargetHealth};
use anyhow::{Context, Result};
use chrono::Utc;
use rand::RngExt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Error text used when a page fetched fine but no extractor path yielded a
/// usable price. Distinct from hard errors for observability.
pub const NO_PRICE_FOUND: &str = "no price found on page";

/// Walks the active target list once: fetch, extract, persist, update health.
pub struct ScrapeRunner<F, S> {
    fetcher: F,
    store: S,
    config: Config,
}

impl<F: PageFetcher, S: PriceStore> ScrapeRunner<F, S> {
    /// Creates a runner over the given fetcher and store.
    pub fn new(fetcher: F, store: S, config: Config) -> Self {
        Self { fetcher, store, config }
    }

    /// The store, for inspection after a run.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Executes one full pass over all active targets.
    pub async fn run(&self) -> Result<RunSummary> {
        self.store.start_run().await.context("Failed to start run")?;

        let targets =
            self.store.list_active_targets().await.context("Failed to list active targets")?;

        let mut summary = RunSummary::started_at(Utc::now());
        summary.total = targets.len();

        info!("Starting scrape for {} targets", targets.len());

        for target in &targets {
            info!("Scraping: {}", target.url);

            match self.scrape_target(&target.url).await {
                Ok(result) => {
                    summary.successful += 1;
                    self.persist_success(target, &result).await?;
                }
                Err(error) => {
                    summary.failed += 1;
                    summary
                        .errors
                        .push(RunError { url: target.url.clone(), error: error.clone() });
                    self.persist_failure(target, error).await?;
                }
            }

            // Randomized politeness pause, applied after every attempt
            self.pause_between_targets().await;
        }

        summary.finalize(Utc::now());
        self.store.finish_run(&summary).await.context("Failed to record run summary")?;

        info!(
            "Scrape completed: {}/{} successful, {} failed",
            summary.successful, summary.total, summary.failed
        );

        Ok(summary)
    }

    /// Fetches and extracts one target. A page that loads but yields no
    /// price is a failure, same as a transport error.
    async fn scrape_target(&self, url: &str) -> Result<ExtractionResult, String> {
        let html = with_retry(
            || self.fetcher.fetch(url),
            self.config.retry_attempts,
            Duration::from_millis(self.config.retry_base_delay_ms),
        )
        .await
        .map_err(|e| e.to_string())?;

        let extractor = Extractor::for_url(url);
        let result = extractor.parse(&html);

        if let Some(error) = result.error {
            return Err(error);
        }

        if !result.has_price() {
            return Err(NO_PRICE_FOUND.to_string());
        }

        Ok(result)
    }

    async fn persist_success(&self, target: &Target, result: &ExtractionResult) -> Result<()> {
        let now = Utc::now();

        self.store
            .record_observation(&Observation {
                target_id: target.id.clone(),
                price: result.price,
                original_price: result.original_price,
                discount_pct: result.discount_pct,
                in_stock: result.in_stock,
                scraped_at: now,
                error: None,
            })
            .await
            .context("Failed to record observation")?;

        // Any success resets the consecutive-failure count
        self.store
            .update_target_health(
                &target.id,
                &TargetHealth {
                    failure_count: 0,
                    active: true,
                    last_error: None,
                    last_success_at: Some(now),
                },
            )
            .await
            .context("Failed to update target health")
    }

    async fn persist_failure(&self, target: &Target, error: String) -> Result<()> {
        let now = Utc::now();
        let failure_count = target.failure_count + 1;
        let active = failure_count < self.config.failure_threshold;

        self.store
            .record_observation(&Observation {
                target_id: target.id.clone(),
                price: None,
                original_price: None,
                discount_pct: None,
                in_stock: false,
                scraped_at: now,
                error: Some(error.clone()),
            })
            .await
            .context("Failed to record observation")?;

        if !active {
            warn!("Deactivated target after {} consecutive errors: {}", failure_count, target.url);
        }

        self.store
            .update_target_health(
                &target.id,
                &TargetHealth {
                    failure_count,
                    active,
                    last_error: Some(error),
                    last_success_at: target.last_success_at,
                },
            )
            .await
            .context("Failed to update target health")
    }

    async fn pause_between_targets(&self) {
        let (min, max) = (self.config.delay_min_ms, self.config.delay_max_ms);
        if max == 0 {
            return;
        }

        let delay_ms = if min >= max { min } else { rand::rng().random_range(min..=max) };
        debug!("Pausing {}ms before next target", delay_ms);
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}

/// One-off scrape of a single URL, bypassing the store. Used by the CLI for
/// manually checking a page before registering it.
pub async fn scrape_once(fetcher: &impl PageFetcher, config: &Config, url: &str) -> ExtractionResult {
    let html = match with_retry(
        || fetcher.fetch(url),
        config.retry_attempts,
        Duration::from_millis(config.retry_base_delay_ms),
    )
    .await
    {
        Ok(html) => html,
        Err(err) => return ExtractionResult::failed(err.to_string()),
    };

    Extractor::for_url(url).parse(&html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    const PRICE_PAGE: &str =
        r#"<html><body><span class="product-price">45,90 Lei</span></body></html>"#;
    const NO_PRICE_PAGE: &str = r#"<html><body><p>Despre noi</p></body></html>"#;

    /// Mock fetcher serving canned pages keyed by URL.
    struct MockFetcher {
        pages: HashMap<String, String>,
        calls: AtomicU32,
    }

    impl MockFetcher {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, html)| (url.to_string(), html.to_string()))
                    .collect(),
                calls: AtomicU32::new(0),
            }
        }

        fn failing() -> Self {
            Self { pages: HashMap::new(), calls: AtomicU32::new(0) }
        }
    }

    #[async_trait]
    impl PageFetcher for MockFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pages.get(url).cloned().ok_or(FetchError::Status(500))
        }
    }

    fn test_config() -> Config {
        Config::default().without_delays()
    }

    fn runner(
        pages: &[(&str, &str)],
        targets: Vec<Target>,
    ) -> ScrapeRunner<MockFetcher, MemoryStore> {
        ScrapeRunner::new(MockFetcher::new(pages), MemoryStore::new(targets), test_config())
    }

    #[tokio::test]
    async fn test_successful_run() {
        let url = "https://www.catena.ro/p/1";
        let r = runner(&[(url, PRICE_PAGE)], vec![Target::new("a", url)]);

        let summary = r.run().await.unwrap();
        assert_eq!(summary.total, 1);
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.failed, 0);
        assert!(summary.errors.is_empty());
        assert!(summary.finished_at.is_some());

        let observations = r.store().observations();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].price, Some(45.9));
        assert!(observations[0].in_stock);
        assert!(observations[0].error.is_none());

        let target = &r.store().targets()[0];
        assert_eq!(target.failure_count, 0);
        assert!(target.active);
        assert!(target.last_success_at.is_some());
        assert!(target.last_error.is_none());
    }

    #[tokio::test]
    async fn test_fetch_failure_increments_counter() {
        let r = ScrapeRunner::new(
            MockFetcher::failing(),
            MemoryStore::new(vec![Target::new("a", "https://www.catena.ro/p/1")]),
            test_config(),
        );

        let summary = r.run().await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].error, "HTTP status 500");

        let target = &r.store().targets()[0];
        assert_eq!(target.failure_count, 1);
        assert!(target.active);
        assert_eq!(target.last_error.as_deref(), Some("HTTP status 500"));

        // Observation carries the error instead of a price
        let observations = r.store().observations();
        assert_eq!(observations.len(), 1);
        assert!(observations[0].price.is_none());
        assert!(observations[0].error.is_some());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_retried() {
        let r = ScrapeRunner::new(
            MockFetcher::failing(),
            MemoryStore::new(vec![Target::new("a", "https://www.catena.ro/p/1")]),
            test_config(),
        );

        r.run().await.unwrap();
        // 3 attempts for the single target
        assert_eq!(r.fetcher.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_price_found_is_a_failure() {
        let url = "https://www.catena.ro/p/1";
        let r = runner(&[(url, NO_PRICE_PAGE)], vec![Target::new("a", url)]);

        let summary = r.run().await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors[0].error, NO_PRICE_FOUND);

        let target = &r.store().targets()[0];
        assert_eq!(target.failure_count, 1);
        assert_eq!(target.last_error.as_deref(), Some(NO_PRICE_FOUND));
    }

    #[tokio::test]
    async fn test_third_consecutive_failure_deactivates() {
        let mut target = Target::new("a", "https://www.catena.ro/p/1");
        target.failure_count = 2;

        let r = ScrapeRunner::new(
            MockFetcher::failing(),
            MemoryStore::new(vec![target]),
            test_config(),
        );

        r.run().await.unwrap();

        let target = &r.store().targets()[0];
        assert_eq!(target.failure_count, 3);
        assert!(!target.active);
    }

    #[tokio::test]
    async fn test_deactivated_target_excluded_from_next_run() {
        let mut target = Target::new("a", "https://www.catena.ro/p/1");
        target.failure_count = 2;

        let r = ScrapeRunner::new(
            MockFetcher::failing(),
            MemoryStore::new(vec![target]),
            test_config(),
        );

        r.run().await.unwrap();
        let second = r.run().await.unwrap();
        assert_eq!(second.total, 0);
    }

    #[tokio::test]
    async fn test_success_resets_failure_counter() {
        let url = "https://www.catena.ro/p/1";
        let mut target = Target::new("a", url);
        target.failure_count = 2;
        target.last_error = Some("HTTP status 500".to_string());

        let r = runner(&[(url, PRICE_PAGE)], vec![target]);
        r.run().await.unwrap();

        let target = &r.store().targets()[0];
        assert_eq!(target.failure_count, 0);
        assert!(target.active);
        assert!(target.last_error.is_none());
    }

    #[tokio::test]
    async fn test_failure_never_aborts_run() {
        let ok_url = "https://www.catena.ro/p/ok";
        let bad_url = "https://www.catena.ro/p/bad";

        let r = runner(
            &[(ok_url, PRICE_PAGE)],
            vec![Target::new("bad", bad_url), Target::new("ok", ok_url)],
        );

        let summary = r.run().await.unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors[0].url, bad_url);
    }

    #[tokio::test]
    async fn test_run_recorded_in_store() {
        let url = "https://www.catena.ro/p/1";
        let r = runner(&[(url, PRICE_PAGE)], vec![Target::new("a", url)]);

        r.run().await.unwrap();
        let runs = r.store().runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].successful, 1);
    }

    #[tokio::test]
    async fn test_out_of_stock_page_still_succeeds() {
        let url = "https://www.catena.ro/p/1";
        let page = r#"<html><body>
            <span class="product-price">45,90 Lei</span>
            <p>stoc epuizat</p>
        </body></html>"#;

        let r = runner(&[(url, page)], vec![Target::new("a", url)]);
        let summary = r.run().await.unwrap();
        assert_eq!(summary.successful, 1);

        let observations = r.store().observations();
        assert_eq!(observations[0].price, Some(45.9));
        assert!(!observations[0].in_stock);
    }

    #[tokio::test]
    async fn test_scrape_once_success() {
        let url = "https://www.catena.ro/p/1";
        let fetcher = MockFetcher::new(&[(url, PRICE_PAGE)]);

        let result = scrape_once(&fetcher, &test_config(), url).await;
        assert_eq!(result.price, Some(45.9));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_scrape_once_fetch_error() {
        let fetcher = MockFetcher::failing();

        let result = scrape_once(&fetcher, &test_config(), "https://www.catena.ro/p/1").await;
        assert!(result.price.is_none());
        assert_eq!(result.error.as_deref(), Some("HTTP status 500"));
    }
}
