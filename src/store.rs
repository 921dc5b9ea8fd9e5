//! Persistence interface and the target/observation data model.
//!
//! The core talks to persistence through the narrow [`PriceStore`] trait:
//! list the active worklist, append observations, upsert health fields,
//! bracket runs. [`MemoryStore`] backs tests; [`JsonStore`] backs the CLI
//! with plain files on disk.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// One (product, retailer-URL) pairing under monitoring.
///
/// Never deleted by the core; crossing the failure threshold clears the
/// active flag, which is reversed only by an external operator action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub failure_count: u32,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub last_success_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_error: Option<String>,
}

fn default_active() -> bool {
    true
}

impl Target {
    /// Creates a fresh, active target.
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            failure_count: 0,
            active: true,
            last_success_at: None,
            last_error: None,
        }
    }
}

/// One timestamped scrape outcome for a target. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub target_id: String,
    pub price: Option<f64>,
    pub original_price: Option<f64>,
    pub discount_pct: Option<f64>,
    pub in_stock: bool,
    pub scraped_at: DateTime<Utc>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Health fields written back after every attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetHealth {
    pub failure_count: u32,
    pub active: bool,
    pub last_error: Option<String>,
    pub last_success_at: Option<DateTime<Utc>>,
}

/// One (url, error) pair from a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunError {
    pub url: String,
    pub error: String,
}

/// Totals and errors for one full orchestration pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<RunError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunSummary {
    /// Starts an empty summary.
    pub fn started_at(started_at: DateTime<Utc>) -> Self {
        Self { total: 0, successful: 0, failed: 0, errors: Vec::new(), started_at, finished_at: None }
    }

    /// Stamps the end of the run.
    pub fn finalize(&mut self, finished_at: DateTime<Utc>) {
        self.finished_at = Some(finished_at);
    }
}

/// Narrow persistence interface consumed by the orchestrator.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Returns all targets with the active flag set.
    async fn list_active_targets(&self) -> Result<Vec<Target>>;

    /// Appends one observation to the time series.
    async fn record_observation(&self, observation: &Observation) -> Result<()>;

    /// Idempotent upsert of a target's health fields.
    async fn update_target_health(&self, target_id: &str, health: &TargetHealth) -> Result<()>;

    /// Marks the beginning of a run for audit visibility.
    async fn start_run(&self) -> Result<()>;

    /// Records the finished run summary.
    async fn finish_run(&self, summary: &RunSummary) -> Result<()>;
}

/// In-memory store for tests and one-off runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    targets: Vec<Target>,
    observations: Vec<Observation>,
    runs: Vec<RunSummary>,
}

impl MemoryStore {
    /// Creates a store seeded with the given targets.
    pub fn new(targets: Vec<Target>) -> Self {
        Self { inner: Mutex::new(MemoryInner { targets, observations: Vec::new(), runs: Vec::new() }) }
    }

    /// Snapshot of all targets, including deactivated ones.
    pub fn targets(&self) -> Vec<Target> {
        self.inner.lock().unwrap().targets.clone()
    }

    /// Snapshot of the recorded observations.
    pub fn observations(&self) -> Vec<Observation> {
        self.inner.lock().unwrap().observations.clone()
    }

    /// Snapshot of the recorded run summaries.
    pub fn runs(&self) -> Vec<RunSummary> {
        self.inner.lock().unwrap().runs.clone()
    }
}

#[async_trait]
impl PriceStore for MemoryStore {
    async fn list_active_targets(&self) -> Result<Vec<Target>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.targets.iter().filter(|t| t.active).cloned().collect())
    }

    async fn record_observation(&self, observation: &Observation) -> Result<()> {
        self.inner.lock().unwrap().observations.push(observation.clone());
        Ok(())
    }

    async fn update_target_health(&self, target_id: &str, health: &TargetHealth) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let target = inner
            .targets
            .iter_mut()
            .find(|t| t.id == target_id)
            .with_context(|| format!("Unknown target: {}", target_id))?;

        target.failure_count = health.failure_count;
        target.active = health.active;
        target.last_error = health.last_error.clone();
        target.last_success_at = health.last_success_at;
        Ok(())
    }

    async fn start_run(&self) -> Result<()> {
        Ok(())
    }

    async fn finish_run(&self, summary: &RunSummary) -> Result<()> {
        self.inner.lock().unwrap().runs.push(summary.clone());
        Ok(())
    }
}

/// File-backed store: `targets.json` holds the worklist,
/// `observations.jsonl` and `runs.jsonl` are append-only logs.
pub struct JsonStore {
    dir: PathBuf,
    targets: Mutex<Vec<Target>>,
}

impl JsonStore {
    /// Opens (or initializes) a store in the given directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;

        let targets_path = dir.join("targets.json");
        let targets: Vec<Target> = if targets_path.exists() {
            let content = std::fs::read_to_string(&targets_path)
                .with_context(|| format!("Failed to read {}", targets_path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", targets_path.display()))?
        } else {
            Vec::new()
        };

        debug!("Opened store at {} with {} targets", dir.display(), targets.len());

        Ok(Self { dir, targets: Mutex::new(targets) })
    }

    /// Registers a new target and returns it.
    pub fn add_target(&self, url: impl Into<String>) -> Result<Target> {
        let target = Target::new(format!("t{}", Utc::now().timestamp_millis()), url);

        {
            let mut targets = self.targets.lock().unwrap();
            targets.push(target.clone());
            self.write_targets(&targets)?;
        }

        Ok(target)
    }

    /// Clears a deactivated target's failure state, putting it back on the
    /// worklist. Operator action; the scraper never calls this.
    pub fn reactivate_target(&self, target_id: &str) -> Result<Target> {
        let mut targets = self.targets.lock().unwrap();
        let target = targets
            .iter_mut()
            .find(|t| t.id == target_id)
            .with_context(|| format!("Unknown target: {}", target_id))?;

        target.active = true;
        target.failure_count = 0;
        target.last_error = None;
        let reactivated = target.clone();

        self.write_targets(&targets)?;
        Ok(reactivated)
    }

    /// Snapshot of all targets, including deactivated ones.
    pub fn all_targets(&self) -> Vec<Target> {
        self.targets.lock().unwrap().clone()
    }

    fn write_targets(&self, targets: &[Target]) -> Result<()> {
        let path = self.dir.join("targets.json");
        let json = serde_json::to_string_pretty(targets)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    fn append_jsonl(&self, file: &str, value: &impl Serialize) -> Result<()> {
        let path = self.dir.join(file);
        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        writeln!(f, "{}", serde_json::to_string(value)?)
            .with_context(|| format!("Failed to append to {}", path.display()))
    }
}

#[async_trait]
impl PriceStore for JsonStore {
    async fn list_active_targets(&self) -> Result<Vec<Target>> {
        let targets = self.targets.lock().unwrap();
        Ok(targets.iter().filter(|t| t.active).cloned().collect())
    }

    async fn record_observation(&self, observation: &Observation) -> Result<()> {
        self.append_jsonl("observations.jsonl", observation)
    }

    async fn update_target_health(&self, target_id: &str, health: &TargetHealth) -> Result<()> {
        let mut targets = self.targets.lock().unwrap();
        let target = targets
            .iter_mut()
            .find(|t| t.id == target_id)
            .with_context(|| format!("Unknown target: {}", target_id))?;

        target.failure_count = health.failure_count;
        target.active = health.active;
        target.last_error = health.last_error.clone();
        target.last_success_at = health.last_success_at;

        self.write_targets(&targets)
    }

    async fn start_run(&self) -> Result<()> {
        info!("Run started");
        Ok(())
    }

    async fn finish_run(&self, summary: &RunSummary) -> Result<()> {
        self.append_jsonl("runs.jsonl", summary)
    }
}
