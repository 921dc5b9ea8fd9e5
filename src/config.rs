//! Configuration management with TOML, environment variables, and CLI overrides.
//!
//! Scrape-policy constants (retry counts, backoff, jitter, failure threshold)
//! were tuned against the live retailers; they are defaults here, not
//! invariants, so individual deployments can adjust them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Fetch-proxy API key (ScraperAPI account), required for proxied domains
    #[serde(default)]
    pub proxy_api_key: Option<String>,

    /// Domains that block direct requests and must go through the fetch proxy
    #[serde(default = "default_proxy_domains")]
    pub proxy_domains: Vec<String>,

    /// Timeout for direct fetches, in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Timeout for proxied fetches, in seconds (the proxy adds latency)
    #[serde(default = "default_proxy_timeout_secs")]
    pub proxy_timeout_secs: u64,

    /// Maximum fetch attempts per target per run
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base delay for exponential backoff between fetch attempts, in milliseconds
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Lower bound of the randomized pause between targets, in milliseconds
    #[serde(default = "default_delay_min_ms")]
    pub delay_min_ms: u64,

    /// Upper bound of the randomized pause between targets, in milliseconds
    #[serde(default = "default_delay_max_ms")]
    pub delay_max_ms: u64,

    /// Consecutive failures before a target is deactivated
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,
}

fn default_proxy_domains() -> Vec<String> {
    vec!["drmax.ro".to_string()]
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_proxy_timeout_secs() -> u64 {
    60
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    2000
}

fn default_delay_min_ms() -> u64 {
    2000
}

fn default_delay_max_ms() -> u64 {
    5000
}

fn default_failure_threshold() -> u32 {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy_api_key: None,
            proxy_domains: default_proxy_domains(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            proxy_timeout_secs: default_proxy_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            delay_min_ms: default_delay_min_ms(),
            delay_max_ms: default_delay_max_ms(),
            failure_threshold: default_failure_threshold(),
            format: OutputFormat::Table,
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // 1. Explicit path takes precedence
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // 2. Try current directory
        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        // 3. Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("pharmatrack").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        // 4. Return default config
        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    pub fn with_env(mut self) -> Self {
        if let Ok(key) = std::env::var("PHARMATRACK_PROXY_KEY") {
            self.proxy_api_key = Some(key);
        }

        if let Ok(timeout) = std::env::var("PHARMATRACK_FETCH_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.fetch_timeout_secs = t;
            }
        }

        if let Ok(threshold) = std::env::var("PHARMATRACK_FAILURE_THRESHOLD") {
            if let Ok(t) = threshold.parse() {
                self.failure_threshold = t;
            }
        }

        self
    }

    /// Removes the inter-target and backoff sleeps; only for tests.
    #[doc(hidden)]
    pub fn without_delays(mut self) -> Self {
        self.delay_min_ms = 0;
        self.delay_max_ms = 0;
        self.retry_base_delay_ms = 0;
        self
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use: table, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.proxy_api_key.is_none());
        assert_eq!(config.proxy_domains, vec!["drmax.ro"]);
        assert_eq!(config.fetch_timeout_secs, 30);
        assert_eq!(config.proxy_timeout_secs, 60);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_base_delay_ms, 2000);
        assert_eq!(config.delay_min_ms, 2000);
        assert_eq!(config.delay_max_ms, 5000);
        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.format, OutputFormat::Table);
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert_eq!("TABLE".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);

        let err = "invalid".parse::<OutputFormat>().unwrap_err();
        assert!(err.contains("Unknown format"));
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Table.to_string(), "table");
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            proxy_api_key = "abc123"
            fetch_timeout_secs = 20
            failure_threshold = 5
            proxy_domains = ["drmax.ro", "example.ro"]
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.proxy_api_key, Some("abc123".to_string()));
        assert_eq!(config.fetch_timeout_secs, 20);
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.proxy_domains.len(), 2);
        // Unspecified fields keep their defaults
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.delay_max_ms, 5000);
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            retry_attempts = 5
            retry_base_delay_ms = 1000
            "#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.retry_attempts, 5);
        assert_eq!(config.retry_base_delay_ms, 1000);
    }

    #[test]
    fn test_config_from_file_not_found() {
        let result = Config::from_file("/nonexistent/path/config.toml");
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Failed to read config file"));
    }

    #[test]
    fn test_config_from_file_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid toml {{{{").unwrap();

        let result = Config::from_file(file.path());
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Failed to parse config file"));
    }

    #[test]
    fn test_config_with_env() {
        let orig_key = std::env::var("PHARMATRACK_PROXY_KEY").ok();
        let orig_threshold = std::env::var("PHARMATRACK_FAILURE_THRESHOLD").ok();

        std::env::set_var("PHARMATRACK_PROXY_KEY", "env-key");
        std::env::set_var("PHARMATRACK_FAILURE_THRESHOLD", "7");

        let config = Config::new().with_env();
        assert_eq!(config.proxy_api_key, Some("env-key".to_string()));
        assert_eq!(config.failure_threshold, 7);

        match orig_key {
            Some(v) => std::env::set_var("PHARMATRACK_PROXY_KEY", v),
            None => std::env::remove_var("PHARMATRACK_PROXY_KEY"),
        }
        match orig_threshold {
            Some(v) => std::env::set_var("PHARMATRACK_FAILURE_THRESHOLD", v),
            None => std::env::remove_var("PHARMATRACK_FAILURE_THRESHOLD"),
        }
    }

    #[test]
    fn test_config_with_env_invalid_values() {
        let orig = std::env::var("PHARMATRACK_FETCH_TIMEOUT").ok();

        std::env::set_var("PHARMATRACK_FETCH_TIMEOUT", "not_a_number");

        let config = Config::new().with_env();
        // Invalid values are ignored, keeping defaults
        assert_eq!(config.fetch_timeout_secs, 30);

        match orig {
            Some(v) => std::env::set_var("PHARMATRACK_FETCH_TIMEOUT", v),
            None => std::env::remove_var("PHARMATRACK_FETCH_TIMEOUT"),
        }
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = Config {
            proxy_api_key: Some("key".to_string()),
            proxy_domains: vec!["drmax.ro".to_string()],
            fetch_timeout_secs: 15,
            proxy_timeout_secs: 45,
            retry_attempts: 2,
            retry_base_delay_ms: 500,
            delay_min_ms: 100,
            delay_max_ms: 200,
            failure_threshold: 4,
            format: OutputFormat::Json,
        };

        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.proxy_api_key, config.proxy_api_key);
        assert_eq!(parsed.fetch_timeout_secs, config.fetch_timeout_secs);
        assert_eq!(parsed.retry_attempts, config.retry_attempts);
        assert_eq!(parsed.failure_threshold, config.failure_threshold);
        assert_eq!(parsed.format, config.format);
    }
}
