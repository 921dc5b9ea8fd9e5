//! Fetch error taxonomy.

use std::time::Duration;
use thiserror::Error;

/// Errors produced by the fetch layer.
///
/// Timeouts, bad statuses, and transport failures are transient and worth
/// retrying; a missing proxy credential is a configuration problem and is
/// surfaced immediately.
#[derive(Debug, Error)]
pub enum FetchError {
    /// No response arrived within the configured duration.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered with a non-2xx status.
    #[error("HTTP status {0}")]
    Status(u16),

    /// Connection-level failure (DNS, TLS, reset, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The domain requires the fetch proxy but no API key is configured.
    #[error("proxy required for {0} but no proxy API key is configured")]
    ProxyCredentialMissing(String),
}

impl FetchError {
    /// Whether a retry has any chance of succeeding.
    pub fn is_transient(&self) -> bool {
        !matches!(self, FetchError::ProxyCredentialMissing(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transience_classification() {
        assert!(FetchError::Timeout(Duration::from_secs(30)).is_transient());
        assert!(FetchError::Status(503).is_transient());
        assert!(FetchError::Transport("connection reset".into()).is_transient());
        assert!(!FetchError::ProxyCredentialMissing("drmax.ro".into()).is_transient());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(FetchError::Status(404).to_string(), "HTTP status 404");
        let err = FetchError::ProxyCredentialMissing("drmax.ro".to_string());
        assert!(err.to_string().contains("drmax.ro"));
        assert!(err.to_string().contains("proxy"));
    }
}
