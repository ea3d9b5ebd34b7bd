//! Provider configuration and the immutable session shared by all resources.

use std::env;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tsw_api::{DEFAULT_BASE_URL, TswClient};

use crate::readiness::PollConfig;
use crate::{Error, Result};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Settings supplied once at configure time.
#[derive(Clone)]
pub struct ProviderConfig {
    /// API base URL. `None` (or blank) means [`DEFAULT_BASE_URL`].
    pub endpoint: Option<String>,
    pub api_token: String,
    pub poll_interval: Duration,
    /// Upper bound on the post-create readiness wait. `None` waits until
    /// the instance is ready or the operation is cancelled.
    pub poll_timeout: Option<Duration>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("endpoint", &self.endpoint)
            .field("api_token", &"[redacted]")
            .field("poll_interval", &self.poll_interval)
            .field("poll_timeout", &self.poll_timeout)
            .finish()
    }
}

/// The orchestrator's provider block: `{ endpoint?, api_token }`.
#[derive(Deserialize)]
struct ProviderBlock {
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    api_token: Option<String>,
}

impl ProviderConfig {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            endpoint: None,
            api_token: api_token.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = Some(timeout);
        self
    }

    /// Create from env vars:
    ///
    /// - `TSW_API_TOKEN` (required)
    /// - `TSW_ENDPOINT` (default: `https://api.tsw.io`)
    /// - `TSW_POLL_INTERVAL_MS` (default: `1000`)
    /// - `TSW_POLL_TIMEOUT_SECS` (optional, no bound when unset)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_token =
            env::var("TSW_API_TOKEN").map_err(|_| Error::MissingConfig("TSW_API_TOKEN".into()))?;

        let mut config = Self::new(api_token);
        config.endpoint = env::var("TSW_ENDPOINT").ok();
        config.with_env_polling()
    }

    /// Override polling settings from `TSW_POLL_INTERVAL_MS` and
    /// `TSW_POLL_TIMEOUT_SECS` when they are set.
    pub fn with_env_polling(self) -> Result<Self> {
        self.with_polling(
            env::var("TSW_POLL_INTERVAL_MS").ok().as_deref(),
            env::var("TSW_POLL_TIMEOUT_SECS").ok().as_deref(),
        )
    }

    fn with_polling(mut self, interval_ms: Option<&str>, timeout_secs: Option<&str>) -> Result<Self> {
        if let Some(raw) = interval_ms {
            let ms = raw.trim().parse::<u64>().map_err(|_| {
                Error::InvalidConfig(format!("TSW_POLL_INTERVAL_MS must be an integer, got {raw:?}"))
            })?;
            self.poll_interval = Duration::from_millis(ms);
        }

        if let Some(raw) = timeout_secs {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                Error::InvalidConfig(format!("TSW_POLL_TIMEOUT_SECS must be an integer, got {raw:?}"))
            })?;
            self.poll_timeout = Some(Duration::from_secs(secs));
        }

        Ok(self)
    }

    /// Parse the orchestrator's provider block. Polling settings keep
    /// their defaults.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        let block = ProviderBlock::deserialize(value).map_err(|source| Error::InvalidData {
            what: "provider configuration",
            source,
        })?;

        let api_token = block
            .api_token
            .ok_or_else(|| Error::MissingConfig("api_token".into()))?;

        let mut config = Self::new(api_token);
        config.endpoint = block.endpoint;
        Ok(config)
    }

    fn resolved_endpoint(&self) -> &str {
        match self.endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => endpoint,
            _ => DEFAULT_BASE_URL,
        }
    }
}

/// Validated endpoint and credential, built once and shared read-only by
/// every resource.
pub struct Session {
    client: TswClient,
    poll: PollConfig,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("client", &self.client)
            .field("poll", &self.poll)
            .finish()
    }
}

impl Session {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        if config.api_token.trim().is_empty() {
            return Err(Error::MissingConfig("api_token".into()));
        }
        if config.poll_interval.is_zero() {
            return Err(Error::InvalidConfig("poll interval must be non-zero".into()));
        }
        // A bound shorter than one interval expires before the first query.
        match config.poll_timeout {
            Some(timeout) if timeout < config.poll_interval => {
                return Err(Error::InvalidConfig(format!(
                    "poll timeout {timeout:?} is shorter than the poll interval {:?}",
                    config.poll_interval
                )));
            }
            _ => {}
        }

        let endpoint = config.resolved_endpoint().to_string();
        let url = reqwest::Url::parse(&endpoint).map_err(|e| Error::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidEndpoint {
                endpoint: endpoint.clone(),
                reason: format!("unsupported scheme {:?}", url.scheme()),
            });
        }

        tracing::info!(%endpoint, "configured teraswitch session");

        Ok(Self {
            client: TswClient::new(endpoint, config.api_token),
            poll: PollConfig {
                interval: config.poll_interval,
                timeout: config.poll_timeout,
            },
        })
    }

    pub fn client(&self) -> &TswClient {
        &self.client
    }

    pub fn poll(&self) -> &PollConfig {
        &self.poll
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_endpoint_falls_back_to_default() {
        let session = Session::new(ProviderConfig::new("t").with_endpoint("  ")).unwrap();
        assert_eq!(session.client().base_url(), DEFAULT_BASE_URL);

        let session = Session::new(ProviderConfig::new("t")).unwrap();
        assert_eq!(session.client().base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn custom_endpoint_is_used() {
        let session =
            Session::new(ProviderConfig::new("t").with_endpoint("http://127.0.0.1:8080/")).unwrap();
        assert_eq!(session.client().base_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn rejects_bad_endpoint() {
        let err = Session::new(ProviderConfig::new("t").with_endpoint("not a url")).unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint { .. }));

        let err = Session::new(ProviderConfig::new("t").with_endpoint("ftp://api.tsw.io")).unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint { .. }));
    }

    #[test]
    fn rejects_missing_token() {
        let err = Session::new(ProviderConfig::new("   ")).unwrap_err();
        assert!(matches!(err, Error::MissingConfig(_)));

        let err = ProviderConfig::from_value(&json!({"endpoint": "https://x"})).unwrap_err();
        assert!(matches!(err, Error::MissingConfig(_)));
    }

    #[test]
    fn from_value_reads_provider_block() {
        let config = ProviderConfig::from_value(&json!({
            "endpoint": "https://staging.tsw.io",
            "api_token": "abc",
        }))
        .unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("https://staging.tsw.io"));
        assert_eq!(config.api_token, "abc");
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert!(config.poll_timeout.is_none());
    }

    #[test]
    fn rejects_unusable_polling() {
        let err = Session::new(ProviderConfig::new("t").with_poll_interval(Duration::ZERO)).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let err = Session::new(ProviderConfig::new("t").with_poll_timeout(Duration::ZERO)).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let err = Session::new(
            ProviderConfig::new("t")
                .with_poll_interval(Duration::from_secs(5))
                .with_poll_timeout(Duration::from_secs(1)),
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("invalid configuration: poll timeout"));

        let session = Session::new(
            ProviderConfig::new("t")
                .with_poll_interval(Duration::from_secs(1))
                .with_poll_timeout(Duration::from_secs(1)),
        )
        .unwrap();
        assert_eq!(session.poll().timeout, Some(Duration::from_secs(1)));
    }

    #[test]
    fn malformed_polling_values_are_invalid_not_missing() {
        let err = ProviderConfig::new("t")
            .with_polling(Some("fast"), None)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: TSW_POLL_INTERVAL_MS must be an integer, got \"fast\""
        );

        let err = ProviderConfig::new("t")
            .with_polling(None, Some("-1"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let config = ProviderConfig::new("t")
            .with_polling(Some("250"), Some(" 30 "))
            .unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.poll_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn debug_never_prints_token() {
        let config = ProviderConfig::new("super-secret");
        assert!(!format!("{config:?}").contains("super-secret"));

        let session = Session::new(config).unwrap();
        assert!(!format!("{session:?}").contains("super-secret"));
    }
}
