//! Public configuration for the HTTP transport.

use std::time::Duration;

use yukkuri_core::{DEFAULT_ENDPOINT, PanelSettings};

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for [`HttpPanelTransport`](crate::HttpPanelTransport).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use yukkuri_rpc::RpcTransportConfig;
///
/// let config = RpcTransportConfig::new()
///     .with_base_url("http://192.168.1.20:50080")
///     .with_timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct RpcTransportConfig {
    /// Base URL of the Panel bridge; `/invoke` is appended
    pub(crate) base_url: String,
    /// User agent string for HTTP requests
    pub(crate) user_agent: String,
    /// Per-request timeout
    pub(crate) timeout: Duration,
    /// Optional bearer token the bridge checks
    pub(crate) token: Option<String>,
}

impl Default for RpcTransportConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ENDPOINT.to_string(),
            user_agent: concat!("yukkuri-rpc/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: DEFAULT_TIMEOUT,
            token: None,
        }
    }
}

impl RpcTransportConfig {
    /// Create a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the endpoint and request timeout from client settings.
    #[must_use]
    pub fn from_settings(settings: &PanelSettings) -> Self {
        Self::default()
            .with_base_url(settings.effective_endpoint())
            .with_timeout(settings.effective_request_timeout())
    }

    /// Set the bridge base URL.
    ///
    /// Defaults to `http://127.0.0.1:50080`.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the per-request timeout. Defaults to 5 seconds.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send `Authorization: Bearer <token>` with every request.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RpcTransportConfig::default();
        assert_eq!(config.base_url(), "http://127.0.0.1:50080");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert!(config.user_agent.starts_with("yukkuri-rpc/"));
        assert!(config.token.is_none());
    }

    #[test]
    fn test_builder_pattern() {
        let config = RpcTransportConfig::new()
            .with_base_url("http://panel.local:9000")
            .with_user_agent("stream-reader/2.0")
            .with_timeout(Duration::from_millis(750))
            .with_token("secret");

        assert_eq!(config.base_url(), "http://panel.local:9000");
        assert_eq!(config.user_agent, "stream-reader/2.0");
        assert_eq!(config.timeout(), Duration::from_millis(750));
        assert_eq!(config.token, Some("secret".to_string()));
    }

    #[test]
    fn test_from_settings() {
        let settings = PanelSettings {
            endpoint: Some("http://10.0.0.5:50080".to_string()),
            request_timeout_ms: Some(1_500),
            ..Default::default()
        };
        let config = RpcTransportConfig::from_settings(&settings);
        assert_eq!(config.base_url(), "http://10.0.0.5:50080");
        assert_eq!(config.timeout(), Duration::from_millis(1_500));
    }
}
