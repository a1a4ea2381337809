//! Client configuration.

use std::time::Duration;

/// Default bridge endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.privxx.app";

/// Settings for the HTTP bridge client.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Base URL of the bridge, without a trailing slash.
    pub base_url: String,

    /// Per-request timeout. `None` leaves the transport default in place;
    /// the only application-level timeout is the connect flow's bounded
    /// poll count.
    pub request_timeout: Option<Duration>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: None,
        }
    }
}

impl BridgeConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Read configuration from `PRIVXX_BRIDGE_URL` and
    /// `PRIVXX_REQUEST_TIMEOUT_MS`, falling back to defaults.
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("PRIVXX_BRIDGE_URL") {
            if !url.trim().is_empty() {
                config.base_url = url;
            }
        }
        if let Ok(raw) = std::env::var("PRIVXX_REQUEST_TIMEOUT_MS") {
            let ms: u64 = raw
                .parse()
                .map_err(|_| format!("PRIVXX_REQUEST_TIMEOUT_MS must be an integer, got {raw:?}"))?;
            config.request_timeout = Some(Duration::from_millis(ms));
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("bridge base URL must not be empty".to_string());
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(format!("bridge base URL must be http(s), got {:?}", self.base_url));
        }
        if self.request_timeout == Some(Duration::ZERO) {
            return Err("request timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = BridgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.request_timeout, None);
    }

    #[test]
    fn rejects_bad_urls() {
        assert!(BridgeConfig::new("").validate().is_err());
        assert!(BridgeConfig::new("ftp://bridge").validate().is_err());
        assert!(BridgeConfig::new("http://localhost:8787").validate().is_ok());
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = BridgeConfig::default().with_request_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_round_trip() {
        // Single test touches the env vars so parallel tests can't race.
        std::env::set_var("PRIVXX_BRIDGE_URL", "http://localhost:9999");
        std::env::set_var("PRIVXX_REQUEST_TIMEOUT_MS", "1500");
        let config = BridgeConfig::from_env().unwrap();
        assert_eq!(config.base_url, "http://localhost:9999");
        assert_eq!(config.request_timeout, Some(Duration::from_millis(1500)));

        std::env::set_var("PRIVXX_REQUEST_TIMEOUT_MS", "not-a-number");
        assert!(BridgeConfig::from_env().is_err());

        std::env::remove_var("PRIVXX_BRIDGE_URL");
        std::env::remove_var("PRIVXX_REQUEST_TIMEOUT_MS");
    }
}
