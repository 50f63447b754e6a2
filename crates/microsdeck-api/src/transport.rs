// Shared transport configuration for building the reqwest::Client.
//
// Regular requests and the long-lived `/listen` request share one client;
// the listen request overrides the client-wide timeout per request.

use std::time::Duration;

/// Default backend base URL on the device.
pub const DEFAULT_URL: &str = "http://localhost:12412";

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Timeout for ordinary request/response calls.
    pub timeout: Duration,
    /// Timeout for a single `/listen` long poll or stream. `None` waits
    /// until the server closes the connection.
    pub listen_timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            listen_timeout: Some(Duration::from_secs(300)),
            user_agent: format!("microsdeck/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    ///
    /// No client-wide timeout is installed; each request applies either
    /// `timeout` or `listen_timeout` itself.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .connect_timeout(self.timeout)
            .build()
            .map_err(crate::error::Error::Transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_listen_timeout_longer_than_request_timeout() {
        let config = TransportConfig::default();
        let listen = config.listen_timeout.unwrap_or(Duration::MAX);
        assert!(listen > config.timeout);
        assert!(config.user_agent.starts_with("microsdeck/"));
    }
}
