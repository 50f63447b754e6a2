// ── Runtime manager configuration ──
//
// These types describe *how* the manager talks to the backend and how
// aggressively it retries. They never touch disk: the CLI (through
// microsdeck-config) constructs a `ManagerConfig` and hands it in.

use std::time::Duration;

use microsdeck_api::TransportConfig;
use microsdeck_api::transport::DEFAULT_URL;
use url::Url;

/// How the poll loop waits for backend changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListenMode {
    /// `GET /listen` as a long poll that returns once something changed.
    LongPoll,
    /// `GET /listen` as an event stream: each decoded event triggers a fetch.
    #[default]
    Stream,
}

/// Delay schedule applied while the backend is unreachable.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Delay before the first retry after a failure.
    pub initial_delay: Duration,
    /// Delay the schedule resets to after a reachable-but-idle poll.
    pub floor_delay: Duration,
    /// Upper bound for the growing delay.
    pub max_delay: Duration,
    /// Growth factor per consecutive failure.
    pub factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            floor_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(60),
            factor: 1.5,
        }
    }
}

/// Configuration for one manager instance.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Backend base URL (e.g., `http://localhost:12412`).
    pub url: Url,
    /// Per-request timeout for ordinary calls.
    pub timeout: Duration,
    /// Timeout for one `/listen` request. `None` waits indefinitely.
    pub listen_timeout: Option<Duration>,
    pub listen_mode: ListenMode,
    pub backoff: BackoffConfig,
}

impl ManagerConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            ..Self::default()
        }
    }

    /// Transport settings derived from this configuration.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            timeout: self.timeout,
            listen_timeout: self.listen_timeout,
            ..TransportConfig::default()
        }
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        let transport = TransportConfig::default();
        Self {
            url: Url::parse(DEFAULT_URL).expect("default backend URL is valid"),
            timeout: transport.timeout,
            listen_timeout: transport.listen_timeout,
            listen_mode: ListenMode::default(),
            backoff: BackoffConfig::default(),
        }
    }
}
