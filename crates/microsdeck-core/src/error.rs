// ── Core error types ──
//
// Most backend failures never become errors: the transport degrades them to
// sentinels. What remains are lifecycle misuse and construction problems.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach MicroSDeck backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("A poll loop is already running for this manager")]
    AlreadyPolling,

    #[error("The manager has been shut down")]
    ShutDown,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<microsdeck_api::Error> for CoreError {
    fn from(err: microsdeck_api::Error) -> Self {
        match err {
            microsdeck_api::Error::Transport(ref e) => CoreError::ConnectionFailed {
                url: e
                    .url()
                    .map_or_else(|| "<unknown>".into(), ToString::to_string),
                reason: e.to_string(),
            },
            microsdeck_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            microsdeck_api::Error::Status { status, url } => CoreError::ConnectionFailed {
                url,
                reason: format!("HTTP {status}"),
            },
            microsdeck_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            microsdeck_api::Error::Decode(e) => {
                CoreError::Internal(format!("Event stream decode error: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_url_maps_to_config_error() {
        let err = CoreError::from(microsdeck_api::Error::InvalidUrl(
            url::ParseError::EmptyHost,
        ));
        assert!(matches!(err, CoreError::Config { .. }));
    }

    #[test]
    fn status_maps_to_connection_failed() {
        let err = CoreError::from(microsdeck_api::Error::Status {
            status: 502,
            url: "http://localhost:12412/list".into(),
        });
        assert_eq!(
            err.to_string(),
            "Cannot reach MicroSDeck backend at http://localhost:12412/list: HTTP 502"
        );
    }
}
