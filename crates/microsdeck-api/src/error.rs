use thiserror::Error;

use crate::sse::DecodeError;

/// Top-level error type for the `microsdeck-api` crate.
///
/// Only the raw primitives surface these. The public `MicroSDeckClient`
/// operations degrade them to sentinels (`false`, `None`, empty lists)
/// after logging, so `microsdeck-core` never sees a transient blip as a hard
/// failure.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing or joining error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The backend answered with a non-success status.
    #[error("Backend returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// The `/listen` event stream contained an undecodable block.
    #[error("Event stream decode error: {0}")]
    Decode(#[from] DecodeError),
}

impl Error {
    /// Returns `true` if the backend could not be reached at all, as opposed
    /// to answering with something we did not like.
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Transport(e) => !e.is_timeout() && e.status().is_none(),
            Self::InvalidUrl(_) | Self::Decode(_) => true,
            Self::Status { .. } | Self::Deserialization { .. } => false,
        }
    }

    /// Returns `true` if the request timed out on the client side.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }

    /// HTTP status code, if the backend produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
