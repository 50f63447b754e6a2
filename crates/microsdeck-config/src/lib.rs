//! Shared configuration for the MicroSDeck CLI.
//!
//! A TOML file in the platform config directory, overridden by
//! `MICROSDECK_*` environment variables, validated and translated to
//! `microsdeck_core::ManagerConfig`. The CLI layers its flags on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use microsdeck_core::{BackoffConfig, ListenMode, ManagerConfig};

const ENV_PREFIX: &str = "MICROSDECK_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Listen strategy as spelled in the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenModeSetting {
    Poll,
    #[default]
    Stream,
}

impl From<ListenModeSetting> for ListenMode {
    fn from(value: ListenModeSetting) -> Self {
        match value {
            ListenModeSetting::Poll => ListenMode::LongPoll,
            ListenModeSetting::Stream => ListenMode::Stream,
        }
    }
}

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Backend base URL.
    #[serde(default = "default_url")]
    pub url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Timeout for one `/listen` request in seconds. 0 waits forever.
    #[serde(default = "default_listen_timeout")]
    pub listen_timeout: u64,

    #[serde(default)]
    pub listen_mode: ListenModeSetting,

    #[serde(default)]
    pub backoff: Backoff,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout: default_timeout(),
            listen_timeout: default_listen_timeout(),
            listen_mode: ListenModeSetting::default(),
            backoff: Backoff::default(),
        }
    }
}

fn default_url() -> String {
    "http://localhost:12412".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_listen_timeout() -> u64 {
    300
}

/// `[backoff]` table. Delays are in milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Backoff {
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,
    #[serde(default = "default_floor_ms")]
    pub floor_ms: u64,
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
    #[serde(default = "default_factor")]
    pub factor: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial_ms: default_initial_ms(),
            floor_ms: default_floor_ms(),
            max_ms: default_max_ms(),
            factor: default_factor(),
        }
    }
}

fn default_initial_ms() -> u64 {
    500
}
fn default_floor_ms() -> u64 {
    100
}
fn default_max_ms() -> u64 {
    60_000
}
fn default_factor() -> f64 {
    1.5
}

// ── Validation and translation ──────────────────────────────────────

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parsed_url()?;

        if self.timeout == 0 {
            return Err(invalid("timeout", "must be at least 1 second"));
        }

        let b = &self.backoff;
        if b.initial_ms == 0 || b.floor_ms == 0 {
            return Err(invalid("backoff", "delays must be greater than zero"));
        }
        if b.initial_ms > b.max_ms || b.floor_ms > b.max_ms {
            return Err(invalid(
                "backoff",
                format!("initial_ms and floor_ms must not exceed max_ms ({})", b.max_ms),
            ));
        }
        if !b.factor.is_finite() || b.factor < 1.0 {
            return Err(invalid(
                "backoff.factor",
                format!("expected a number >= 1.0, got {}", b.factor),
            ));
        }
        Ok(())
    }

    fn parsed_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.url)
            .map_err(|e| invalid("url", format!("{}: {e}", self.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(
                "url",
                format!("expected an http(s) URL, got '{}'", self.url),
            ));
        }
        Ok(url)
    }

    /// Validate and build the runtime configuration.
    pub fn to_manager_config(&self) -> Result<ManagerConfig, ConfigError> {
        self.validate()?;

        Ok(ManagerConfig {
            url: self.parsed_url()?,
            timeout: Duration::from_secs(self.timeout),
            listen_timeout: (self.listen_timeout > 0)
                .then(|| Duration::from_secs(self.listen_timeout)),
            listen_mode: self.listen_mode.into(),
            backoff: BackoffConfig {
                initial_delay: Duration::from_millis(self.backoff.initial_ms),
                floor_delay: Duration::from_millis(self.backoff.floor_ms),
                max_delay: Duration::from_millis(self.backoff.max_ms),
                factor: self.backoff.factor,
            },
        })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "microsdeck", "microsdeck").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("microsdeck");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Defaults, then the TOML file at `path` (if any), then the environment.
///
/// Nested keys use a double underscore: `MICROSDECK_BACKOFF__MAX_MS`.
pub fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load the config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment_for(path).extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_translate_to_default_manager_config() {
        let manager = Config::default().to_manager_config().unwrap();
        let expected = ManagerConfig::default();

        assert_eq!(manager.url, expected.url);
        assert_eq!(manager.timeout, expected.timeout);
        assert_eq!(manager.listen_timeout, expected.listen_timeout);
        assert_eq!(manager.listen_mode, ListenMode::Stream);
        assert_eq!(manager.backoff, BackoffConfig::default());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.backoff, Backoff::default());
        assert_eq!(config.listen_mode, ListenModeSetting::Stream);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
url = "http://steamdeck.local:12412"
listen_timeout = 0
listen_mode = "poll"

[backoff]
max_ms = 5000
"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.url, "http://steamdeck.local:12412");
        assert_eq!(config.timeout, 10);
        assert_eq!(config.backoff.max_ms, 5000);
        assert_eq!(config.backoff.initial_ms, 500);

        let manager = config.to_manager_config().unwrap();
        assert_eq!(manager.listen_timeout, None);
        assert_eq!(manager.listen_mode, ListenMode::LongPoll);
        assert_eq!(manager.backoff.max_delay, Duration::from_secs(5));
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            url: "http://192.168.1.20:12412".into(),
            listen_mode: ListenModeSetting::Poll,
            ..Config::default()
        };

        save_config_to(&config, &path).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), config);
    }

    #[test]
    fn rejects_bad_url() {
        let config = Config {
            url: "not a url".into(),
            ..Config::default()
        };
        assert!(matches!(
            config.to_manager_config(),
            Err(ConfigError::Validation { ref field, .. }) if field == "url"
        ));

        let config = Config {
            url: "ftp://localhost".into(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_nonsensical_backoff() {
        let shrinking = Config {
            backoff: Backoff {
                factor: 0.5,
                ..Backoff::default()
            },
            ..Config::default()
        };
        assert!(shrinking.validate().is_err());

        let inverted = Config {
            backoff: Backoff {
                initial_ms: 120_000,
                ..Backoff::default()
            },
            ..Config::default()
        };
        assert!(inverted.validate().is_err());

        let zero = Config {
            backoff: Backoff {
                floor_ms: 0,
                ..Backoff::default()
            },
            ..Config::default()
        };
        assert!(zero.validate().is_err());
    }
}
