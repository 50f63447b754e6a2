//! CLI-aware configuration: the shared config file plus `GlobalOpts`
//! overrides, translated to `microsdeck_core::ManagerConfig`.

use microsdeck_config::Config;
use microsdeck_core::ManagerConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use microsdeck_config::{config_path, load_config, save_config};

/// Apply command-line overrides on top of a loaded config.
pub fn apply_overrides(mut cfg: Config, global: &GlobalOpts) -> Config {
    if let Some(ref url) = global.url {
        cfg.url.clone_from(url);
    }
    if let Some(timeout) = global.timeout {
        cfg.timeout = timeout;
    }
    cfg
}

/// Load the config file, apply flag overrides, validate and translate.
pub fn build_manager_config(global: &GlobalOpts) -> Result<ManagerConfig, CliError> {
    let cfg = apply_overrides(load_config()?, global);
    Ok(cfg.to_manager_config()?)
}
