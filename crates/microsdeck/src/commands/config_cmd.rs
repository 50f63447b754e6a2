//! Config subcommand handlers.

use std::io::IsTerminal;

use dialoguer::{Input, Select};

use microsdeck_config::{Config, ListenModeSetting};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Ask for the backend URL and listen mode, starting from `cfg`.
fn prompt_config(mut cfg: Config) -> Result<Config, CliError> {
    cfg.url = Input::new()
        .with_prompt("MicroSDeck backend URL")
        .default(cfg.url)
        .interact_text()
        .map_err(prompt_err)?;

    let modes = ["poll (long poll /listen)", "stream (server-sent events)"];
    let current = usize::from(cfg.listen_mode == ListenModeSetting::Stream);
    let choice = Select::new()
        .with_prompt("How should `watch` wait for changes?")
        .items(&modes)
        .default(current)
        .interact()
        .map_err(prompt_err)?;
    cfg.listen_mode = if choice == 1 {
        ListenModeSetting::Stream
    } else {
        ListenModeSetting::Poll
    };

    Ok(cfg)
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => {
            let base = config::apply_overrides(config::load_config()?, global);
            let cfg = if std::io::stdin().is_terminal() && !global.yes {
                prompt_config(base)?
            } else {
                base
            };
            cfg.validate()?;

            let path = config::save_config(&cfg)?;
            output::print_status(
                &format!("Config written to {}", path.display()),
                global.quiet,
            );
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::apply_overrides(config::load_config()?, global);
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => toml::to_string_pretty(&cfg)?,
                _ => output::render_single(&global.output, &cfg, |_| String::new(), |_| String::new()),
            };
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }
    }
}
