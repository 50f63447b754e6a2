//! Settings command handlers.

use microsdeck_core::{Manager, SettingName};

use crate::cli::{GlobalOpts, SettingsArgs, SettingsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

fn plain_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn pretty_value(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

pub async fn handle(
    manager: &Manager,
    args: SettingsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        SettingsCommand::Get { name } => {
            let setting = util::parse_setting(&name)?;
            util::load_snapshot(manager).await?;

            let value = if setting == SettingName::Frontend {
                serde_json::to_value(manager.frontend_settings().await?)?
            } else {
                manager
                    .client()
                    .get_setting(setting)
                    .await
                    .ok_or_else(|| CliError::NotFound {
                        resource_type: "setting".into(),
                        identifier: name.clone(),
                        list_command: "settings get '*'".into(),
                    })?
            };

            let out = output::render_single(&global.output, &value, pretty_value, plain_value);
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SettingsCommand::Set { name, value } => {
            let setting = util::parse_setting(&name)?;
            let value: serde_json::Value = serde_json::from_str(&value)?;
            util::load_snapshot(manager).await?;

            let accepted = match (setting, &value) {
                (SettingName::FrontendDismissedDocs, serde_json::Value::Bool(dismissed)) => {
                    manager.set_dismissed_docs(*dismissed).await?
                }
                _ => manager.client().set_setting(setting, &value).await,
            };
            if !accepted {
                return Err(CliError::Rejected {
                    operation: format!("set {name}"),
                });
            }
            output::print_status(&format!("Setting {name} updated"), global.quiet);
            Ok(())
        }
    }
}
