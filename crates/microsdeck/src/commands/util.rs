//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::str::FromStr;
use std::sync::Arc;

use microsdeck_core::{Card, Manager, SettingName, Snapshot};

use crate::error::CliError;

/// Refresh the manager once and fail if the backend is not healthy.
pub async fn load_snapshot(manager: &Manager) -> Result<Arc<Snapshot>, CliError> {
    manager.fetch().await;
    let snapshot = manager.snapshot();
    if !snapshot.enabled {
        return Err(CliError::ConnectionFailed {
            url: manager.config().url.to_string(),
            source: "health check failed".into(),
        });
    }
    Ok(snapshot)
}

/// Look a card up by uid in a snapshot.
pub fn find_card(snapshot: &Snapshot, uid: &str) -> Result<Card, CliError> {
    snapshot
        .card(uid)
        .map(|cg| cg.card.clone())
        .ok_or_else(|| CliError::NotFound {
            resource_type: "card".into(),
            identifier: uid.into(),
            list_command: "cards list".into(),
        })
}

pub fn parse_setting(name: &str) -> Result<SettingName, CliError> {
    SettingName::from_str(name).map_err(|_| CliError::Validation {
        field: "setting".into(),
        reason: format!("unknown setting '{name}'"),
    })
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    bytesize::ByteSize::b(bytes).to_string()
}
