//! Command dispatch: bridges CLI args -> manager calls -> output formatting.

pub mod cards;
pub mod config_cmd;
pub mod games;
pub mod settings;
pub mod status;
pub mod util;
pub mod watch;

use microsdeck_core::Manager;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a one-shot, backend-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, manager: &Manager, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(manager, global).await,
        Command::Cards(args) => cards::handle(manager, args, global).await,
        Command::Games(args) => games::handle(manager, args, global).await,
        Command::Settings(args) => settings::handle(manager, args, global).await,
        // Handled before dispatch
        Command::Watch | Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
