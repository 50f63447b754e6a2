//! Game command handlers.

use tabled::Tabled;

use microsdeck_core::{Card, Game, Manager};

use crate::cli::{GamesArgs, GamesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct HoldingCardRow {
    #[tabled(rename = "UID")]
    uid: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Games")]
    games: usize,
}

impl From<&Card> for HoldingCardRow {
    fn from(c: &Card) -> Self {
        Self {
            uid: c.uid.clone(),
            name: c.name.clone(),
            games: c.games.len(),
        }
    }
}

pub async fn handle(manager: &Manager, args: GamesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    util::load_snapshot(manager).await?;

    match args.command {
        GamesCommand::Cards { game_id } => {
            let cards = manager
                .cards_for_game(&game_id)
                .await?
                .ok_or_else(|| CliError::NotFound {
                    resource_type: "game".into(),
                    identifier: game_id.clone(),
                    list_command: "cards games <card>".into(),
                })?;
            let out = output::render_list(
                &global.output,
                &cards,
                |c| HoldingCardRow::from(c),
                |c| c.uid.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        GamesCommand::Create {
            uid,
            name,
            size,
            non_steam,
        } => {
            let game = Game {
                uid,
                name,
                size,
                is_steam: !non_steam,
            };
            manager.create_game(&game).await?;
            output::print_status(&format!("Game {} registered", game.uid), global.quiet);
            Ok(())
        }
    }
}
