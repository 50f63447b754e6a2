//! Card command handlers.

use tabled::Tabled;

use microsdeck_core::{Card, CardAndGames, Game, Manager, Snapshot};

use crate::cli::{CardsArgs, CardsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct CardRow {
    #[tabled(rename = "#")]
    position: u32,
    #[tabled(rename = "UID")]
    uid: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Games")]
    games: usize,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Inserted")]
    inserted: String,
}

impl CardRow {
    fn new(cg: &CardAndGames, snapshot: &Snapshot) -> Self {
        Self {
            position: cg.card.position,
            uid: cg.card.uid.clone(),
            name: cg.card.name.clone(),
            games: cg.games.len(),
            size: util::format_size(cg.total_size()),
            inserted: if snapshot.is_current(&cg.card.uid) {
                "*".into()
            } else {
                String::new()
            },
        }
    }
}

#[derive(Tabled)]
struct GameRow {
    #[tabled(rename = "UID")]
    uid: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Steam")]
    steam: String,
}

impl From<&Game> for GameRow {
    fn from(g: &Game) -> Self {
        Self {
            uid: g.uid.clone(),
            name: g.name.clone(),
            size: util::format_size(g.size),
            steam: if g.is_steam { "yes" } else { "no" }.into(),
        }
    }
}

// ── Reordering ──────────────────────────────────────────────────────

/// Put `front` first, in the given order, followed by every other card in
/// its current display order, and renumber positions densely.
fn reordered(snapshot: &Snapshot, front: &[String]) -> Result<Vec<Card>, CliError> {
    let mut ordered = Vec::with_capacity(snapshot.cards_and_games.len());
    for uid in front {
        let card = util::find_card(snapshot, uid)?;
        if !ordered.iter().any(|c: &Card| c.uid == card.uid) {
            ordered.push(card);
        }
    }
    for cg in snapshot.sorted_cards() {
        if !front.contains(&cg.card.uid) {
            ordered.push(cg.card.clone());
        }
    }
    for (position, card) in (0_u32..).zip(ordered.iter_mut()) {
        card.position = position;
    }
    Ok(ordered)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(manager: &Manager, args: CardsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = util::load_snapshot(manager).await?;

    match args.command {
        CardsCommand::List => {
            let cards = snapshot.sorted_cards();
            let out = output::render_list(
                &global.output,
                &cards,
                |cg| CardRow::new(cg, &snapshot),
                |cg| cg.card.uid.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CardsCommand::Games { uid } => {
            let cg = snapshot.card(&uid).ok_or_else(|| CliError::NotFound {
                resource_type: "card".into(),
                identifier: uid.clone(),
                list_command: "cards list".into(),
            })?;
            let out = output::render_list(
                &global.output,
                &cg.games,
                |g| GameRow::from(g),
                |g| g.uid.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CardsCommand::Rename { uid, name } => {
            let mut card = util::find_card(&snapshot, &uid)?;
            card.name.clone_from(&name);
            manager.update_card(&card).await?;

            let applied = manager
                .snapshot()
                .card(&uid)
                .is_some_and(|cg| cg.card.name == name);
            if !applied {
                return Err(CliError::Rejected {
                    operation: format!("rename card {uid}"),
                });
            }
            output::print_status(&format!("Card {uid} renamed to '{name}'"), global.quiet);
            Ok(())
        }

        CardsCommand::Delete { uid } => {
            let card = util::find_card(&snapshot, &uid)?;
            let prompt = format!(
                "Forget card '{}' ({uid}) and its game links?",
                card.display_name()
            );
            if !util::confirm(&prompt, "cards delete", global.yes)? {
                return Ok(());
            }
            manager.delete_card(&card).await?;

            if manager.snapshot().card(&uid).is_some() {
                return Err(CliError::Rejected {
                    operation: format!("delete card {uid}"),
                });
            }
            output::print_status(&format!("Card {uid} deleted"), global.quiet);
            Ok(())
        }

        CardsCommand::Reorder { uids } => {
            let cards = reordered(&snapshot, &uids)?;
            manager.update_cards(&cards).await?;
            output::print_status(&format!("Reordered {} cards", cards.len()), global.quiet);
            Ok(())
        }

        CardsCommand::Link { card, games } => {
            util::find_card(&snapshot, &card)?;
            match games.as_slice() {
                [game] => manager.link_card_and_game(&card, game).await?,
                _ => manager.link_card_and_many_games(&card, &games).await?,
            }
            output::print_status(
                &format!("Linked {} game(s) to card {card}", games.len()),
                global.quiet,
            );
            Ok(())
        }

        CardsCommand::Unlink { card, games } => {
            util::find_card(&snapshot, &card)?;
            match games.as_slice() {
                [game] => manager.unlink_card_and_game(&card, game).await?,
                _ => manager.unlink_card_and_many_games(&card, &games).await?,
            }
            output::print_status(
                &format!("Unlinked {} game(s) from card {card}", games.len()),
                global.quiet,
            );
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn snapshot() -> Snapshot {
        let entry = |uid: &str, position| CardAndGames {
            card: Card {
                position,
                ..Card::new(uid, uid)
            },
            games: Vec::new(),
        };
        Snapshot {
            cards_and_games: vec![entry("a", 0), entry("b", 1), entry("c", 2), entry("d", 3)],
            ..Snapshot::default()
        }
    }

    #[test]
    fn reorder_moves_named_cards_to_front() {
        let cards = reordered(&snapshot(), &["c".into(), "a".into()]).unwrap();
        let order: Vec<_> = cards.iter().map(|c| (c.uid.as_str(), c.position)).collect();
        assert_eq!(order, vec![("c", 0), ("a", 1), ("b", 2), ("d", 3)]);
    }

    #[test]
    fn reorder_ignores_duplicates() {
        let cards = reordered(&snapshot(), &["b".into(), "b".into()]).unwrap();
        assert_eq!(cards.len(), 4);
        assert_eq!(cards[0].uid, "b");
    }

    #[test]
    fn reorder_rejects_unknown_card() {
        assert!(matches!(
            reordered(&snapshot(), &["zzz".into()]),
            Err(CliError::NotFound { .. })
        ));
    }
}
