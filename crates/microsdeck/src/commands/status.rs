//! Status command handler.

use std::fmt::Write;

use serde::Serialize;

use microsdeck_core::{Manager, Snapshot};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
struct StatusView {
    url: String,
    enabled: bool,
    version: Option<String>,
    current_card: Option<String>,
    current_games: usize,
    cards: usize,
}

impl StatusView {
    fn new(url: String, snapshot: &Snapshot) -> Self {
        let current = snapshot.current_card_and_games.as_ref();
        Self {
            url,
            enabled: snapshot.enabled,
            version: snapshot.backend_version.clone(),
            current_card: current.map(|cg| cg.card.uid.clone()),
            current_games: current.map_or(0, |cg| cg.games.len()),
            cards: snapshot.cards_and_games.len(),
        }
    }
}

fn detail(snapshot: &Snapshot, view: &StatusView, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Backend:   {}", view.url);
    let _ = writeln!(out, "Healthy:   {}", output::yes_no(view.enabled, color));
    let _ = writeln!(
        out,
        "Version:   {}",
        view.version.as_deref().unwrap_or("unknown")
    );
    match &snapshot.current_card_and_games {
        Some(cg) => {
            let _ = writeln!(
                out,
                "Inserted:  {} {}, {} games, {}",
                cg.card.display_name(),
                output::muted(&format!("({})", cg.card.uid), color),
                cg.games.len(),
                util::format_size(cg.total_size()),
            );
        }
        None => {
            let _ = writeln!(out, "Inserted:  {}", output::muted("none", color));
        }
    }
    let _ = write!(out, "Cards:     {}", view.cards);
    out
}

pub async fn handle(manager: &Manager, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = util::load_snapshot(manager).await?;
    let view = StatusView::new(manager.config().url.to_string(), &snapshot);
    let color = output::should_color(&global.color);

    let out = output::render_single(
        &global.output,
        &view,
        |v| detail(&snapshot, v, color),
        |v| v.current_card.clone().unwrap_or_default(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
