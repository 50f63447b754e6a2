//! `watch`: run the background manager and print every change until Ctrl-C.

use std::sync::Arc;

use chrono::Local;
use tracing::info;

use microsdeck_core::{
    ContextBridge, LifecycleEvent, Manager, ManagerConfig, ManagerEvent, Received, ServerEvent,
    Snapshot,
};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

fn snapshot_line(snapshot: &Snapshot, format: &OutputFormat, color: bool) -> String {
    match format {
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_json_line(snapshot),
        OutputFormat::Yaml => format!(
            "---\n{}",
            output::render_single(format, snapshot, |_| String::new(), |_| String::new())
        ),
        OutputFormat::Table | OutputFormat::Plain => {
            let current = snapshot
                .current_card_and_games
                .as_ref()
                .map_or("none", |cg| cg.card.display_name());
            format!(
                "{} healthy={} version={} inserted={} cards={}",
                output::muted(&Local::now().format("%H:%M:%S").to_string(), color),
                output::yes_no(snapshot.enabled, color),
                snapshot.backend_version.as_deref().unwrap_or("unknown"),
                current,
                snapshot.cards_and_games.len(),
            )
        }
    }
}

fn event_line(event: &ServerEvent, color: bool) -> String {
    let mut line = format!(
        "{} event={}",
        output::muted(&Local::now().format("%H:%M:%S").to_string(), color),
        event.event
    );
    if let Some(data) = &event.data {
        line.push_str(&format!(" data={data}"));
    }
    line
}

pub async fn handle(config: ManagerConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let structured = matches!(
        global.output,
        OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml
    );

    let manager = Manager::start(config).await?;
    let bridge = ContextBridge::mount(&manager);
    let mut state = bridge.state();
    let mut updates = manager.updates();
    let mut lifecycle = manager.lifecycle();

    output::print_status(
        &format!("Watching {} (Ctrl-C to stop)", manager.config().url),
        global.quiet,
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        tokio::select! {
            biased;
            signal = &mut ctrl_c => break signal.map_err(CliError::from),
            changed = state.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let snapshot: Arc<Snapshot> = Arc::clone(&state.borrow_and_update());
                output::print_output(&snapshot_line(&snapshot, &global.output, color), global.quiet);
            }
            received = updates.recv() => match received {
                Some(Received::Event(ManagerEvent::Backend(event))) if !structured => {
                    output::print_output(&event_line(&event, color), global.quiet);
                }
                Some(_) => {}
                None => break Ok(()),
            },
            marker = lifecycle.recv() => {
                if let Some(Received::Event(marker)) = marker {
                    log_marker(marker);
                }
            }
        }
    };

    bridge.unmount().await;
    manager.shutdown().await;
    output::print_status("Stopped", global.quiet);
    result
}

fn log_marker(marker: LifecycleEvent) {
    info!(%marker, "event stream");
}
