// ── Manager ──
//
// Owns the connection to one MicroSDeck backend: keeps the public snapshot
// fresh, runs the change-listening loop with backoff, and republishes
// everything on the event buses.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::Utc;
use microsdeck_api::{
    Card, CardAndGames, FrontendSettings, Game, LifecycleEvent, MicroSDeckClient, PollResult,
    ServerEvent, SettingName, StreamSignal,
};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backoff::{Backoff, PollAction};
use crate::bus::{EventBus, ManagerEvent, Subscription};
use crate::config::{ListenMode, ManagerConfig};
use crate::error::CoreError;
use crate::snapshot::Snapshot;

const UPDATE_CHANNEL_SIZE: usize = 64;
const LIFECYCLE_CHANNEL_SIZE: usize = 64;
/// Backend events waiting for a refresh while a stream is read.
const PENDING_EVENTS: usize = 16;

// ── ManagerState ─────────────────────────────────────────────────

/// Activity of the background loop, observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerState {
    Idle,
    Fetching,
    Polling,
    Backoff { delay: Duration },
    /// Terminal. Entered on shutdown.
    Aborted,
}

// ── Manager ──────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ManagerInner>`; every clone drives the same
/// snapshot, buses and background tasks.
#[derive(Clone)]
pub struct Manager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    config: ManagerConfig,
    client: MicroSDeckClient,
    snapshot: ArcSwap<Snapshot>,
    updates: EventBus<ManagerEvent>,
    lifecycle: EventBus<LifecycleEvent>,
    state: watch::Sender<ManagerState>,
    cancel: CancellationToken,
    polling: AtomicBool,
    shut_down: AtomicBool,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Manager {
    /// Build a manager without starting anything. Call
    /// [`start`](Self::start) for the usual background behaviour.
    pub fn new(config: ManagerConfig) -> Result<Self, CoreError> {
        let client = MicroSDeckClient::new(config.url.clone(), &config.transport())?;
        let (state, _) = watch::channel(ManagerState::Idle);

        Ok(Self {
            inner: Arc::new(ManagerInner {
                config,
                client,
                snapshot: ArcSwap::from_pointee(Snapshot::default()),
                updates: EventBus::new(UPDATE_CHANNEL_SIZE),
                lifecycle: EventBus::new(LIFECYCLE_CHANNEL_SIZE),
                state,
                cancel: CancellationToken::new(),
                polling: AtomicBool::new(false),
                shut_down: AtomicBool::new(false),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Build a manager and spawn its background task: an initial fetch
    /// followed by the poll loop. Returns without waiting for either.
    pub async fn start(config: ManagerConfig) -> Result<Self, CoreError> {
        let manager = Self::new(config)?;
        info!(url = %manager.inner.config.url, "starting MicroSDeck manager");

        let background = manager.clone();
        manager
            .inner
            .task_handles
            .lock()
            .await
            .push(tokio::spawn(background_task(background)));

        Ok(manager)
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &MicroSDeckClient {
        &self.inner.client
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Stop all background work. Safe to call any number of times; only the
    /// first call has an effect.
    ///
    /// Must not be awaited from inside a task the manager spawned.
    pub async fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::AcqRel) {
            debug!("shutdown already requested");
            return;
        }
        info!("shutting down MicroSDeck manager");

        self.inner.cancel.cancel();
        self.inner.state.send_replace(ManagerState::Aborted);

        let handles: Vec<_> = self.inner.task_handles.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
        debug!("manager shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::Acquire)
    }

    fn ensure_running(&self, operation: &str) -> Result<(), CoreError> {
        if self.is_shut_down() {
            warn!(operation, "ignoring request after shutdown");
            return Err(CoreError::ShutDown);
        }
        Ok(())
    }

    fn set_state(&self, next: ManagerState) {
        self.inner.state.send_if_modified(|state| {
            if *state == next || *state == ManagerState::Aborted {
                return false;
            }
            *state = next;
            true
        });
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Pull health, version, current card and the card list, then publish
    /// one `Update`.
    ///
    /// When the health check fails only `enabled` changes; the card data
    /// from the last good fetch stays in place.
    pub async fn fetch(&self) {
        if self.is_shut_down() {
            debug!("skipping fetch after shutdown");
            return;
        }
        let client = &self.inner.client;

        if client.health().await {
            let backend_version = client.version().await;
            let current_card_and_games = client.current_card_and_games().await;
            let cards_and_games = client.cards_and_games().await;

            debug!(
                version = backend_version.as_deref().unwrap_or("unknown"),
                current = current_card_and_games.as_ref().map(|cg| cg.card.uid.as_str()),
                cards = cards_and_games.len(),
                "fetched backend state"
            );

            self.inner.snapshot.store(Arc::new(Snapshot {
                enabled: true,
                backend_version,
                current_card_and_games,
                cards_and_games,
                refreshed_at: Some(Utc::now()),
            }));
        } else {
            warn!("backend health check failed, keeping previous card data");
            let mut next = Snapshot::clone(&self.inner.snapshot.load());
            next.enabled = false;
            self.inner.snapshot.store(Arc::new(next));
        }

        self.inner.updates.dispatch(ManagerEvent::Update);
    }

    // ── Poll loop ────────────────────────────────────────────────

    /// Listen for backend changes until shutdown, fetching on every change
    /// and backing off while the backend is unreachable.
    ///
    /// Only one loop may run per manager. A concurrent second call returns
    /// [`CoreError::AlreadyPolling`] without touching the network.
    pub async fn run_poll_loop(&self) -> Result<(), CoreError> {
        if self.inner.polling.swap(true, Ordering::AcqRel) {
            error!("poll loop is already running for this manager");
            return Err(CoreError::AlreadyPolling);
        }
        let _guard = PollingGuard(&self.inner.polling);

        let cancel = &self.inner.cancel;
        let mut backoff = Backoff::new(self.inner.config.backoff.clone());
        debug!(mode = ?self.inner.config.listen_mode, "poll loop started");

        while !cancel.is_cancelled() {
            self.set_state(ManagerState::Polling);
            let Some(result) = self.listen_once().await else {
                break;
            };
            debug!(?result, "listen finished");

            match backoff.on_result(result) {
                PollAction::Refresh => {
                    self.set_state(ManagerState::Fetching);
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        () = self.fetch() => {}
                    }
                }
                PollAction::Retry => {}
                PollAction::Sleep(delay) => {
                    warn!(
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "backend unreachable, backing off"
                    );
                    self.set_state(ManagerState::Backoff { delay });
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        debug!("poll loop stopped");
        Ok(())
    }

    /// One listen attempt. `None` when shutdown interrupted it.
    async fn listen_once(&self) -> Option<PollResult> {
        let cancel = &self.inner.cancel;
        match self.inner.config.listen_mode {
            ListenMode::LongPoll => tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                result = self.inner.client.poll_event() => Some(result),
            },
            ListenMode::Stream => {
                let result = self.listen_streaming().await;
                (!cancel.is_cancelled()).then_some(result)
            }
        }
    }

    /// Read one event stream to its end, fetching on every event.
    ///
    /// Lifecycle markers are published as soon as they are read. Events
    /// queue for a refresh that runs while the stream is still being read,
    /// so a slow fetch never stalls the decoder. When the queue is full an
    /// event is dropped: the refreshes already queued will observe its
    /// effect.
    async fn listen_streaming(&self) -> PollResult {
        let (tx, mut rx) = mpsc::channel(PENDING_EVENTS);
        let lifecycle = &self.inner.lifecycle;
        let on_signal = move |signal: StreamSignal| match signal {
            StreamSignal::Lifecycle(marker) => {
                lifecycle.dispatch(marker);
            }
            StreamSignal::Event(event) => {
                if let Err(TrySendError::Full(event)) = tx.try_send(event) {
                    debug!(event = %event.event, "refresh already pending, coalescing event");
                }
            }
        };
        let listen = self.inner.client.listen_stream(&self.inner.cancel, on_signal);
        let drain = async {
            while let Some(event) = rx.recv().await {
                self.handle_backend_event(event).await;
            }
        };

        let (result, ()) = tokio::join!(listen, drain);
        match result {
            Ok(()) => PollResult::TimedOut,
            Err(e) if e.is_unreachable() => {
                warn!(error = %e, "event stream failed");
                PollResult::Unreachable
            }
            Err(e) => {
                debug!(error = %e, "event stream ended without events");
                PollResult::TimedOut
            }
        }
    }

    async fn handle_backend_event(&self, event: ServerEvent) {
        debug!(event = %event.event, "backend event");
        tokio::select! {
            biased;
            () = self.inner.cancel.cancelled() => {}
            () = self.fetch() => {
                self.inner.updates.dispatch(ManagerEvent::Backend(event));
            }
        }
    }

    // ── Mutations ────────────────────────────────────────────────
    //
    // Each one awaits the backend call and then refreshes, whether or not
    // the call was accepted, so the snapshot reflects what the backend
    // actually holds.

    pub async fn update_card(&self, card: &Card) -> Result<(), CoreError> {
        self.ensure_running("update card")?;
        debug!(uid = %card.uid, "updating card");
        self.inner.client.update_card(card).await;
        self.fetch().await;
        Ok(())
    }

    pub async fn update_cards(&self, cards: &[Card]) -> Result<(), CoreError> {
        self.ensure_running("update cards")?;
        debug!(count = cards.len(), "updating cards");
        self.inner.client.update_cards(cards).await;
        self.fetch().await;
        Ok(())
    }

    pub async fn delete_card(&self, card: &Card) -> Result<(), CoreError> {
        self.ensure_running("delete card")?;
        debug!(uid = %card.uid, "deleting card");
        self.inner.client.delete_card(card).await;
        self.fetch().await;
        Ok(())
    }

    pub async fn create_game(&self, game: &Game) -> Result<(), CoreError> {
        self.ensure_running("create game")?;
        debug!(uid = %game.uid, "creating game");
        self.inner.client.create_game(game).await;
        self.fetch().await;
        Ok(())
    }

    pub async fn link_card_and_game(&self, card_id: &str, game_id: &str) -> Result<(), CoreError> {
        self.ensure_running("link card and game")?;
        debug!(card_id, game_id, "linking game to card");
        self.inner.client.link_card_and_game(card_id, game_id).await;
        self.fetch().await;
        Ok(())
    }

    pub async fn link_card_and_many_games(
        &self,
        card_id: &str,
        game_ids: &[String],
    ) -> Result<(), CoreError> {
        self.ensure_running("link card and games")?;
        debug!(card_id, games = game_ids.len(), "linking games to card");
        self.inner
            .client
            .link_card_and_many_games(card_id, game_ids)
            .await;
        self.fetch().await;
        Ok(())
    }

    pub async fn unlink_card_and_game(
        &self,
        card_id: &str,
        game_id: &str,
    ) -> Result<(), CoreError> {
        self.ensure_running("unlink card and game")?;
        debug!(card_id, game_id, "unlinking game from card");
        self.inner.client.unlink_card_and_game(card_id, game_id).await;
        self.fetch().await;
        Ok(())
    }

    pub async fn unlink_card_and_many_games(
        &self,
        card_id: &str,
        game_ids: &[String],
    ) -> Result<(), CoreError> {
        self.ensure_running("unlink card and games")?;
        debug!(card_id, games = game_ids.len(), "unlinking games from card");
        self.inner
            .client
            .unlink_card_and_many_games(card_id, game_ids)
            .await;
        self.fetch().await;
        Ok(())
    }

    /// Mark a card hidden in memory only.
    ///
    /// Nothing is sent to the backend and no refresh happens, so the next
    /// fetch brings back the persisted value.
    pub fn hide_card(&self, card: &mut Card) {
        card.hidden = true;
        info!(uid = %card.uid, "card hidden locally; hiding is not persisted");
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Cards holding `game_id`, straight from the backend.
    pub async fn cards_for_game(&self, game_id: &str) -> Result<Option<Vec<Card>>, CoreError> {
        self.ensure_running("cards for game")?;
        Ok(self.inner.client.cards_for_game(game_id).await)
    }

    /// Stored UI preferences, or defaults when unset or unreadable.
    pub async fn frontend_settings(&self) -> Result<FrontendSettings, CoreError> {
        self.ensure_running("read frontend settings")?;
        let value = self.inner.client.get_setting(SettingName::Frontend).await;
        Ok(value
            .and_then(|v| {
                serde_json::from_value(v)
                    .inspect_err(|e| warn!(error = %e, "unreadable frontend settings"))
                    .ok()
            })
            .unwrap_or_default())
    }

    /// Persist the "docs dismissed" preference. Returns whether the backend
    /// accepted it.
    pub async fn set_dismissed_docs(&self, dismissed: bool) -> Result<bool, CoreError> {
        self.ensure_running("set dismissed docs")?;
        Ok(self
            .inner
            .client
            .set_setting(SettingName::FrontendDismissedDocs, &dismissed)
            .await)
    }

    // ── State observation ────────────────────────────────────────

    /// The current public snapshot. Cheap; clones an `Arc`.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.snapshot.load_full()
    }

    pub fn enabled(&self) -> bool {
        self.inner.snapshot.load().enabled
    }

    pub fn version(&self) -> Option<String> {
        self.inner.snapshot.load().backend_version.clone()
    }

    pub fn current_card_and_games(&self) -> Option<CardAndGames> {
        self.inner.snapshot.load().current_card_and_games.clone()
    }

    pub fn cards_and_games(&self) -> Vec<CardAndGames> {
        self.inner.snapshot.load().cards_and_games.clone()
    }

    /// Subscribe to background loop state changes.
    pub fn state(&self) -> watch::Receiver<ManagerState> {
        self.inner.state.subscribe()
    }

    /// Listen for domain notifications.
    pub fn updates(&self) -> Subscription<ManagerEvent> {
        self.inner.updates.subscribe()
    }

    /// Listen for event stream lifecycle markers.
    pub fn lifecycle(&self) -> Subscription<LifecycleEvent> {
        self.inner.lifecycle.subscribe()
    }

    /// The update bus itself, for dispatching custom events or counting
    /// listeners.
    pub fn update_bus(&self) -> &EventBus<ManagerEvent> {
        &self.inner.updates
    }
}

// ── Background task ──────────────────────────────────────────────

/// Clears the re-entrancy flag when the poll loop exits by any path.
struct PollingGuard<'a>(&'a AtomicBool);

impl Drop for PollingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

async fn background_task(manager: Manager) {
    manager.set_state(ManagerState::Fetching);
    tokio::select! {
        biased;
        () = manager.inner.cancel.cancelled() => return,
        () = manager.fetch() => {}
    }

    if let Err(e) = manager.run_poll_loop().await {
        warn!(error = %e, "background poll loop did not start");
    }
}
