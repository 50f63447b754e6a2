// MicroSDeck backend HTTP client
//
// Wraps `reqwest::Client` with endpoint construction and uniform failure
// handling. Every public call except `listen_stream` catches errors at this
// boundary and degrades to a sentinel (`false`, `None`, an empty list) after
// logging, so a transient network blip never reaches the state manager as a
// hard failure.

use futures_util::StreamExt;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::models::{Card, CardAndGames, Game, LinkMany, LinkOne, ServerEvent, SettingName};
use crate::sse::{EventDecoder, LifecycleEvent};
use crate::transport::TransportConfig;

// ── Poll / stream results ────────────────────────────────────────────

/// Outcome of a single `/listen` long poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollResult {
    /// The backend reported a change.
    Changed,
    /// The backend is alive but nothing changed before the poll expired.
    TimedOut,
    /// The backend could not be reached.
    Unreachable,
}

/// What `listen_stream` hands to its callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSignal {
    Lifecycle(LifecycleEvent),
    Event(ServerEvent),
}

// ── Client ───────────────────────────────────────────────────────────

/// HTTP client for the MicroSDeck backend.
#[derive(Debug, Clone)]
pub struct MicroSDeckClient {
    http: reqwest::Client,
    base_url: Url,
    transport: TransportConfig,
}

impl MicroSDeckClient {
    /// Create a client for the backend at `base_url`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            transport: transport.clone(),
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, transport: TransportConfig) -> Self {
        Self {
            http,
            base_url,
            transport,
        }
    }

    /// Parse `base_url` and build a client with default transport settings.
    pub fn from_url(base_url: &str) -> Result<Self, Error> {
        Self::new(Url::parse(base_url)?, &TransportConfig::default())
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Append path segments to the base URL. Segments are percent-encoded,
    /// so uids containing `/` stay a single segment.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a request and reject non-success statuses.
    async fn send(&self, request: reqwest::RequestBuilder, url: &Url) -> Result<reqwest::Response, Error> {
        let resp = request
            .timeout(self.transport.timeout)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp)
    }

    /// GET a text body. `204 No Content` yields `None`.
    async fn get_text(&self, segments: &[&str]) -> Result<Option<String>, Error> {
        let url = self.endpoint(segments)?;
        debug!("GET {}", url);

        let resp = self.send(self.http.get(url.clone()), &url).await?;
        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        Ok(Some(resp.text().await.map_err(Error::Transport)?))
    }

    /// GET and deserialize a JSON body. An empty or `204` body yields `None`.
    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<Option<T>, Error> {
        let Some(body) = self.get_text(segments).await? else {
            return Ok(None);
        };
        if body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body,
            })
    }

    /// POST a JSON body, ignoring whatever comes back.
    async fn post_json(&self, segments: &[&str], body: &impl Serialize) -> Result<(), Error> {
        let url = self.endpoint(segments)?;
        debug!("POST {}", url);

        self.send(self.http.post(url.clone()).json(body), &url).await?;
        Ok(())
    }

    async fn delete(&self, segments: &[&str]) -> Result<(), Error> {
        let url = self.endpoint(segments)?;
        debug!("DELETE {}", url);

        self.send(self.http.delete(url.clone()), &url).await?;
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// `true` iff `GET /health` answers with a success status.
    pub async fn health(&self) -> bool {
        degrade("health", self.get_text(&["health"]).await).is_some()
    }

    /// Backend version string.
    ///
    /// Read from the `GET /health` body; backends that answer health with an
    /// empty body are asked `GET /version` instead.
    pub async fn version(&self) -> Option<String> {
        let from_health = degrade("version", self.get_text(&["health"]).await)
            .flatten()
            .as_deref()
            .and_then(non_blank);
        match from_health {
            Some(version) => Some(version),
            None => degrade("version", self.get_text(&["version"]).await)
                .flatten()
                .as_deref()
                .and_then(non_blank),
        }
    }

    /// The inserted card and its games, if a known card is inserted.
    pub async fn current_card_and_games(&self) -> Option<CardAndGames> {
        degrade("current card", self.get_json(&["current"]).await).flatten()
    }

    /// Every card with its games. Empty rather than absent on failure.
    pub async fn cards_and_games(&self) -> Vec<CardAndGames> {
        degrade("list cards", self.get_json(&["list"]).await)
            .flatten()
            .unwrap_or_default()
    }

    /// Cards that contain the given game.
    pub async fn cards_for_game(&self, game_id: &str) -> Option<Vec<Card>> {
        degrade(
            "cards for game",
            self.get_json(&["list", "cards", game_id]).await,
        )
        .flatten()
    }

    /// Read a setting. A body that parses as JSON is returned parsed,
    /// anything else as a JSON string.
    pub async fn get_setting(&self, name: SettingName) -> Option<serde_json::Value> {
        let text = degrade("get setting", self.get_text(&["setting", name.as_ref()]).await)
            .flatten()?;
        Some(
            serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)),
        )
    }

    // ── Mutations ────────────────────────────────────────────────────
    //
    // Best effort: the return value only says whether the backend accepted
    // the request. Callers refresh afterwards to learn the new state.

    pub async fn set_setting(&self, name: SettingName, value: &impl Serialize) -> bool {
        accepted("set setting", self.post_json(&["setting", name.as_ref()], value).await)
    }

    /// Upsert a card (`POST /card/{uid}`).
    pub async fn update_card(&self, card: &Card) -> bool {
        accepted("update card", self.post_json(&["card", &card.uid], card).await)
    }

    pub async fn delete_card(&self, card: &Card) -> bool {
        accepted("delete card", self.delete(&["card", &card.uid]).await)
    }

    /// Bulk update, used for reordering positions.
    pub async fn update_cards(&self, cards: &[Card]) -> bool {
        accepted("update cards", self.post_json(&["cards"], &cards).await)
    }

    pub async fn create_game(&self, game: &Game) -> bool {
        accepted("create game", self.post_json(&["game", &game.uid], game).await)
    }

    pub async fn link_card_and_game(&self, card_id: &str, game_id: &str) -> bool {
        let body = LinkOne { card_id, game_id };
        accepted("link", self.post_json(&["link"], &body).await)
    }

    pub async fn link_card_and_many_games(&self, card_id: &str, game_ids: &[String]) -> bool {
        let body = LinkMany { card_id, game_ids };
        accepted("link many", self.post_json(&["linkmany"], &body).await)
    }

    pub async fn unlink_card_and_game(&self, card_id: &str, game_id: &str) -> bool {
        let body = LinkOne { card_id, game_id };
        accepted("unlink", self.post_json(&["unlink"], &body).await)
    }

    pub async fn unlink_card_and_many_games(&self, card_id: &str, game_ids: &[String]) -> bool {
        let body = LinkMany { card_id, game_ids };
        accepted("unlink many", self.post_json(&["unlinkmany"], &body).await)
    }

    // ── Change notification ──────────────────────────────────────────

    /// Issue one long poll against `/listen`.
    ///
    /// A non-success status or a client-side timeout is the normal idle
    /// case and maps to [`PollResult::TimedOut`]; anything else that stops
    /// the request is [`PollResult::Unreachable`].
    ///
    /// A backend that answers with `text/event-stream` sends its headers
    /// before anything has changed, so for those responses the body is read
    /// until the first complete event block (`Changed`) or its end
    /// (`TimedOut`).
    pub async fn poll_event(&self) -> PollResult {
        let url = match self.endpoint(&["listen"]) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "cannot build listen URL");
                return PollResult::Unreachable;
            }
        };
        debug!("GET {} (poll)", url);

        let mut request = self.http.get(url);
        if let Some(timeout) = self.transport.listen_timeout {
            request = request.timeout(timeout);
        }

        match request.send().await {
            Ok(resp) if resp.status().is_success() && is_event_stream(&resp) => {
                first_event(resp).await
            }
            Ok(resp) if resp.status().is_success() => PollResult::Changed,
            Ok(resp) => {
                debug!(status = resp.status().as_u16(), "poll timed out");
                PollResult::TimedOut
            }
            Err(e) if e.is_timeout() => {
                debug!("poll timed out on the client side");
                PollResult::TimedOut
            }
            Err(e) => {
                warn!(error = %e, "lost contact with backend");
                PollResult::Unreachable
            }
        }
    }

    /// Open `/listen` as an event stream and report what happens on it.
    ///
    /// `on_signal` receives `Start` once the headers arrive, then each
    /// decoded event followed by `Change`, then `Close` when the body ends.
    /// Transport and decode failures emit `Abort` and are returned.
    /// Cancellation emits `Abort` (if the stream had started) and returns
    /// `Ok(())`.
    pub async fn listen_stream<F>(&self, cancel: &CancellationToken, mut on_signal: F) -> Result<(), Error>
    where
        F: FnMut(StreamSignal),
    {
        let url = self.endpoint(&["listen"])?;
        debug!("GET {} (stream)", url);

        let mut request = self.http.get(url.clone()).header(ACCEPT, "text/event-stream");
        if let Some(timeout) = self.transport.listen_timeout {
            request = request.timeout(timeout);
        }

        let resp = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            resp = request.send() => resp.map_err(Error::Transport)?,
        };

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        on_signal(StreamSignal::Lifecycle(LifecycleEvent::Start));

        let mut decoder = EventDecoder::new();
        let mut body = resp.bytes_stream();

        loop {
            let chunk = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    on_signal(StreamSignal::Lifecycle(LifecycleEvent::Abort));
                    return Ok(());
                }
                chunk = body.next() => chunk,
            };

            match chunk {
                None => {
                    on_signal(StreamSignal::Lifecycle(LifecycleEvent::Close));
                    return Ok(());
                }
                Some(Err(e)) => {
                    on_signal(StreamSignal::Lifecycle(LifecycleEvent::Abort));
                    return Err(Error::Transport(e));
                }
                Some(Ok(bytes)) => match decoder.push(&bytes) {
                    Ok(events) => {
                        for event in events {
                            on_signal(StreamSignal::Event(event));
                            on_signal(StreamSignal::Lifecycle(LifecycleEvent::Change));
                        }
                    }
                    Err(e) => {
                        on_signal(StreamSignal::Lifecycle(LifecycleEvent::Abort));
                        return Err(e.into());
                    }
                },
            }
        }
    }
}

fn is_event_stream(resp: &reqwest::Response) -> bool {
    resp.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/event-stream"))
}

/// Read an event-stream body until it yields one event or ends.
async fn first_event(resp: reqwest::Response) -> PollResult {
    let mut decoder = EventDecoder::new();
    let mut body = resp.bytes_stream();

    while let Some(chunk) = body.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) if e.is_timeout() => {
                debug!("poll stream timed out on the client side");
                return PollResult::TimedOut;
            }
            Err(e) => {
                warn!(error = %e, "lost contact with backend");
                return PollResult::Unreachable;
            }
        };
        match decoder.push(&bytes) {
            Ok(events) if events.is_empty() => {}
            Ok(events) => {
                debug!(count = events.len(), "poll stream delivered events");
                return PollResult::Changed;
            }
            Err(e) => {
                warn!(error = %e, "undecodable poll stream");
                return PollResult::Unreachable;
            }
        }
    }

    debug!("poll stream closed without events");
    PollResult::TimedOut
}

// ── Failure normalization ────────────────────────────────────────────

/// Log a failed call and turn it into `None`.
///
/// A non-success status is routine (no card inserted, unknown uid) and is
/// logged at debug; anything else is a warning.
fn degrade<T>(operation: &'static str, result: Result<T, Error>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e @ Error::Status { .. }) => {
            debug!(operation, error = %e, "backend returned a non-success status");
            None
        }
        Err(e) => {
            warn!(operation, error = %e, "backend call failed");
            None
        }
    }
}

fn accepted(operation: &'static str, result: Result<(), Error>) -> bool {
    degrade(operation, result).is_some()
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_and_encodes_segments() {
        let client = MicroSDeckClient::from_url("http://localhost:12412").unwrap();

        let url = client.endpoint(&["card", "a/b"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:12412/card/a%2Fb");

        let url = client.endpoint(&["setting", SettingName::BackendPort.as_ref()]).unwrap();
        assert_eq!(url.path(), "/setting/backend:port");
    }

    #[test]
    fn endpoint_respects_base_path() {
        let client = MicroSDeckClient::from_url("http://deck.local:9000/api/").unwrap();
        let url = client.endpoint(&["list", "cards", "570"]).unwrap();
        assert_eq!(url.as_str(), "http://deck.local:9000/api/list/cards/570");
    }

    #[test]
    fn cannot_be_a_base_url_is_rejected() {
        let client = MicroSDeckClient::with_client(
            reqwest::Client::new(),
            Url::parse("mailto:deck@example.com").unwrap(),
            TransportConfig::default(),
        );
        assert!(matches!(
            client.endpoint(&["health"]),
            Err(Error::InvalidUrl(_))
        ));
    }
}
