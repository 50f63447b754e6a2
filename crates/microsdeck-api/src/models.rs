// Wire models for the MicroSDeck backend.
//
// Field names follow the backend's JSON exactly (snake_case). Cards keep any
// field this client does not know about so that an upsert sends back what the
// backend gave us.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

// ── Card ─────────────────────────────────────────────────────────────

/// A removable storage card tracked by the backend.
///
/// Created server-side when media is inserted. The client never invents a
/// `uid`; it only edits `name`, `position`, `hidden` and game membership.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub uid: String,
    #[serde(default)]
    pub name: String,
    /// Game uids on this card, in backend order.
    #[serde(default)]
    pub games: Vec<String>,
    /// Display order. Not necessarily dense or unique.
    #[serde(default)]
    pub position: u32,
    #[serde(default)]
    pub hidden: bool,

    /// Backend fields this client does not model (`libid`, `mount`, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Card {
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// The name to show a user; falls back to the uid for unnamed cards.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.uid
        } else {
            &self.name
        }
    }
}

// ── Game ─────────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

/// An installed title. `uid` is the Steam app/shortcut id for Steam titles,
/// or a synthetic id for titles created through this system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub uid: String,
    pub name: String,
    /// Install size in bytes.
    #[serde(default)]
    pub size: u64,
    #[serde(default = "default_true")]
    pub is_steam: bool,
}

// ── CardAndGames ─────────────────────────────────────────────────────

/// One card paired with the games it currently holds.
///
/// The backend sends this as a two-element array `[card, [game, ...]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(Card, Vec<Game>)", into = "(Card, Vec<Game>)")]
pub struct CardAndGames {
    pub card: Card,
    pub games: Vec<Game>,
}

impl From<(Card, Vec<Game>)> for CardAndGames {
    fn from((card, games): (Card, Vec<Game>)) -> Self {
        Self { card, games }
    }
}

impl From<CardAndGames> for (Card, Vec<Game>) {
    fn from(value: CardAndGames) -> Self {
        (value.card, value.games)
    }
}

impl CardAndGames {
    /// Sum of the sizes of all games on the card.
    pub fn total_size(&self) -> u64 {
        self.games.iter().map(|g| g.size).sum()
    }
}

// ── Link request bodies ──────────────────────────────────────────────

/// Body of `POST /link` and `POST /unlink`.
#[derive(Debug, Clone, Serialize)]
pub struct LinkOne<'a> {
    pub card_id: &'a str,
    pub game_id: &'a str,
}

/// Body of `POST /linkmany` and `POST /unlinkmany`.
#[derive(Debug, Clone, Serialize)]
pub struct LinkMany<'a> {
    pub card_id: &'a str,
    pub game_ids: &'a [String],
}

// ── Settings ─────────────────────────────────────────────────────────

/// Persisted UI preferences stored under the `frontend` setting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontendSettings {
    #[serde(default)]
    pub dismissed_docs: bool,
}

/// Names accepted by `GET/POST /setting/{name}`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter,
)]
pub enum SettingName {
    #[strum(serialize = "*")]
    All,
    #[strum(serialize = "backend")]
    Backend,
    #[strum(serialize = "backend:port")]
    BackendPort,
    #[strum(serialize = "backend:scan_interval")]
    BackendScanInterval,
    #[strum(serialize = "backend:store_file")]
    BackendStoreFile,
    #[strum(serialize = "backend:log_file")]
    BackendLogFile,
    #[strum(serialize = "backend:log_level")]
    BackendLogLevel,
    #[strum(serialize = "backend:startup")]
    BackendStartup,
    #[strum(serialize = "backend:startup:skip_validate")]
    BackendStartupSkipValidate,
    #[strum(serialize = "backend:startup:skip_clean")]
    BackendStartupSkipClean,
    #[strum(serialize = "frontend")]
    Frontend,
    #[strum(serialize = "frontend:dismissed_docs")]
    FrontendDismissedDocs,
}

// ── ServerEvent ──────────────────────────────────────────────────────

/// One decoded block from the `/listen` event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEvent {
    /// Event type; `"message"` when the block carried no `event:` field.
    pub event: String,
    pub data: Option<String>,
    pub id: Option<String>,
}

impl Default for ServerEvent {
    fn default() -> Self {
        Self {
            event: "message".into(),
            data: None,
            id: None,
        }
    }
}

/// The event types the backend is known to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerEventKind {
    Message,
    Insert,
    Remove,
    Update,
    Other,
}

impl ServerEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            ..Self::default()
        }
    }

    pub fn kind(&self) -> ServerEventKind {
        match self.event.as_str() {
            "message" => ServerEventKind::Message,
            "insert" => ServerEventKind::Insert,
            "remove" => ServerEventKind::Remove,
            "update" => ServerEventKind::Update,
            _ => ServerEventKind::Other,
        }
    }
}

/// Renders the backend's wire framing, terminated by a blank line.
impl fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(id) = &self.id {
            writeln!(f, "id: {id}")?;
        }
        writeln!(f, "event: {}", self.event)?;
        if let Some(data) = &self.data {
            writeln!(f, "data: {data}")?;
        }
        writeln!(f)
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn card_and_games_deserializes_from_tuple() {
        let json = serde_json::json!([
            {
                "uid": "abc",
                "libid": "lib-1",
                "name": "Red",
                "position": 3,
                "hidden": false
            },
            [
                { "uid": "570", "name": "Dota 2", "size": 1024, "is_steam": true },
                { "uid": "ns-1", "name": "Emulator", "size": 2048 }
            ]
        ]);

        let cg: CardAndGames = serde_json::from_value(json).unwrap();
        assert_eq!(cg.card.uid, "abc");
        assert_eq!(cg.card.position, 3);
        assert!(cg.card.games.is_empty());
        assert_eq!(cg.card.extra["libid"], "lib-1");
        assert_eq!(cg.games.len(), 2);
        assert!(cg.games[1].is_steam, "is_steam defaults to true");
        assert_eq!(cg.total_size(), 3072);
    }

    #[test]
    fn card_serialization_keeps_unknown_fields() {
        let json = serde_json::json!({
            "uid": "abc",
            "libid": "lib-1",
            "mount": "/run/media/mmcblk0p1",
            "name": "",
            "position": 0,
            "hidden": true
        });

        let card: Card = serde_json::from_value(json).unwrap();
        let back = serde_json::to_value(&card).unwrap();
        assert_eq!(back["libid"], "lib-1");
        assert_eq!(back["mount"], "/run/media/mmcblk0p1");
        assert_eq!(back["hidden"], true);
        assert_eq!(card.display_name(), "abc");
    }

    #[test]
    fn setting_names_round_trip_through_strings() {
        for name in SettingName::iter() {
            let text = name.to_string();
            assert_eq!(SettingName::from_str(&text).unwrap(), name);
        }
        assert_eq!(SettingName::FrontendDismissedDocs.as_ref(), "frontend:dismissed_docs");
        assert!(SettingName::from_str("backend:nope").is_err());
    }

    #[test]
    fn server_event_display_matches_backend_framing() {
        let event = ServerEvent {
            event: "update".into(),
            data: Some("x".into()),
            id: Some("1".into()),
        };
        assert_eq!(event.to_string(), "id: 1\nevent: update\ndata: x\n\n");
        assert_eq!(event.kind(), ServerEventKind::Update);
        assert_eq!(ServerEvent::default().kind(), ServerEventKind::Message);
        assert_eq!(ServerEvent::new("reboot").kind(), ServerEventKind::Other);
    }
}
