// microsdeck-api: Async Rust client for the MicroSDeck backend HTTP API

pub mod client;
pub mod error;
pub mod models;
pub mod sse;
pub mod transport;

pub use client::{MicroSDeckClient, PollResult, StreamSignal};
pub use error::Error;
pub use models::{
    Card, CardAndGames, FrontendSettings, Game, LinkMany, LinkOne, ServerEvent, ServerEventKind,
    SettingName,
};
pub use sse::{DecodeError, EventDecoder, LifecycleEvent, decode_event};
pub use transport::TransportConfig;
