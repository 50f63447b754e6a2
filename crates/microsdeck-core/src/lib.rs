// microsdeck-core: Snapshot cache, polling loop and change propagation
// between microsdeck-api and consumers (CLI, UI bridges).

pub mod backoff;
pub mod bridge;
pub mod bus;
pub mod config;
pub mod error;
pub mod manager;
pub mod snapshot;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backoff::{Backoff, PollAction};
pub use bridge::ContextBridge;
pub use bus::{EventBus, ManagerEvent, NamedEvent, Received, Subscription};
pub use config::{BackoffConfig, ListenMode, ManagerConfig};
pub use error::CoreError;
pub use manager::{Manager, ManagerState};
pub use snapshot::Snapshot;

// Re-export wire types at the crate root for ergonomics.
pub use microsdeck_api::{
    Card, CardAndGames, FrontendSettings, Game, LifecycleEvent, PollResult, ServerEvent,
    ServerEventKind, SettingName,
};
