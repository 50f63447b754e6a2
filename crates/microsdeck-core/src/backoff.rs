// ── Poll backoff schedule ──
//
// Pure state machine: the poll loop feeds it each `PollResult` and does
// what the returned `PollAction` says. No timers live here.

use std::time::Duration;

use microsdeck_api::PollResult;

use crate::config::BackoffConfig;

/// What the poll loop should do after one listen attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollAction {
    /// The backend reported a change: fetch, then poll again immediately.
    Refresh,
    /// Nothing happened: poll again immediately.
    Retry,
    /// The backend is unreachable: wait this long before polling again.
    Sleep(Duration),
}

#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    delay: Duration,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        let delay = config.initial_delay;
        Self { config, delay }
    }

    /// The delay the next `Unreachable` result will sleep for.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn on_result(&mut self, result: PollResult) -> PollAction {
        match result {
            PollResult::Changed => PollAction::Refresh,
            PollResult::TimedOut => {
                self.delay = self.config.floor_delay;
                PollAction::Retry
            }
            PollResult::Unreachable => {
                let sleep = self.delay;
                self.delay = self.grow(sleep);
                PollAction::Sleep(sleep)
            }
        }
    }

    fn grow(&self, delay: Duration) -> Duration {
        let next = delay.as_secs_f64() * self.config.factor;
        let max = self.config.max_delay;
        if !next.is_finite() || next >= max.as_secs_f64() {
            max
        } else {
            Duration::from_secs_f64(next)
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}
