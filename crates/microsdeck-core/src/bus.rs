// ── Event buses ──
//
// Typed broadcast channels with add/remove-listener semantics: a listener
// exists for as long as its `Subscription` lives.

use microsdeck_api::{LifecycleEvent, ServerEvent};
use tokio::sync::broadcast;
use tracing::debug;

/// Events carried by a bus expose a name listeners can filter on.
pub trait NamedEvent {
    fn name(&self) -> &str;
}

/// Domain notifications published by the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerEvent {
    /// The public snapshot was replaced (or its `enabled` flag changed).
    Update,
    /// An event decoded from the backend stream, published after the
    /// fetch it triggered.
    Backend(ServerEvent),
}

impl NamedEvent for ManagerEvent {
    fn name(&self) -> &str {
        match self {
            Self::Update => "update",
            Self::Backend(event) => &event.event,
        }
    }
}

impl NamedEvent for LifecycleEvent {
    fn name(&self) -> &str {
        match self {
            Self::Start => "start",
            Self::Change => "change",
            Self::Close => "close",
            Self::Abort => "abort",
        }
    }
}

/// What a subscription yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received<E> {
    Event(E),
    /// The listener fell behind and `missed` events were dropped. Consumers
    /// that only mirror state should re-read it.
    Resync { missed: u64 },
}

#[derive(Debug)]
pub struct EventBus<E> {
    tx: broadcast::Sender<E>,
}

impl<E: Clone> EventBus<E> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Add a listener. Events dispatched before this call are not replayed.
    pub fn subscribe(&self) -> Subscription<E> {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Deliver `event` to every current listener. Returns `false` when
    /// nobody is listening.
    pub fn dispatch(&self, event: E) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A registered listener. Dropping it removes the listener.
#[derive(Debug)]
pub struct Subscription<E> {
    rx: broadcast::Receiver<E>,
}

impl<E: Clone> Subscription<E> {
    /// Wait for the next delivery. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Received<E>> {
        match self.rx.recv().await {
            Ok(event) => Some(Received::Event(event)),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                debug!(missed, "subscription lagged");
                Some(Received::Resync { missed })
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv); `None` when nothing is
    /// queued or the bus is gone.
    pub fn try_recv(&mut self) -> Option<Received<E>> {
        match self.rx.try_recv() {
            Ok(event) => Some(Received::Event(event)),
            Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                Some(Received::Resync { missed })
            }
            Err(_) => None,
        }
    }
}

impl<E: Clone + NamedEvent> Subscription<E> {
    /// Wait for the next event called `name`, skipping others. Resync
    /// signals are always passed through.
    pub async fn recv_matching(&mut self, name: &str) -> Option<Received<E>> {
        loop {
            match self.recv().await? {
                Received::Event(event) if event.name() != name => {}
                received => return Some(received),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn dispatch_without_listeners_reports_false() {
        let bus = EventBus::<ManagerEvent>::new(4);
        assert!(!bus.dispatch(ManagerEvent::Update));
    }

    #[tokio::test]
    async fn every_listener_receives_each_event() {
        let bus = EventBus::new(4);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.listener_count(), 2);

        assert!(bus.dispatch(ManagerEvent::Update));
        assert_eq!(first.recv().await, Some(Received::Event(ManagerEvent::Update)));
        assert_eq!(second.recv().await, Some(Received::Event(ManagerEvent::Update)));
    }

    #[test]
    fn dropping_subscription_removes_listener() {
        let bus = EventBus::<LifecycleEvent>::new(4);
        let subscription = bus.subscribe();
        assert_eq!(bus.listener_count(), 1);
        drop(subscription);
        assert_eq!(bus.listener_count(), 0);
        assert!(!bus.dispatch(LifecycleEvent::Start));
    }

    #[test]
    fn late_subscriber_sees_no_history() {
        let bus = EventBus::new(4);
        let _early = bus.subscribe();
        bus.dispatch(LifecycleEvent::Start);
        let mut late = bus.subscribe();
        assert_eq!(late.try_recv(), None);
    }

    #[tokio::test]
    async fn recv_matching_filters_by_name() {
        let bus = EventBus::new(8);
        let mut subscription = bus.subscribe();
        bus.dispatch(ManagerEvent::Backend(ServerEvent::new("insert")));
        bus.dispatch(ManagerEvent::Update);
        bus.dispatch(ManagerEvent::Backend(ServerEvent::new("remove")));

        assert_eq!(
            subscription.recv_matching("remove").await,
            Some(Received::Event(ManagerEvent::Backend(ServerEvent::new(
                "remove"
            ))))
        );
        assert_eq!(subscription.try_recv(), None);
    }

    #[test]
    fn lag_surfaces_as_resync() {
        let bus = EventBus::new(2);
        let mut subscription = bus.subscribe();
        for _ in 0..5 {
            bus.dispatch(ManagerEvent::Update);
        }
        assert_eq!(subscription.try_recv(), Some(Received::Resync { missed: 3 }));
        assert_eq!(subscription.try_recv(), Some(Received::Event(ManagerEvent::Update)));
    }
}
