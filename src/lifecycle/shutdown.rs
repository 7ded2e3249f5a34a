//! Shutdown broadcast for async tasks.

use tokio::sync::broadcast;

use crate::hooks::{Delivery, Disconnected, NotificationReaction, NotifySink};

/// Broadcast shutdown signal for long-running async tasks.
///
/// Every task holding a [`subscribe`](Self::subscribe) receiver is woken by
/// one send. `Shutdown` is a [`NotifySink`], so it can be registered in a
/// hook directly and the whole set of tasks is told at once.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Wake every current subscriber.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of subscribers still alive.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Non-blocking notification reaction that triggers this broadcast.
    pub fn reaction(&self, name: impl Into<String>, weight: u16) -> NotificationReaction {
        NotificationReaction::new(name, self.clone())
            .with_description("Broadcast shutdown to async tasks")
            .with_non_blocking(true)
            .with_weight(weight)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifySink for Shutdown {
    fn notify(&self) -> Result<(), Disconnected> {
        self.tx.notify()
    }

    fn try_notify(&self) -> Result<Delivery, Disconnected> {
        self.tx.try_notify()
    }
}
