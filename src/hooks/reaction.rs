//! Reaction definitions.
//!
//! Contains:
//! - `CallbackReaction` - an in-process action run when a hook executes
//! - `NotificationReaction` - a channel signaled when a hook executes
//! - builders for both

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use super::notify::{AckSource, Delivery, NotifySink};
use super::registry::RegistryError;

/// Zero-argument action stored in a callback reaction.
///
/// Actions may be invoked many times and from any thread.
pub type Action = Arc<dyn Fn() + Send + Sync>;

/// A callback run when its registry executes.
pub struct CallbackReaction {
    name: String,
    description: String,
    action: Action,
    concurrent: bool,
    weight: u16,
}

impl CallbackReaction {
    /// Sequential callback with weight 0.
    pub fn new<F>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: String::new(),
            action: Arc::new(action),
            concurrent: false,
            weight: 0,
        }
    }

    pub fn builder() -> CallbackBuilder {
        CallbackBuilder::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether the action runs on its own thread.
    pub fn is_concurrent(&self) -> bool {
        self.concurrent
    }

    pub fn weight(&self) -> u16 {
        self.weight
    }

    /// Run the action.
    ///
    /// Sequential actions run on the calling thread and a panic propagates
    /// to the caller. Concurrent actions are launched on a named thread and
    /// this returns immediately; a panic there is caught and logged.
    pub(crate) fn invoke(self: &Arc<Self>) {
        if !self.concurrent {
            (self.action)();
            return;
        }

        let reaction = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("hook-{}", self.name))
            .spawn(move || {
                if panic::catch_unwind(AssertUnwindSafe(|| (reaction.action)())).is_err() {
                    tracing::error!(callback = %reaction.name, "Concurrent callback panicked");
                }
            });

        if let Err(e) = spawned {
            tracing::error!(callback = %self.name, error = %e, "Failed to spawn concurrent callback");
        }
    }
}

impl fmt::Debug for CallbackReaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackReaction")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("concurrent", &self.concurrent)
            .field("weight", &self.weight)
            .finish()
    }
}

/// Builder for [`CallbackReaction`].
#[derive(Default)]
pub struct CallbackBuilder {
    name: String,
    description: String,
    action: Option<Action>,
    concurrent: bool,
    weight: u16,
}

impl CallbackBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn action<F>(mut self, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.action = Some(Arc::new(action));
        self
    }

    /// Use an already shared action.
    pub fn shared_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    pub fn concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    pub fn weight(mut self, weight: u16) -> Self {
        self.weight = weight;
        self
    }

    /// Fails with `InvalidReaction` if no action was supplied.
    pub fn build(self) -> Result<CallbackReaction, RegistryError> {
        let action = self
            .action
            .ok_or(RegistryError::InvalidReaction("callback has no action"))?;
        Ok(CallbackReaction {
            name: self.name,
            description: self.description,
            action,
            concurrent: self.concurrent,
            weight: self.weight,
        })
    }
}

/// A notification channel signaled when its registry executes.
pub struct NotificationReaction {
    name: String,
    description: String,
    sink: Arc<dyn NotifySink>,
    ack: Option<Arc<dyn AckSource>>,
    non_blocking: bool,
    weight: u16,
}

impl NotificationReaction {
    /// Blocking notification without acknowledgement, weight 0.
    pub fn new(name: impl Into<String>, sink: impl NotifySink + 'static) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            sink: Arc::new(sink),
            ack: None,
            non_blocking: false,
            weight: 0,
        }
    }

    pub fn builder() -> NotificationBuilder {
        NotificationBuilder::default()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Drop the signal instead of blocking when no listener is ready.
    pub fn with_non_blocking(mut self, non_blocking: bool) -> Self {
        self.non_blocking = non_blocking;
        self
    }

    pub fn with_weight(mut self, weight: u16) -> Self {
        self.weight = weight;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether a send with no ready listener is dropped instead of waited on.
    pub fn is_non_blocking(&self) -> bool {
        self.non_blocking
    }

    /// Whether the registry waits for an acknowledgement after signaling.
    pub fn awaits_ack(&self) -> bool {
        self.ack.is_some()
    }

    pub fn weight(&self) -> u16 {
        self.weight
    }

    /// Signal the sink, then wait for the acknowledgement if there is one.
    ///
    /// The acknowledgement is awaited even when a non-blocking send was
    /// dropped.
    pub(crate) fn deliver(&self) {
        if self.non_blocking {
            match self.sink.try_notify() {
                Ok(Delivery::Delivered) => {
                    tracing::trace!(notification = %self.name, "Notification delivered");
                }
                Ok(Delivery::Dropped) => {
                    tracing::debug!(notification = %self.name, "No listener ready, notification dropped");
                }
                Err(e) => {
                    tracing::warn!(notification = %self.name, error = %e, "Notification not delivered");
                }
            }
        } else if let Err(e) = self.sink.notify() {
            tracing::warn!(notification = %self.name, error = %e, "Notification not delivered");
        }

        if let Some(ack) = &self.ack {
            if let Err(e) = ack.wait() {
                tracing::warn!(notification = %self.name, error = %e, "Acknowledgement never arrived");
            }
        }
    }
}

impl fmt::Debug for NotificationReaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationReaction")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("non_blocking", &self.non_blocking)
            .field("awaits_ack", &self.ack.is_some())
            .field("weight", &self.weight)
            .finish()
    }
}

/// Builder for [`NotificationReaction`].
#[derive(Default)]
pub struct NotificationBuilder {
    name: String,
    description: String,
    sink: Option<Arc<dyn NotifySink>>,
    ack: Option<Arc<dyn AckSource>>,
    non_blocking: bool,
    weight: u16,
}

impl NotificationBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn sink(mut self, sink: impl NotifySink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    pub fn ack(mut self, ack: impl AckSource + 'static) -> Self {
        self.ack = Some(Arc::new(ack));
        self
    }

    pub fn non_blocking(mut self, non_blocking: bool) -> Self {
        self.non_blocking = non_blocking;
        self
    }

    pub fn weight(mut self, weight: u16) -> Self {
        self.weight = weight;
        self
    }

    /// Fails with `InvalidReaction` if no sink was supplied.
    pub fn build(self) -> Result<NotificationReaction, RegistryError> {
        let sink = self
            .sink
            .ok_or(RegistryError::InvalidReaction("notification has no sink"))?;
        Ok(NotificationReaction {
            name: self.name,
            description: self.description,
            sink,
            ack: self.ack,
            non_blocking: self.non_blocking,
            weight: self.weight,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::notify::{ack_channel, rendezvous};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_callback_builder_requires_action() {
        let err = CallbackReaction::builder().name("x").build().unwrap_err();
        assert!(matches!(err, RegistryError::InvalidReaction(_)));
    }

    #[test]
    fn test_notification_builder_requires_sink() {
        let err = NotificationReaction::builder().name("x").build().unwrap_err();
        assert!(matches!(err, RegistryError::InvalidReaction(_)));
    }

    #[test]
    fn test_builder_fields() {
        let callback = CallbackReaction::builder()
            .name("flush")
            .description("flush buffers")
            .action(|| {})
            .concurrent(true)
            .weight(42)
            .build()
            .unwrap();

        assert_eq!(callback.name(), "flush");
        assert_eq!(callback.description(), "flush buffers");
        assert!(callback.is_concurrent());
        assert_eq!(callback.weight(), 42);

        let (tx, _rx) = rendezvous();
        let (_ack_tx, ack) = ack_channel();
        let notification = NotificationReaction::builder()
            .name("db")
            .sink(tx)
            .ack(ack)
            .non_blocking(true)
            .weight(7)
            .build()
            .unwrap();

        assert!(notification.is_non_blocking());
        assert!(notification.awaits_ack());
        assert_eq!(notification.weight(), 7);
    }

    #[test]
    fn test_sequential_invoke_runs_inline() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let callback = Arc::new(CallbackReaction::new("count", move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));

        callback.invoke();
        callback.invoke();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_panic_is_contained() {
        let (done_tx, done_rx) = mpsc::channel();
        let panicking = Arc::new(
            CallbackReaction::builder()
                .name("boom")
                .action(|| panic!("boom"))
                .concurrent(true)
                .build()
                .unwrap(),
        );
        let after = Arc::new(
            CallbackReaction::builder()
                .name("after")
                .action(move || {
                    let _ = done_tx.send(());
                })
                .concurrent(true)
                .build()
                .unwrap(),
        );

        panicking.invoke();
        after.invoke();
        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_debug_omits_closures() {
        let callback = CallbackReaction::new("dbg", || {});
        let out = format!("{:?}", callback);
        assert!(out.contains("dbg"));
        assert!(!out.contains("action"));
    }
}
