//! Hook Registry
//!
//! Stores the callback and notification reactions of one named hook and
//! runs them in descending weight order: notifications first, then
//! callbacks.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use thiserror::Error;

use super::reaction::{CallbackReaction, NotificationReaction};

/// Which reaction list a name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Callback,
    Notification,
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReactionKind::Callback => write!(f, "callback"),
            ReactionKind::Notification => write!(f, "notification"),
        }
    }
}

/// Registration failures. The registry is unchanged when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Malformed reaction (missing action or sink, empty name).
    #[error("invalid reaction: {0}")]
    InvalidReaction(&'static str),

    /// A reaction of the same kind already uses this name.
    #[error("{kind} named \"{name}\" already exists")]
    DuplicateName { kind: ReactionKind, name: String },
}

/// One step of an execution plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReactionInfo {
    pub kind: ReactionKind,
    pub name: String,
    pub description: String,
    pub weight: u16,
    /// Callback runs on its own thread.
    pub concurrent: bool,
    /// Notification is dropped when no listener is ready.
    pub non_blocking: bool,
    /// Notification waits for an acknowledgement.
    pub awaits_ack: bool,
}

#[derive(Default)]
struct Reactions {
    callbacks: Vec<Arc<CallbackReaction>>,
    notifications: Vec<Arc<NotificationReaction>>,
    callback_names: HashSet<String>,
    notification_names: HashSet<String>,
    /// Set on every insert; cleared once an execution pass has checked order.
    stale: bool,
}

impl Reactions {
    /// Re-sort both lists if either is out of order.
    ///
    /// The sort is stable, so equal weights keep registration order.
    fn ensure_sorted(&mut self) {
        if !self.stale {
            return;
        }
        let callbacks_ordered = self.callbacks.windows(2).all(|w| w[0].weight() >= w[1].weight());
        let notifications_ordered = self
            .notifications
            .windows(2)
            .all(|w| w[0].weight() >= w[1].weight());

        if !callbacks_ordered || !notifications_ordered {
            self.callbacks.sort_by(|a, b| b.weight().cmp(&a.weight()));
            self.notifications.sort_by(|a, b| b.weight().cmp(&a.weight()));
        }
        self.stale = false;
    }
}

/// Ordered collection of reactions bound to one hook.
///
/// Registration and execution may happen concurrently from any thread. The
/// internal lock is only held to register, or to order and snapshot the
/// lists at the start of an execution pass; it is never held while a
/// reaction runs, so a slow callback does not block registration.
///
/// # Example
///
/// ```ignore
/// let registry = HookRegistry::new("shutdown", "Flush state before exit");
///
/// registry.register_callback(
///     CallbackReaction::builder()
///         .name("close-db")
///         .action(|| db.close())
///         .weight(10)
///         .build()?,
/// )?;
///
/// registry.execute();
/// ```
pub struct HookRegistry {
    name: String,
    description: String,
    reactions: Mutex<Reactions>,
}

impl HookRegistry {
    /// Create an empty registry.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            reactions: Mutex::new(Reactions::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    fn lock(&self) -> MutexGuard<'_, Reactions> {
        // No user code runs under this lock, so a poisoned guard still
        // holds consistent lists.
        self.reactions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a callback reaction.
    pub fn register_callback(&self, reaction: CallbackReaction) -> Result<(), RegistryError> {
        if reaction.name().is_empty() {
            return Err(RegistryError::InvalidReaction("name is empty"));
        }

        let mut reactions = self.lock();
        if !reactions.callback_names.insert(reaction.name().to_string()) {
            return Err(RegistryError::DuplicateName {
                kind: ReactionKind::Callback,
                name: reaction.name().to_string(),
            });
        }

        tracing::debug!(
            hook = %self.name,
            callback = %reaction.name(),
            weight = reaction.weight(),
            concurrent = reaction.is_concurrent(),
            "Callback registered"
        );
        reactions.callbacks.push(Arc::new(reaction));
        reactions.stale = true;
        Ok(())
    }

    /// Register a notification reaction.
    pub fn register_notification(&self, reaction: NotificationReaction) -> Result<(), RegistryError> {
        if reaction.name().is_empty() {
            return Err(RegistryError::InvalidReaction("name is empty"));
        }

        let mut reactions = self.lock();
        if !reactions.notification_names.insert(reaction.name().to_string()) {
            return Err(RegistryError::DuplicateName {
                kind: ReactionKind::Notification,
                name: reaction.name().to_string(),
            });
        }

        tracing::debug!(
            hook = %self.name,
            notification = %reaction.name(),
            weight = reaction.weight(),
            non_blocking = reaction.is_non_blocking(),
            awaits_ack = reaction.awaits_ack(),
            "Notification registered"
        );
        reactions.notifications.push(Arc::new(reaction));
        reactions.stale = true;
        Ok(())
    }

    /// Ordered copies of both lists, taken under the lock.
    fn snapshot(&self) -> (Vec<Arc<NotificationReaction>>, Vec<Arc<CallbackReaction>>) {
        let mut reactions = self.lock();
        reactions.ensure_sorted();
        (reactions.notifications.clone(), reactions.callbacks.clone())
    }

    /// Run one execution pass.
    ///
    /// Notifications are signaled in descending weight order, then callbacks
    /// run in descending weight order. A blocking notification or an
    /// acknowledgement wait has no timeout: a listener that never answers
    /// suspends this call forever.
    ///
    /// A panic in a sequential callback propagates to the caller and the
    /// remaining callbacks do not run.
    pub fn execute(&self) {
        let (notifications, callbacks) = self.snapshot();

        tracing::debug!(
            hook = %self.name,
            notifications = notifications.len(),
            callbacks = callbacks.len(),
            "Executing hook"
        );

        for notification in &notifications {
            notification.deliver();
        }

        for callback in &callbacks {
            callback.invoke();
        }
    }

    /// The order the next [`execute`](Self::execute) would follow.
    pub fn plan(&self) -> Vec<ReactionInfo> {
        let (notifications, callbacks) = self.snapshot();

        let notifications = notifications.iter().map(|n| ReactionInfo {
            kind: ReactionKind::Notification,
            name: n.name().to_string(),
            description: n.description().to_string(),
            weight: n.weight(),
            concurrent: false,
            non_blocking: n.is_non_blocking(),
            awaits_ack: n.awaits_ack(),
        });
        let callbacks = callbacks.iter().map(|c| ReactionInfo {
            kind: ReactionKind::Callback,
            name: c.name().to_string(),
            description: c.description().to_string(),
            weight: c.weight(),
            concurrent: c.is_concurrent(),
            non_blocking: false,
            awaits_ack: false,
        });

        notifications.chain(callbacks).collect()
    }

    pub fn callback_count(&self) -> usize {
        self.lock().callbacks.len()
    }

    pub fn notification_count(&self) -> usize {
        self.lock().notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        let reactions = self.lock();
        reactions.callbacks.is_empty() && reactions.notifications.is_empty()
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reactions = self.lock();
        f.debug_struct("HookRegistry")
            .field("name", &self.name)
            .field("callbacks", &reactions.callbacks.len())
            .field("notifications", &reactions.notifications.len())
            .finish()
    }
}
