//! Notification channel capability.
//!
//! A notification reaction talks to the outside world through two halves:
//!
//! - a [`NotifySink`] the registry signals (blocking or non-blocking), and
//! - an optional [`AckSource`] the registry waits on afterwards, so a
//!   listener can hold the registry until it has finished reacting.
//!
//! Both are traits so that std and tokio channels can be plugged in
//! directly. A zero-capacity std `sync_channel` (see [`rendezvous`]) is the
//! strictest sink: a blocking `notify` only returns once a listener has
//! actually taken the value, and `try_notify` only succeeds if a listener
//! is already parked in `recv`.

use std::sync::mpsc;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::{broadcast, mpsc as tokio_mpsc};

/// Every listener of the channel is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("notification channel disconnected")]
pub struct Disconnected;

/// Outcome of a non-blocking notification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// A listener accepted the value.
    Delivered,
    /// No listener was ready; the value was dropped.
    Dropped,
}

/// Write-only side of a notification channel.
pub trait NotifySink: Send + Sync {
    /// Deliver one value, suspending until a listener accepts it.
    fn notify(&self) -> Result<(), Disconnected>;

    /// Deliver one value only if that can happen without suspending.
    fn try_notify(&self) -> Result<Delivery, Disconnected>;
}

/// Read-only completion channel a registry waits on after signaling.
pub trait AckSource: Send + Sync {
    /// Block until one completion value arrives.
    fn wait(&self) -> Result<(), Disconnected>;
}

impl NotifySink for mpsc::SyncSender<()> {
    fn notify(&self) -> Result<(), Disconnected> {
        self.send(()).map_err(|_| Disconnected)
    }

    fn try_notify(&self) -> Result<Delivery, Disconnected> {
        match self.try_send(()) {
            Ok(()) => Ok(Delivery::Delivered),
            Err(mpsc::TrySendError::Full(())) => Ok(Delivery::Dropped),
            Err(mpsc::TrySendError::Disconnected(())) => Err(Disconnected),
        }
    }
}

impl NotifySink for mpsc::Sender<()> {
    fn notify(&self) -> Result<(), Disconnected> {
        self.send(()).map_err(|_| Disconnected)
    }

    fn try_notify(&self) -> Result<Delivery, Disconnected> {
        // Unbounded: a send never has to wait.
        self.notify().map(|()| Delivery::Delivered)
    }
}

/// Tokio bounded sender.
///
/// `notify` uses `blocking_send`, so the registry must not be executed from
/// inside an async task when such a sink is registered as blocking. Run it
/// on a plain thread or through `tokio::task::spawn_blocking`.
impl NotifySink for tokio_mpsc::Sender<()> {
    fn notify(&self) -> Result<(), Disconnected> {
        self.blocking_send(()).map_err(|_| Disconnected)
    }

    fn try_notify(&self) -> Result<Delivery, Disconnected> {
        match self.try_send(()) {
            Ok(()) => Ok(Delivery::Delivered),
            Err(tokio_mpsc::error::TrySendError::Full(())) => Ok(Delivery::Dropped),
            Err(tokio_mpsc::error::TrySendError::Closed(())) => Err(Disconnected),
        }
    }
}

/// Tokio broadcast sender: zero or many listeners, never suspends.
impl NotifySink for broadcast::Sender<()> {
    fn notify(&self) -> Result<(), Disconnected> {
        self.send(()).map(|_| ()).map_err(|_| Disconnected)
    }

    fn try_notify(&self) -> Result<Delivery, Disconnected> {
        match self.send(()) {
            Ok(_) => Ok(Delivery::Delivered),
            Err(_) => Ok(Delivery::Dropped),
        }
    }
}

impl AckSource for Mutex<mpsc::Receiver<()>> {
    fn wait(&self) -> Result<(), Disconnected> {
        let rx = self.lock().unwrap_or_else(PoisonError::into_inner);
        rx.recv().map_err(|_| Disconnected)
    }
}

/// Tokio receiver as an ack source. Same caveat as the tokio sink: `wait`
/// uses `blocking_recv` and must not run inside an async task.
impl AckSource for Mutex<tokio_mpsc::Receiver<()>> {
    fn wait(&self) -> Result<(), Disconnected> {
        let mut rx = self.lock().unwrap_or_else(PoisonError::into_inner);
        rx.blocking_recv().ok_or(Disconnected)
    }
}

/// Zero-capacity sink/listener pair.
pub fn rendezvous() -> (mpsc::SyncSender<()>, mpsc::Receiver<()>) {
    mpsc::sync_channel(0)
}

/// Acknowledgement pair: the listener keeps the sender, the registry gets
/// the source.
pub fn ack_channel() -> (mpsc::Sender<()>, Mutex<mpsc::Receiver<()>>) {
    let (tx, rx) = mpsc::channel();
    (tx, Mutex::new(rx))
}
