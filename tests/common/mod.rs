//! Shared utilities for dispatcher and registry tests.

#![allow(dead_code)]

use std::io;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use hookloop::hooks::{CallbackReaction, Delivery, Disconnected, NotifySink};
use hookloop::lifecycle::{Signal, SignalBackend, SignalStream};

/// Shared, ordered record of which reactions ran.
pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Sequential callback that appends its name to `log`.
pub fn recording_callback(name: &str, weight: u16, log: &Log) -> CallbackReaction {
    let log = log.clone();
    let tag = name.to_string();
    CallbackReaction::builder()
        .name(name)
        .action(move || log.lock().unwrap().push(tag.clone()))
        .weight(weight)
        .build()
        .unwrap()
}

/// Sink that appends its name to `log` instead of talking to a listener.
pub struct RecordingSink {
    pub tag: String,
    pub log: Log,
}

impl NotifySink for RecordingSink {
    fn notify(&self) -> Result<(), Disconnected> {
        self.log.lock().unwrap().push(self.tag.clone());
        Ok(())
    }

    fn try_notify(&self) -> Result<Delivery, Disconnected> {
        self.notify().map(|()| Delivery::Delivered)
    }
}

/// Test handle that delivers signals to a [`ScriptedBackend`].
pub struct SignalFeed(mpsc::Sender<Option<Signal>>);

impl SignalFeed {
    pub fn send(&self, signal: Signal) -> Result<(), mpsc::SendError<Option<Signal>>> {
        self.0.send(Some(signal))
    }
}

/// Signal backend driven by a channel instead of the OS.
///
/// Like `OsSignals`, restoring defaults closes the stream handed out by
/// `listen`. `terminate` records the exit code and parks the calling thread
/// forever, standing in for the process ending.
pub struct ScriptedBackend {
    feed: Mutex<Option<mpsc::Receiver<Option<Signal>>>>,
    closer: Mutex<mpsc::Sender<Option<Signal>>>,
    exits: Mutex<mpsc::Sender<i32>>,
    pub listened: Mutex<Vec<Signal>>,
    pub restored: Mutex<Vec<Signal>>,
}

impl ScriptedBackend {
    /// Returns the backend, a feed to deliver signals, and a receiver of
    /// exit codes.
    pub fn new() -> (Arc<Self>, SignalFeed, mpsc::Receiver<i32>) {
        let (signal_tx, signal_rx) = mpsc::channel();
        let (exit_tx, exit_rx) = mpsc::channel();
        let backend = Arc::new(Self {
            feed: Mutex::new(Some(signal_rx)),
            closer: Mutex::new(signal_tx.clone()),
            exits: Mutex::new(exit_tx),
            listened: Mutex::new(Vec::new()),
            restored: Mutex::new(Vec::new()),
        });
        (backend, SignalFeed(signal_tx), exit_rx)
    }
}

impl SignalBackend for ScriptedBackend {
    fn listen(&self, signals: &[Signal]) -> io::Result<SignalStream> {
        let feed = self
            .feed
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "already listening"))?;
        self.listened.lock().unwrap().extend_from_slice(signals);
        Ok(Box::new(feed.into_iter().map_while(|signal| signal)))
    }

    fn restore_defaults(&self, signals: &[Signal]) {
        self.restored.lock().unwrap().extend_from_slice(signals);
        let _ = self.closer.lock().unwrap().send(None);
    }

    fn terminate(&self, code: i32) -> ! {
        let _ = self.exits.lock().unwrap().send(code);
        loop {
            std::thread::park();
        }
    }
}
