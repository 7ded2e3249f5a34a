//! Signal dispatcher.
//!
//! # States
//! - Idle: created, not yet listening
//! - Listening: `run` is receiving signals
//! - Exiting: the exit sequence has started; the process is about to end
//!
//! # State Transitions
//! ```text
//! Idle → Listening: run()
//! Listening → Listening: non-termination signal (bound hook executes)
//! Listening → Exiting: termination signal or first request_exit()
//! Idle → Exiting: request_exit() before run()
//! Exiting → (process ends): exit hook ran, default handling restored
//! ```
//!
//! # Design Decisions
//! - SIGINT, SIGTERM and SIGQUIT are always intercepted so the exit hook
//!   gets a chance to run on every termination request
//! - Signal-triggered and explicit shutdown share `request_exit`, guarded
//!   by the state lock, so cleanup runs at most once
//! - The exit sequence owns termination: once it has started, `run` parks
//!   instead of returning, so its caller cannot end the process with a
//!   different status

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;

use super::backend::{OsSignals, SignalBackend};
use super::signal::Signal;
use crate::hooks::HookRegistry;

/// Dispatcher registration and listening failures.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A registry is already bound to this signal.
    #[error("hook for {0} already exists")]
    DuplicateSignal(Signal),

    /// The exit registry was already set.
    #[error("exit hook already exists")]
    DuplicateExit,

    /// `run` was called while another `run` is listening.
    #[error("dispatcher is already listening")]
    AlreadyRunning,

    /// Signal interception could not be installed.
    #[error("failed to listen for signals: {0}")]
    Listen(#[source] io::Error),
}

/// Observable dispatcher state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    Listening,
    Exiting,
}

/// Maps OS signals to hook registries and owns the exit sequence.
///
/// # Example
///
/// ```ignore
/// let dispatcher = SignalDispatcher::new();
///
/// dispatcher
///     .get_or_create(Signal::HANGUP)
///     .register_callback(CallbackReaction::new("reload", reload_config))?;
///
/// dispatcher
///     .get_or_create_exit()
///     .register_callback(CallbackReaction::new("flush", flush_journal))?;
///
/// // Blocks; SIGINT/SIGTERM/SIGQUIT run the exit hook and end the process.
/// dispatcher.run()?;
/// ```
pub struct SignalDispatcher {
    registries: DashMap<Signal, Arc<HookRegistry>>,
    exit: OnceLock<Arc<HookRegistry>>,
    lifecycle: Mutex<Lifecycle>,
    backend: Arc<dyn SignalBackend>,
}

/// State plus the interception it guards. One lock, so `run` and
/// `request_exit` agree on who restores which handlers.
struct Lifecycle {
    state: DispatcherState,
    /// Signals the running loop intercepts; restored on exit.
    intercepted: Vec<Signal>,
    /// Set once the exit sequence has handed `intercepted` back.
    restored: bool,
}

impl SignalDispatcher {
    /// Dispatcher backed by real OS signals.
    pub fn new() -> Self {
        Self::with_backend(Arc::new(OsSignals::new()))
    }

    pub fn with_backend(backend: Arc<dyn SignalBackend>) -> Self {
        Self {
            registries: DashMap::new(),
            exit: OnceLock::new(),
            lifecycle: Mutex::new(Lifecycle {
                state: DispatcherState::Idle,
                intercepted: Vec::new(),
                restored: false,
            }),
            backend,
        }
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> DispatcherState {
        self.lock_lifecycle().state
    }

    fn is_exiting(&self) -> bool {
        self.state() == DispatcherState::Exiting
    }

    /// Bind `registry` to `signal`.
    ///
    /// Bindings made after `run` started are not intercepted by that run.
    pub fn register_for_signal(
        &self,
        signal: Signal,
        registry: Arc<HookRegistry>,
    ) -> Result<(), DispatchError> {
        match self.registries.entry(signal) {
            Entry::Occupied(_) => Err(DispatchError::DuplicateSignal(signal)),
            Entry::Vacant(slot) => {
                tracing::debug!(signal = %signal, hook = %registry.name(), "Hook bound to signal");
                slot.insert(registry);
                Ok(())
            }
        }
    }

    /// Set the exit registry. It can only be set once.
    pub fn register_exit(&self, registry: Arc<HookRegistry>) -> Result<(), DispatchError> {
        let name = registry.name().to_string();
        self.exit
            .set(registry)
            .map_err(|_| DispatchError::DuplicateExit)?;
        tracing::debug!(hook = %name, "Exit hook registered");
        Ok(())
    }

    /// Registry bound to `signal`, if any.
    pub fn registry(&self, signal: Signal) -> Option<Arc<HookRegistry>> {
        self.registries.get(&signal).map(|r| Arc::clone(r.value()))
    }

    /// The exit registry, if set.
    pub fn exit_registry(&self) -> Option<Arc<HookRegistry>> {
        self.exit.get().cloned()
    }

    /// Registry bound to `signal`, binding an empty one on first access.
    pub fn get_or_create(&self, signal: Signal) -> Arc<HookRegistry> {
        let entry = self.registries.entry(signal).or_insert_with(|| {
            Arc::new(HookRegistry::new(
                signal.to_string(),
                format!("Handle signal {} \"{}\"", signal.as_raw(), signal),
            ))
        });
        Arc::clone(entry.value())
    }

    /// The exit registry, creating an empty one on first access.
    pub fn get_or_create_exit(&self) -> Arc<HookRegistry> {
        Arc::clone(
            self.exit
                .get_or_init(|| Arc::new(HookRegistry::new("exit", "Handle exit"))),
        )
    }

    /// Signals a run would intercept: the termination set plus every bound
    /// signal.
    pub fn watched_signals(&self) -> Vec<Signal> {
        let mut signals = Signal::TERMINATION.to_vec();
        let mut bound: Vec<Signal> = self
            .registries
            .iter()
            .map(|entry| *entry.key())
            .filter(|signal| !signal.is_termination())
            .collect();
        bound.sort();
        signals.extend(bound);
        signals
    }

    /// Listen for signals, blocking the calling thread.
    ///
    /// A bound hook runs synchronously for each received signal. On SIGINT,
    /// SIGTERM or SIGQUIT the exit sequence runs with status 0.
    ///
    /// Once the exit sequence has started, from here or from
    /// [`request_exit`](Self::request_exit) on another thread, this stops
    /// handling signals and never returns: the exit sequence ends the
    /// process with its own status. `Ok(())` is returned only when
    /// interception closes while no exit is in progress.
    pub fn run(&self) -> Result<(), DispatchError> {
        match self.state() {
            DispatcherState::Listening => return Err(DispatchError::AlreadyRunning),
            DispatcherState::Exiting => await_termination(),
            DispatcherState::Idle => {}
        }

        let signals = self.watched_signals();
        let stream = self.backend.listen(&signals).map_err(DispatchError::Listen)?;

        {
            let mut lifecycle = self.lock_lifecycle();
            if lifecycle.restored {
                // The exit sequence already restored what it knew about.
                drop(lifecycle);
                self.backend.restore_defaults(&signals);
                await_termination();
            }
            lifecycle.intercepted = signals.clone();
            if lifecycle.state == DispatcherState::Exiting {
                drop(lifecycle);
                await_termination();
            }
            lifecycle.state = DispatcherState::Listening;
        }

        tracing::info!(
            signals = ?signals.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "Listening for signals"
        );

        for signal in stream {
            if self.is_exiting() {
                tracing::debug!(signal = %signal, "Exit in progress, leaving signal loop");
                break;
            }

            tracing::info!(signal = %signal, "Signal received");
            if let Some(registry) = self.registry(signal) {
                registry.execute();
            }

            if signal.is_termination() {
                self.request_exit(0);
            }
        }

        let mut lifecycle = self.lock_lifecycle();
        if lifecycle.state == DispatcherState::Exiting {
            drop(lifecycle);
            tracing::debug!("Signal loop stopped, waiting for the exit sequence");
            await_termination();
        }
        tracing::debug!("Signal stream closed");
        lifecycle.state = DispatcherState::Idle;
        Ok(())
    }

    /// Run the exit hook and end the process with `code`.
    ///
    /// Only the first call proceeds; later or concurrent calls return
    /// immediately without running anything. The first call never returns.
    pub fn request_exit(&self, code: i32) {
        {
            let mut lifecycle = self.lock_lifecycle();
            if lifecycle.state == DispatcherState::Exiting {
                tracing::debug!(code, "Exit already in progress");
                return;
            }
            lifecycle.state = DispatcherState::Exiting;
        }

        tracing::info!(code, "Exit sequence started");
        if let Some(exit) = self.exit.get() {
            exit.execute();
        }

        let intercepted = {
            let mut lifecycle = self.lock_lifecycle();
            lifecycle.restored = true;
            std::mem::take(&mut lifecycle.intercepted)
        };
        self.backend.restore_defaults(&intercepted);

        tracing::info!(code, "Exiting");
        self.backend.terminate(code)
    }
}

/// Park the calling thread until the exit sequence ends the process.
fn await_termination() -> ! {
    loop {
        std::thread::park();
    }
}

impl Default for SignalDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SignalDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalDispatcher")
            .field("signals", &self.watched_signals())
            .field("has_exit_hook", &self.exit.get().is_some())
            .field("state", &self.state())
            .finish()
    }
}
